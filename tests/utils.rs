use statful::prelude::*;
use statful::StatfulClient;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[allow(dead_code)]
pub const NUM_THREADS: u64 = 10;
#[allow(dead_code)]
pub const NUM_ITERATIONS: u64 = 1_000;

/// Record a timer, counter and gauge on every iteration of every thread,
/// flushing every tenth iteration. Returns the client so that callers can
/// check what is left in the buffer.
#[allow(dead_code)]
pub fn run_arc_threaded_test(client: StatfulClient, num_threads: u64, iterations: u64) -> Arc<StatfulClient> {
    let shared_client = Arc::new(client);

    let threads: Vec<_> = (0..num_threads)
        .map(|_| {
            let local_client = Arc::clone(&shared_client);

            thread::spawn(move || {
                for i in 0..iterations {
                    local_client.inc("some.counter", i);
                    local_client.time("some.timer", i);
                    local_client.gauge("some.gauge", i as f64);

                    if i % 10 == 9 {
                        local_client.flush();
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    shared_client
}
