// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub bytes_dropped: u64,
    pub packets_dropped: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SocketStats {
    bytes_sent: Arc<AtomicU64>,
    packets_sent: Arc<AtomicU64>,
    bytes_dropped: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
}

impl SocketStats {
    pub(crate) fn update(&self, res: io::Result<usize>, len: usize) -> io::Result<usize> {
        match res {
            Ok(written) => {
                self.bytes_sent.fetch_add(written as u64, Ordering::Relaxed);
                self.packets_sent.fetch_add(1, Ordering::Relaxed);
                Ok(written)
            }
            Err(e) => {
                self.bytes_dropped.fetch_add(len as u64, Ordering::Relaxed);
                self.packets_dropped.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

impl From<&SocketStats> for SinkStats {
    fn from(stats: &SocketStats) -> Self {
        SinkStats {
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            packets_sent: stats.packets_sent.load(Ordering::Relaxed),
            bytes_dropped: stats.bytes_dropped.load(Ordering::Relaxed),
            packets_dropped: stats.packets_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Trait for the transports that deliver flushed metrics to a collector.
///
/// The message passed to `emit` is either a single metric line or several
/// lines joined by a newline, and never has a trailing newline. For example:
///
/// ``` text
/// app.application.counter.orders,type=purchase 5 1500000000 sum,count,10
/// app.application.buffer,type=flush_length 2 1500000000 avg,10
/// ```
///
/// Each call to `emit` is expected to be a single, fire-and-forget write (one
/// datagram for UDP). Sinks must not retry.
pub trait MetricSink {
    /// Send the message using this sink and return the number of bytes
    /// written or an I/O error.
    fn emit(&self, message: &str) -> io::Result<usize>;

    /// Flush anything the sink itself may be holding on to.
    ///
    /// Not all sinks buffer, so the default implementation does nothing.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Release the underlying connection, if there is one.
    ///
    /// The default implementation does nothing.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    /// Return I/O telemetry like bytes / packets sent or dropped.
    ///
    /// Note that not all sinks implement this method and the default
    /// implementation returns zeros.
    fn stats(&self) -> SinkStats {
        SinkStats::default()
    }
}

/// Implementation of a `MetricSink` that discards all metrics.
///
/// Useful for disabling metric collection or unit tests.
#[derive(Debug, Clone)]
pub struct NopMetricSink;

impl MetricSink for NopMetricSink {
    fn emit(&self, _message: &str) -> io::Result<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{MetricSink, NopMetricSink, SinkStats, SocketStats};
    use std::io;

    #[test]
    fn test_nop_metric_sink() {
        let sink = NopMetricSink;
        assert_eq!(0, sink.emit("a.b.c,x=y 4 1").unwrap());
        assert!(sink.close().is_ok());
        assert_eq!(SinkStats::default(), sink.stats());
    }

    #[test]
    fn test_socket_stats_update() {
        let stats = SocketStats::default();
        let _ = stats.update(Ok(12), 12);
        let _ = stats.update(Err(io::Error::new(io::ErrorKind::Other, "dropped")), 30);

        let snapshot = SinkStats::from(&stats);
        assert_eq!(12, snapshot.bytes_sent);
        assert_eq!(1, snapshot.packets_sent);
        assert_eq!(30, snapshot.bytes_dropped);
        assert_eq!(1, snapshot.packets_dropped);
    }
}
