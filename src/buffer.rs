// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::line::MetricLine;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered, in-memory sequence of metric lines waiting to be flushed.
///
/// Appends and drains share a single lock so that a drain never observes a
/// partially emptied buffer and an append is never lost between a read and
/// a clear. There is no upper bound on the number of lines held.
#[derive(Debug, Default)]
pub(crate) struct MetricBuffer {
    lines: Mutex<Vec<MetricLine>>,
}

impl MetricBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock can't leave a half written line behind
    // since lines are pushed whole, so a poisoned buffer is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<MetricLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn append(&self, line: MetricLine) {
        if !line.is_empty() {
            self.lock().push(line);
        }
    }

    /// Take every buffered line, leaving the buffer empty.
    pub(crate) fn drain_all(&self) -> Vec<MetricLine> {
        mem::take(&mut *self.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::MetricBuffer;
    use crate::line::MetricLine;
    use crate::types::Metric;
    use std::sync::Arc;
    use std::thread;

    fn line(s: &str) -> MetricLine {
        MetricLine::new(s.to_string())
    }

    #[test]
    fn test_buffer_append_and_drain() {
        let buffer = MetricBuffer::new();
        buffer.append(line("a"));
        buffer.append(line("b"));

        assert_eq!(2, buffer.len());
        let drained: Vec<_> = buffer.drain_all().iter().map(|l| l.as_metric_str().to_string()).collect();
        assert_eq!(vec!["a", "b"], drained);
        assert_eq!(0, buffer.len());
    }

    #[test]
    fn test_buffer_ignores_empty_lines() {
        let buffer = MetricBuffer::new();
        buffer.append(line(""));

        assert_eq!(0, buffer.len());
    }

    #[test]
    fn test_buffer_drain_empty() {
        let buffer = MetricBuffer::new();
        assert!(buffer.drain_all().is_empty());
    }

    #[test]
    fn test_buffer_concurrent_appends_and_drains() {
        let buffer = Arc::new(MetricBuffer::new());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let local = Arc::clone(&buffer);
                thread::spawn(move || {
                    let mut drained = 0;
                    for i in 0..250 {
                        local.append(line(&format!("line {}", i)));
                        if i % 50 == 0 {
                            drained += local.drain_all().len();
                        }
                    }
                    drained
                })
            })
            .collect();

        let drained: usize = writers.into_iter().map(|t| t.join().unwrap()).sum();
        assert_eq!(1000, drained + buffer.drain_all().len());
    }
}
