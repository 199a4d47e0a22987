// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::sinks::core::MetricSink;
use std::io::{self, Write};
use tracing::info;

/// `MetricSink` that prints flushed messages to stdout instead of sending
/// them anywhere.
///
/// This is the default destination of a client in mock mode.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMetricSink;

impl MetricSink for ConsoleMetricSink {
    fn emit(&self, message: &str) -> io::Result<usize> {
        info!(len = message.len(), "Flushing metrics in mock mode.");

        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "Flushing metrics: {}", message)?;
        Ok(message.len())
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConsoleMetricSink, MetricSink};

    #[test]
    fn test_console_metric_sink() {
        let sink = ConsoleMetricSink;
        assert_eq!(13, sink.emit("a.b.c,x=y 1 2").unwrap());
        assert!(sink.flush().is_ok());
    }
}
