// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::buffer::MetricBuffer;
use crate::builder::{MetricBuilder, MetricKind, MetricOptions};
use crate::config::ClientConfig;
use crate::formatter::{MetricFormatter, MetricValue, ToMetricValue};
use crate::line::MetricLine;
use crate::sampler;
use crate::sinks::{ConsoleMetricSink, MetricSink, SinkStats, UdpMetricSink};
use crate::tags::{self, TagSet};
use crate::types::{Aggregation, ErrorKind, Metric, MetricError, MetricResult};
use std::fmt;
use std::panic::RefUnwindSafe;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const FLUSH_LENGTH_METRIC: &str = "buffer";
const FLUSH_LENGTH_AGGREGATIONS: &[Aggregation] = &[Aggregation::Avg];

/// Trait for recording timings in milliseconds.
///
/// Timings are emitted with the `timer.` name prefix, a `unit=ms` tag and the
/// `avg`, `p90` and `count` aggregations unless told otherwise.
pub trait Timed<T>
where
    T: ToMetricValue,
{
    /// Return a builder for a timing that can have options set before it
    /// is buffered.
    fn time_with_options(&self, key: &str, value: T) -> MetricBuilder<'_>;

    /// Buffer a timing with default options.
    fn time(&self, key: &str, value: T) {
        self.time_with_options(key, value).send()
    }
}

/// Trait for incrementing counters.
///
/// Counters are emitted with the `counter.` name prefix and the `sum` and
/// `count` aggregations unless told otherwise.
pub trait Counted<T>
where
    T: ToMetricValue,
{
    /// Return a builder for a counter that can have options set before it
    /// is buffered.
    fn inc_with_options(&self, key: &str, value: T) -> MetricBuilder<'_>;

    /// Buffer a counter increment with default options.
    fn inc(&self, key: &str, value: T) {
        self.inc_with_options(key, value).send()
    }
}

/// Trait for recording gauge values.
///
/// Gauges are emitted with the `gauge.` name prefix and the `last`
/// aggregation unless told otherwise.
pub trait Gauged<T>
where
    T: ToMetricValue,
{
    /// Return a builder for a gauge that can have options set before it
    /// is buffered.
    fn gauge_with_options(&self, key: &str, value: T) -> MetricBuilder<'_>;

    /// Buffer a gauge value with default options.
    fn gauge(&self, key: &str, value: T) {
        self.gauge_with_options(key, value).send()
    }
}

/// Trait that encompasses all other traits for emitting metrics along with
/// delivering them.
///
/// Useful for referring to a client as a trait object, for example to swap
/// it for a different implementation in tests.
pub trait MetricClient:
    Timed<u64> + Timed<Duration> + Counted<i64> + Counted<u64> + Gauged<i64> + Gauged<u64> + Gauged<f64>
{
    /// Deliver every buffered metric, discarding errors.
    fn flush(&self);

    /// Deliver every buffered metric and release the transport unless the
    /// client is persistent, discarding errors.
    fn send(&self);

    /// Release the transport, discarding errors.
    fn close(&self);
}

/// Builder for creating and customizing `StatfulClient` instances.
///
/// Instances of the builder should be created by calling the `::builder()`
/// method on the `StatfulClient` struct.
///
/// # Example
///
/// ```
/// use statful::prelude::*;
/// use statful::{ClientConfig, MetricError, NopMetricSink, StatfulClient};
///
/// fn my_error_handler(err: MetricError) {
///     println!("Metric error! {}", err);
/// }
///
/// let client = StatfulClient::builder(ClientConfig::new("prefix"), NopMetricSink)
///     .with_error_handler(my_error_handler)
///     .build();
///
/// client.inc("something", 1);
/// ```
pub struct StatfulClientBuilder {
    config: ClientConfig,
    sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    mock_sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    errors: Box<dyn Fn(MetricError) + Sync + Send + RefUnwindSafe>,
}

impl StatfulClientBuilder {
    // Set the required fields and defaults for optional fields
    fn new<T>(config: ClientConfig, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        StatfulClientBuilder {
            // required
            config,
            sink: Box::new(sink),

            // optional with defaults
            mock_sink: Box::new(ConsoleMetricSink),
            errors: Box::new(nop_error_handler),
        }
    }

    /// Set an error handler for errors that the client would otherwise
    /// discard.
    ///
    /// The error handler is invoked when metrics can't be buffered or
    /// delivered: transport errors when flushing or closing, tags that can't
    /// be written on a metric line, or a system clock that can't produce a
    /// timestamp. Errors are also logged with
    /// `tracing` regardless of the handler.
    ///
    /// The error handler should consume the error without panicking.
    pub fn with_error_handler<F>(mut self, errors: F) -> Self
    where
        F: Fn(MetricError) + Sync + Send + RefUnwindSafe + 'static,
    {
        self.errors = Box::new(errors);
        self
    }

    /// Set the sink that receives flushed metrics when the client runs in
    /// mock mode. Defaults to printing to stdout.
    pub fn with_mock_sink<T>(mut self, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        self.mock_sink = Box::new(sink);
        self
    }

    /// Construct a new `StatfulClient` instance based on current settings.
    pub fn build(self) -> StatfulClient {
        StatfulClient::from_builder(self)
    }
}

/// Client for Statful that buffers metrics in memory and delivers them in a
/// single write when flushed.
///
/// # Traits
///
/// * `Timed` for recording timings.
/// * `Counted` for incrementing counters.
/// * `Gauged` for recording gauge values.
/// * `MetricClient` for a combination of all of the above, plus delivery.
///
/// # Errors
///
/// None of the methods for recording or delivering metrics return errors or
/// panic: instrumentation must never interrupt the application. Errors are
/// handed to the error handler set with
/// `StatfulClientBuilder::with_error_handler` and logged with `tracing`.
/// The `try_*` variants return them for callers that care.
///
/// # Threading
///
/// The client is `Send` and `Sync` and may be shared between threads behind
/// an `Arc`. All buffer operations are guarded by a single lock.
///
/// # Example
///
/// ```
/// use statful::prelude::*;
/// use statful::{ClientConfig, SpyMetricSink, StatfulClient};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let client = StatfulClient::from_sink(ClientConfig::new("app").with_app("checkout"), sink);
///
/// client.inc("orders", 1);
/// client.time("payment", 120u64);
/// client.flush();
///
/// let message = String::from_utf8(rx.recv().unwrap()).unwrap();
/// assert_eq!(3, message.lines().count());
/// ```
pub struct StatfulClient {
    config: ClientConfig,
    buffer: MetricBuffer,
    sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    mock_sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    errors: Box<dyn Fn(MetricError) + Sync + Send + RefUnwindSafe>,
}

impl StatfulClient {
    /// Create a new client that sends metrics over UDP to the host and port
    /// of the configuration.
    ///
    /// This never fails: if the UDP transport can't be opened, the failure is
    /// logged and the client still buffers metrics, but only delivers them
    /// when in mock mode.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use statful::prelude::*;
    /// use statful::{ClientConfig, StatfulClient};
    ///
    /// let config = ClientConfig::new("my.app")
    ///     .with_target("metrics.example.com", 2013)
    ///     .with_environment("production");
    /// let client = StatfulClient::new(config);
    ///
    /// client.inc("logins", 1);
    /// client.send();
    /// ```
    pub fn new(config: ClientConfig) -> Self {
        let sink = UdpMetricSink::connect(config.host(), config.port());
        Self::from_sink(config, sink)
    }

    /// Create a new client that delivers metrics to the given `MetricSink`.
    ///
    /// Note that this client will discard errors.
    pub fn from_sink<T>(config: ClientConfig, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        Self::builder(config, sink).build()
    }

    /// Create a new builder with the provided configuration and sink.
    pub fn builder<T>(config: ClientConfig, sink: T) -> StatfulClientBuilder
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        StatfulClientBuilder::new(config, sink)
    }

    // Create a new StatfulClient by consuming the builder
    fn from_builder(builder: StatfulClientBuilder) -> Self {
        StatfulClient {
            config: builder.config,
            buffer: MetricBuffer::new(),
            sink: builder.sink,
            mock_sink: builder.mock_sink,
            errors: builder.errors,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return this client with a new configuration, keeping its buffer,
    /// sinks and error handler.
    ///
    /// The transport is not re-created, so a different host or port in the
    /// new configuration has no effect.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of metric lines waiting to be flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// I/O telemetry of the transport.
    pub fn sink_stats(&self) -> SinkStats {
        self.sink.stats()
    }

    /// Return a builder for a metric with a name that is used verbatim (no
    /// kind prefix) and no aggregations unless set.
    pub fn put_with_options<T>(&self, metric: &str, value: T) -> MetricBuilder<'_>
    where
        T: ToMetricValue,
    {
        self.builder_for(MetricKind::Raw, metric, value)
    }

    /// Buffer a metric with a name that is used verbatim and default options.
    pub fn put<T>(&self, metric: &str, value: T)
    where
        T: ToMetricValue,
    {
        self.put_with_options(metric, value).send()
    }

    fn builder_for<T>(&self, kind: MetricKind, key: &str, value: T) -> MetricBuilder<'_>
    where
        T: ToMetricValue,
    {
        MetricBuilder::new(MetricOptions::new(kind, key, value.to_metric_value()), self)
    }

    // Apply client defaults, then resolve tags, sample and format. `None`
    // means the metric was dropped on purpose.
    fn format_metric(&self, opts: &MetricOptions) -> MetricResult<Option<MetricLine>> {
        let tags = tags::resolve(self.config.tags(), &opts.tags, self.config.tag_precedence());
        tags.validate()?;

        let rate = opts.sample_rate.unwrap_or_else(|| self.config.sample_rate());

        if !sampler::should_emit(rate) {
            return Ok(None);
        }

        let namespace = opts.namespace.as_deref().unwrap_or_else(|| self.config.namespace());
        let freq = opts.agg_freq.unwrap_or_else(|| self.config.agg_freq());
        let timestamp = unix_timestamp()?;

        let mut fmt = MetricFormatter::new(self.config.prefix(), namespace, &opts.name, opts.value);
        fmt.with_tags(&tags)
            .with_timestamp(timestamp)
            .with_aggregations(opts.aggregations(), freq.as_secs())
            .with_sample_rate(rate);

        match fmt.format() {
            Some(line) => Ok(Some(MetricLine::new(line))),
            None => {
                debug!(metric = opts.name.as_str(), "Dropping metric without tags.");
                Ok(None)
            }
        }
    }

    pub(crate) fn put_metric(&self, opts: &MetricOptions) -> MetricResult<Option<MetricLine>> {
        let line = self.format_metric(opts)?;
        if let Some(ref l) = line {
            self.buffer.append(l.clone());
        }
        Ok(line)
    }

    // Self-observation of the size of a batch, appended to the batch itself
    fn flush_length_line(&self, size: usize) -> MetricResult<Option<MetricLine>> {
        let mut opts = MetricOptions::new(MetricKind::Raw, FLUSH_LENGTH_METRIC, MetricValue::Unsigned(size as u64));
        opts.tags = TagSet::from_iter([("type", "flush_length")]);
        opts.aggregations = Some(FLUSH_LENGTH_AGGREGATIONS.to_vec());
        self.format_metric(&opts)
    }

    /// Deliver every buffered metric in a single write, returning the number
    /// of bytes written. The sink is flushed after the write.
    ///
    /// The buffer is emptied even if the write fails. Nothing is written when
    /// the buffer is empty. When more than one metric is buffered, a metric
    /// named `buffer` tagged `type=flush_length` with the number of buffered
    /// metrics is added to the batch.
    pub fn try_flush(&self) -> MetricResult<usize> {
        let mut lines = self.buffer.drain_all();
        if lines.is_empty() {
            return Ok(0);
        }

        if lines.len() > 1 {
            match self.flush_length_line(lines.len()) {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {}
                Err(e) => self.consume_error(e),
            }
        }

        let message = join_lines(&lines);
        let sink = if self.config.is_mock() {
            &self.mock_sink
        } else {
            &self.sink
        };

        let written = sink.emit(&message)?;
        sink.flush()?;
        Ok(written)
    }

    /// Deliver every buffered metric, then release the transport unless the
    /// client is persistent.
    pub fn try_send(&self) -> MetricResult<usize> {
        let res = self.try_flush();
        if !self.config.is_persistent() {
            if let Err(e) = self.try_close() {
                // a flush error takes priority, the close error still gets reported
                if res.is_err() {
                    self.consume_error(e);
                } else {
                    return Err(e);
                }
            }
        }
        res
    }

    /// Release the transport. A closed UDP transport is re-opened by the next
    /// flush.
    pub fn try_close(&self) -> MetricResult<()> {
        Ok(self.sink.close()?)
    }

    /// Like `try_flush`, discarding errors.
    pub fn flush(&self) {
        if let Err(e) = self.try_flush() {
            self.consume_error(e);
        }
    }

    /// Like `try_send`, discarding errors.
    pub fn send(&self) {
        self.flush();
        if !self.config.is_persistent() {
            self.close();
        }
    }

    /// Like `try_close`, discarding errors.
    pub fn close(&self) {
        if let Err(e) = self.try_close() {
            self.consume_error(e);
        }
    }

    pub(crate) fn consume_error(&self, err: MetricError) {
        warn!(error = %err, "Discarding metric error.");
        (self.errors)(err);
    }
}

impl fmt::Debug for StatfulClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StatfulClient {{ config: {:?}, buffered: {}, sink: ..., mock_sink: ..., errors: ... }}",
            self.config,
            self.buffer.len(),
        )
    }
}

impl<T> Timed<T> for StatfulClient
where
    T: ToMetricValue,
{
    fn time_with_options(&self, key: &str, value: T) -> MetricBuilder<'_> {
        self.builder_for(MetricKind::Timer, key, value)
    }
}

impl<T> Counted<T> for StatfulClient
where
    T: ToMetricValue,
{
    fn inc_with_options(&self, key: &str, value: T) -> MetricBuilder<'_> {
        self.builder_for(MetricKind::Counter, key, value)
    }
}

impl<T> Gauged<T> for StatfulClient
where
    T: ToMetricValue,
{
    fn gauge_with_options(&self, key: &str, value: T) -> MetricBuilder<'_> {
        self.builder_for(MetricKind::Gauge, key, value)
    }
}

impl MetricClient for StatfulClient {
    fn flush(&self) {
        StatfulClient::flush(self)
    }

    fn send(&self) {
        StatfulClient::send(self)
    }

    fn close(&self) {
        StatfulClient::close(self)
    }
}

fn unix_timestamp() -> MetricResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| MetricError::from((ErrorKind::InvalidInput, "System clock is set before the Unix epoch")))
}

fn join_lines(lines: &[MetricLine]) -> String {
    let size: usize = lines.iter().map(|l| l.len() + 1).sum();
    let mut out = String::with_capacity(size);

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.as_metric_str());
    }

    out
}

#[allow(clippy::needless_pass_by_value)]
fn nop_error_handler(_err: MetricError) {
    // nothing
}
