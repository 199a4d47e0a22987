// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2018 Philip Jenvey <pjenvey@mozilla.com>
// Copyright 2018-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::client::StatfulClient;
use crate::formatter::MetricValue;
use crate::line::MetricLine;
use crate::sampler::SampleRate;
use crate::tags::TagSet;
use crate::types::{Aggregation, AggregationFrequency, MetricResult};

/// Kind of metric, which decides the name prefix and the defaults applied
/// to a metric before it is buffered.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum MetricKind {
    Timer,
    Counter,
    Gauge,
    Raw,
}

impl MetricKind {
    const TIMER_AGGREGATIONS: &'static [Aggregation] = &[Aggregation::Avg, Aggregation::P90, Aggregation::Count];
    const COUNTER_AGGREGATIONS: &'static [Aggregation] = &[Aggregation::Sum, Aggregation::Count];
    const GAUGE_AGGREGATIONS: &'static [Aggregation] = &[Aggregation::Last];

    fn name_prefix(&self) -> &'static str {
        match *self {
            MetricKind::Timer => "timer.",
            MetricKind::Counter => "counter.",
            MetricKind::Gauge => "gauge.",
            MetricKind::Raw => "",
        }
    }

    pub(crate) fn default_aggregations(&self) -> &'static [Aggregation] {
        match *self {
            MetricKind::Timer => Self::TIMER_AGGREGATIONS,
            MetricKind::Counter => Self::COUNTER_AGGREGATIONS,
            MetricKind::Gauge => Self::GAUGE_AGGREGATIONS,
            MetricKind::Raw => &[],
        }
    }

    fn default_tags(&self) -> TagSet {
        let mut tags = TagSet::new();
        if *self == MetricKind::Timer {
            tags.insert("unit", "ms");
        }
        tags
    }
}

/// Everything known about a metric before the client defaults are applied.
#[derive(Debug, Clone)]
pub(crate) struct MetricOptions {
    pub(crate) kind: MetricKind,
    pub(crate) name: String,
    pub(crate) value: MetricValue,
    pub(crate) tags: TagSet,
    pub(crate) namespace: Option<String>,
    pub(crate) aggregations: Option<Vec<Aggregation>>,
    pub(crate) agg_freq: Option<AggregationFrequency>,
    pub(crate) sample_rate: Option<SampleRate>,
}

impl MetricOptions {
    pub(crate) fn new(kind: MetricKind, key: &str, value: MetricValue) -> Self {
        MetricOptions {
            kind,
            name: format!("{}{}", kind.name_prefix(), key),
            value,
            tags: kind.default_tags(),
            namespace: None,
            aggregations: None,
            agg_freq: None,
            sample_rate: None,
        }
    }

    pub(crate) fn aggregations(&self) -> &[Aggregation] {
        self.aggregations
            .as_deref()
            .unwrap_or_else(|| self.kind.default_aggregations())
    }
}

/// Builder for customizing a metric before it is buffered.
///
/// Any option that isn't set uses the defaults of the metric kind and of the
/// client that created the builder. The metric is added to the buffer of the
/// client when `MetricBuilder::send()` or `MetricBuilder::try_send()` is
/// invoked.
///
/// NOTE: The only way to instantiate an instance of this builder is via
/// methods on the `StatfulClient` client.
///
/// # Examples
///
/// ## `.try_send()`
///
/// ```
/// use statful::prelude::*;
/// use statful::{Aggregation, ClientConfig, Metric, NopMetricSink, StatfulClient};
///
/// let client = StatfulClient::from_sink(ClientConfig::new("app"), NopMetricSink);
/// let res = client.inc_with_options("orders", 5)
///     .with_tag("type", "purchase")
///     .with_aggregations(&[Aggregation::Sum])
///     .try_send();
///
/// let line = res.unwrap().unwrap();
/// assert!(line.as_metric_str().starts_with("app.application.counter.orders,type=purchase 5 "));
/// assert!(line.as_metric_str().ends_with(" sum,10"));
/// ```
///
/// ## `.send()`
///
/// ```
/// use statful::prelude::*;
/// use statful::{ClientConfig, NopMetricSink, StatfulClient};
///
/// let client = StatfulClient::builder(ClientConfig::new("app"), NopMetricSink)
///     .with_error_handler(|e| eprintln!("metric error: {}", e))
///     .build();
///
/// client.time_with_options("query", 42u64)
///     .with_tag("table", "users")
///     .with_namespace("database")
///     .send();
///
/// assert_eq!(1, client.buffered());
/// ```
///
/// Note that nothing is returned from the `.send()` method. Any errors
/// encountered in this case will be passed to the error handler.
#[must_use = "Did you forget to call .send() after setting options?"]
#[derive(Debug)]
pub struct MetricBuilder<'c> {
    options: MetricOptions,
    client: &'c StatfulClient,
}

impl<'c> MetricBuilder<'c> {
    pub(crate) fn new(options: MetricOptions, client: &'c StatfulClient) -> Self {
        MetricBuilder { options, client }
    }

    /// Add a key-value tag to this metric, replacing any earlier tag with the
    /// same key.
    ///
    /// Keys and values containing a space, `,`, `=` or a line break make the
    /// metric fail with `ErrorKind::InvalidInput` when it is sent.
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.options.tags.insert(key, value);
        self
    }

    /// Add every tag of the set to this metric.
    pub fn with_tags(mut self, tags: &TagSet) -> Self {
        self.options.tags.merge(tags);
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.options.namespace = Some(namespace.to_string());
        self
    }

    /// Replace the default aggregations of this metric. An empty list means
    /// no aggregations are requested from the collector.
    pub fn with_aggregations(mut self, aggregations: &[Aggregation]) -> Self {
        self.options.aggregations = Some(aggregations.to_vec());
        self
    }

    pub fn with_agg_freq(mut self, freq: AggregationFrequency) -> Self {
        self.options.agg_freq = Some(freq);
        self
    }

    pub fn with_sample_rate(mut self, rate: SampleRate) -> Self {
        self.options.sample_rate = Some(rate);
        self
    }

    /// Buffer the metric with the client that created this builder.
    ///
    /// Returns the buffered line, or `None` if the metric was dropped because
    /// it ended up without tags or was not picked by sampling.
    pub fn try_send(self) -> MetricResult<Option<MetricLine>> {
        self.client.put_metric(&self.options)
    }

    /// Buffer the metric with the client that created this builder, discarding
    /// the result and invoking the error handler of the client for errors.
    pub fn send(self) {
        let client = self.client;
        if let Err(e) = self.try_send() {
            client.consume_error(e);
        }
    }
}
