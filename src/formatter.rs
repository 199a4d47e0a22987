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

use crate::sampler::SampleRate;
use crate::tags::TagSet;
use crate::types::Aggregation;
use std::fmt::{self, Write};
use std::time::Duration;

/// Holder for primitive metric values that knows how to display itself
///
/// Values are always non-negative on the wire. Use `ToMetricValue` to get
/// one of these from the various types accepted by the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl MetricValue {
    pub const ZERO: MetricValue = MetricValue::Unsigned(0);

    /// Collapse zero, negative, NaN and infinite values to a plain `0`.
    pub fn coerced(self) -> MetricValue {
        match self {
            MetricValue::Signed(v) if v > 0 => self,
            MetricValue::Unsigned(v) if v > 0 => self,
            MetricValue::Float(v) if v > 0.0 && v.is_finite() => self,
            _ => MetricValue::ZERO,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricValue::Signed(v) => v.fmt(f),
            MetricValue::Unsigned(v) => v.fmt(f),
            MetricValue::Float(v) => v.fmt(f),
        }
    }
}

/// Conversion trait for values that can be emitted as a metric
///
/// Anything that is "falsy" or negative becomes `0`: `false`, `None`, empty
/// strings and strings that are not numbers included.
pub trait ToMetricValue {
    fn to_metric_value(self) -> MetricValue;
}

impl ToMetricValue for MetricValue {
    fn to_metric_value(self) -> MetricValue {
        self.coerced()
    }
}

impl ToMetricValue for i64 {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Signed(self).coerced()
    }
}

impl ToMetricValue for i32 {
    fn to_metric_value(self) -> MetricValue {
        i64::from(self).to_metric_value()
    }
}

impl ToMetricValue for u64 {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Unsigned(self)
    }
}

impl ToMetricValue for u32 {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Unsigned(u64::from(self))
    }
}

impl ToMetricValue for usize {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Unsigned(self as u64)
    }
}

impl ToMetricValue for f64 {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Float(self).coerced()
    }
}

impl ToMetricValue for bool {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Unsigned(u64::from(self))
    }
}

/// Durations are emitted as whole milliseconds, saturating at `u64::MAX`.
impl ToMetricValue for Duration {
    fn to_metric_value(self) -> MetricValue {
        MetricValue::Unsigned(u64::try_from(self.as_millis()).unwrap_or(u64::MAX))
    }
}

impl ToMetricValue for &str {
    fn to_metric_value(self) -> MetricValue {
        let trimmed = self.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            v.to_metric_value()
        } else if let Ok(v) = trimmed.parse::<f64>() {
            v.to_metric_value()
        } else {
            MetricValue::ZERO
        }
    }
}

impl ToMetricValue for String {
    fn to_metric_value(self) -> MetricValue {
        self.as_str().to_metric_value()
    }
}

impl<T> ToMetricValue for Option<T>
where
    T: ToMetricValue,
{
    fn to_metric_value(self) -> MetricValue {
        self.map_or(MetricValue::ZERO, ToMetricValue::to_metric_value)
    }
}

/// Builds a single metric line in the wire format:
///
/// ``` text
/// <prefix>.<namespace>.<name>,<k1>=<v1>,... <value> <timestamp> [<agg1>,...,<freq>] [<rate>]
/// ```
#[derive(Debug, Clone)]
pub(crate) struct MetricFormatter<'a> {
    prefix: &'a str,
    namespace: &'a str,
    name: &'a str,
    val: MetricValue,
    tags: Option<&'a TagSet>,
    timestamp: u64,
    aggregations: &'a [Aggregation],
    agg_freq: u32,
    sample_rate: SampleRate,
}

impl<'a> MetricFormatter<'a> {
    pub(crate) fn new(prefix: &'a str, namespace: &'a str, name: &'a str, val: MetricValue) -> Self {
        MetricFormatter {
            prefix,
            namespace,
            name,
            val: val.coerced(),
            tags: None,
            timestamp: 0,
            aggregations: &[],
            agg_freq: 0,
            sample_rate: SampleRate::ALWAYS,
        }
    }

    pub(crate) fn with_tags(&mut self, tags: &'a TagSet) -> &mut Self {
        self.tags = Some(tags);
        self
    }

    pub(crate) fn with_timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn with_aggregations(&mut self, aggregations: &'a [Aggregation], freq: u32) -> &mut Self {
        self.aggregations = aggregations;
        self.agg_freq = freq;
        self
    }

    pub(crate) fn with_sample_rate(&mut self, rate: SampleRate) -> &mut Self {
        self.sample_rate = rate;
        self
    }

    fn has_aggregations(&self) -> bool {
        !self.aggregations.is_empty() && self.agg_freq > 0
    }

    fn size_hint(&self, tags: &TagSet) -> usize {
        self.prefix.len() + self.namespace.len() + self.name.len() + 2 /* dots */
            + tags.rendered_size()
            + 1 /* space */ + 10 /* value */
            + 1 /* space */ + 10 /* timestamp */
            + if self.has_aggregations() { 1 + self.aggregations.len() * 9 + 3 } else { 0 }
            + 4 /* rate */
    }

    fn write_name(&self, out: &mut String) {
        out.push_str(self.prefix);
        out.push('.');
        out.push_str(self.namespace);
        out.push('.');
        out.push_str(self.name);
    }

    fn write_tags(&self, tags: &TagSet, out: &mut String) {
        for (key, value) in tags.iter() {
            out.push(',');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
    }

    fn write_aggregations(&self, out: &mut String) {
        if !self.has_aggregations() {
            return;
        }

        out.push(' ');
        for agg in self.aggregations {
            out.push_str(agg.as_str());
            out.push(',');
        }
        let _ = write!(out, "{}", self.agg_freq);
    }

    fn write_sample_rate(&self, out: &mut String) {
        if self.sample_rate.is_partial() {
            let _ = write!(out, " {}", self.sample_rate);
        }
    }

    /// Render the metric line, or nothing at all when there are no tags to
    /// attach the metric name to.
    pub(crate) fn format(&self) -> Option<String> {
        let tags = self.tags.filter(|t| !t.is_empty())?;

        let mut out = String::with_capacity(self.size_hint(tags));
        self.write_name(&mut out);
        self.write_tags(tags, &mut out);
        let _ = write!(out, " {} {}", self.val, self.timestamp);
        self.write_aggregations(&mut out);
        self.write_sample_rate(&mut out);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{MetricFormatter, MetricValue, ToMetricValue};
    use crate::sampler::SampleRate;
    use crate::tags::TagSet;
    use crate::types::Aggregation;
    use std::time::Duration;

    const TS: u64 = 1_500_000_000;

    fn tags(pairs: &[(&str, &str)]) -> TagSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_metric_value_coercion() {
        assert_eq!(MetricValue::ZERO, 0i64.to_metric_value());
        assert_eq!(MetricValue::ZERO, (-3i64).to_metric_value());
        assert_eq!(MetricValue::ZERO, (-3i32).to_metric_value());
        assert_eq!(MetricValue::ZERO, (-0.5f64).to_metric_value());
        assert_eq!(MetricValue::ZERO, f64::NAN.to_metric_value());
        assert_eq!(MetricValue::ZERO, f64::INFINITY.to_metric_value());
        assert_eq!(MetricValue::ZERO, "inf".to_metric_value());
        assert_eq!(MetricValue::ZERO, false.to_metric_value());
        assert_eq!(MetricValue::ZERO, None::<i64>.to_metric_value());
        assert_eq!(MetricValue::ZERO, "".to_metric_value());
        assert_eq!(MetricValue::ZERO, "not a number".to_metric_value());
        assert_eq!(MetricValue::ZERO, "-12".to_metric_value());
    }

    #[test]
    fn test_metric_value_passthrough() {
        assert_eq!(MetricValue::Signed(5), 5i64.to_metric_value());
        assert_eq!(MetricValue::Unsigned(7), 7u64.to_metric_value());
        assert_eq!(MetricValue::Unsigned(1), true.to_metric_value());
        assert_eq!(MetricValue::Float(2.5), 2.5f64.to_metric_value());
        assert_eq!(MetricValue::Signed(12), " 12 ".to_metric_value());
        assert_eq!(MetricValue::Float(1.25), "1.25".to_string().to_metric_value());
        assert_eq!(MetricValue::Unsigned(1500), Duration::from_millis(1500).to_metric_value());
        assert_eq!(MetricValue::Signed(3), Some(3i64).to_metric_value());
    }

    #[test]
    fn test_metric_value_display() {
        assert_eq!("0", MetricValue::ZERO.to_string());
        assert_eq!("42", MetricValue::Signed(42).to_string());
        assert_eq!("3.15", MetricValue::Float(3.15).to_string());
        assert_eq!("4", MetricValue::Float(4.0).to_string());
    }

    #[test]
    fn test_metric_formatter_no_tags_suppressed() {
        let empty = TagSet::new();
        let mut fmt = MetricFormatter::new("app", "application", "counter.orders", MetricValue::Signed(5));
        assert_eq!(None, fmt.format());

        fmt.with_tags(&empty);
        assert_eq!(None, fmt.format());
    }

    #[test]
    fn test_metric_formatter_basic() {
        let tags = tags(&[("type", "purchase")]);
        let mut fmt = MetricFormatter::new("app", "application", "counter.orders", MetricValue::Signed(5));
        fmt.with_tags(&tags).with_timestamp(TS);

        assert_eq!(Some("app.application.counter.orders,type=purchase 5 1500000000".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_empty_prefix() {
        let tags = tags(&[("a", "b")]);
        let mut fmt = MetricFormatter::new("", "application", "timer.query", MetricValue::Unsigned(3));
        fmt.with_tags(&tags).with_timestamp(TS);

        assert_eq!(Some(".application.timer.query,a=b 3 1500000000".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_coerces_negative_values() {
        let tags = tags(&[("a", "b")]);
        let mut fmt = MetricFormatter::new("p", "ns", "gauge.sessions", MetricValue::Signed(-3));
        fmt.with_tags(&tags).with_timestamp(TS);

        assert_eq!(Some("p.ns.gauge.sessions,a=b 0 1500000000".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_aggregations() {
        let tags = tags(&[("type", "purchase"), ("unit", "ms")]);
        let aggs = [Aggregation::Sum, Aggregation::Count];
        let mut fmt = MetricFormatter::new("app", "application", "counter.orders", MetricValue::Signed(5));
        fmt.with_tags(&tags).with_timestamp(TS).with_aggregations(&aggs, 10);

        assert_eq!(
            Some("app.application.counter.orders,type=purchase,unit=ms 5 1500000000 sum,count,10".to_string()),
            fmt.format()
        );
    }

    #[test]
    fn test_metric_formatter_aggregations_need_frequency() {
        let tags = tags(&[("a", "b")]);
        let aggs = [Aggregation::Avg];
        let mut fmt = MetricFormatter::new("p", "ns", "m", MetricValue::Signed(1));
        fmt.with_tags(&tags).with_timestamp(TS).with_aggregations(&aggs, 0);

        assert_eq!(Some("p.ns.m,a=b 1 1500000000".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_no_aggregations_with_frequency() {
        let tags = tags(&[("a", "b")]);
        let mut fmt = MetricFormatter::new("p", "ns", "m", MetricValue::Signed(1));
        fmt.with_tags(&tags).with_timestamp(TS).with_aggregations(&[], 30);

        assert_eq!(Some("p.ns.m,a=b 1 1500000000".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_sample_rate() {
        let tags = tags(&[("a", "b")]);
        let aggs = [Aggregation::Avg, Aggregation::P90];
        let mut fmt = MetricFormatter::new("p", "ns", "m", MetricValue::Float(1.5));
        fmt.with_tags(&tags)
            .with_timestamp(TS)
            .with_aggregations(&aggs, 60)
            .with_sample_rate(SampleRate::try_from(25).unwrap());

        assert_eq!(Some("p.ns.m,a=b 1.5 1500000000 avg,p90,60 25".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_sample_rate_without_aggregations() {
        let tags = tags(&[("a", "b")]);
        let mut fmt = MetricFormatter::new("p", "ns", "m", MetricValue::Signed(1));
        fmt.with_tags(&tags)
            .with_timestamp(TS)
            .with_sample_rate(SampleRate::try_from(50).unwrap());

        assert_eq!(Some("p.ns.m,a=b 1 1500000000 50".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_full_rate_not_written() {
        let tags = tags(&[("a", "b")]);
        let mut fmt = MetricFormatter::new("p", "ns", "m", MetricValue::Signed(1));
        fmt.with_tags(&tags).with_timestamp(TS).with_sample_rate(SampleRate::ALWAYS);

        assert_eq!(Some("p.ns.m,a=b 1 1500000000".to_string()), fmt.format());
    }

    #[test]
    fn test_metric_formatter_size_hint_covers_output() {
        let tags = tags(&[("environment", "production"), ("type", "purchase")]);
        let aggs = [Aggregation::Avg, Aggregation::P90, Aggregation::Count];
        let mut fmt = MetricFormatter::new("prefix", "application", "timer.response", MetricValue::Unsigned(1234));
        fmt.with_tags(&tags).with_timestamp(TS).with_aggregations(&aggs, 300);

        let out = fmt.format().unwrap();
        assert!(fmt.size_hint(&tags) >= out.len(), "hint too small for {}", out);
    }
}
