// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::sampler::SampleRate;
use crate::tags::TagSet;
use crate::types::{Aggregation, ErrorKind, Metric, MetricError, MetricResult};
use std::fmt;

/// A single, fully formatted metric line.
///
/// Lines are immutable once created: they are buffered by the client as-is
/// and only read again when the buffer is flushed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricLine {
    repr: String,
}

impl MetricLine {
    pub(crate) fn new(repr: String) -> Self {
        MetricLine { repr }
    }

    pub fn len(&self) -> usize {
        self.repr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repr.is_empty()
    }
}

impl Metric for MetricLine {
    fn as_metric_str(&self) -> &str {
        &self.repr
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.repr.fmt(f)
    }
}

/// Components of a metric line, as a collector would read them back.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub name: String,
    pub tags: TagSet,
    pub value: f64,
    pub timestamp: u64,
    pub aggregations: Vec<Aggregation>,
    pub agg_freq: Option<u32>,
    pub sample_rate: SampleRate,
}

impl ParsedLine {
    /// Parse a single line of the wire format.
    ///
    /// # Example
    ///
    /// ```
    /// use statful::ParsedLine;
    ///
    /// let line = ParsedLine::parse("app.application.counter.orders,type=purchase 5 1500000000 sum,count,10").unwrap();
    /// assert_eq!("app.application.counter.orders", line.name);
    /// assert_eq!(Some("purchase"), line.tags.get("type"));
    /// assert_eq!(Some(10), line.agg_freq);
    /// ```
    pub fn parse(line: &str) -> MetricResult<ParsedLine> {
        let mut fields = line.split(' ');

        let mut head = fields
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("Missing metric name"))?
            .split(',');
        let name = head.next().unwrap_or_default().to_string();

        let mut tags = TagSet::new();
        for tag in head {
            let (key, value) = tag.split_once('=').ok_or_else(|| invalid("Tag must be key=value"))?;
            tags.insert(key, value);
        }

        let value = fields
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| invalid("Missing or invalid value"))?;
        let timestamp = fields
            .next()
            .and_then(|t| t.parse::<u64>().ok())
            .ok_or_else(|| invalid("Missing or invalid timestamp"))?;

        let mut parsed = ParsedLine {
            name,
            tags,
            value,
            timestamp,
            aggregations: Vec::new(),
            agg_freq: None,
            sample_rate: SampleRate::ALWAYS,
        };

        for field in fields {
            if let Ok(rate) = field.parse::<u32>() {
                parsed.sample_rate = SampleRate::try_from(rate)?;
            } else {
                parsed.parse_aggregations(field)?;
            }
        }

        Ok(parsed)
    }

    fn parse_aggregations(&mut self, field: &str) -> MetricResult<()> {
        let (aggs, freq) = field.rsplit_once(',').ok_or_else(|| invalid("Aggregations must end with a frequency"))?;
        let freq = freq.parse::<u32>().map_err(|_| invalid("Invalid aggregation frequency"))?;

        self.aggregations = aggs.split(',').map(Aggregation::try_from).collect::<MetricResult<_>>()?;
        self.agg_freq = Some(freq);
        Ok(())
    }
}

fn invalid(desc: &'static str) -> MetricError {
    MetricError::from((ErrorKind::InvalidInput, desc))
}
