// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error;
use std::fmt;
use std::io;

/// Trait for metrics to expose their wire representation.
///
/// The metric string is a single line in the Statful format, without a
/// trailing newline.
pub trait Metric {
    fn as_metric_str(&self) -> &str;
}

/// Statistical reduction the collector should compute for a metric over
/// each aggregation window.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Aggregation {
    Avg,
    Count,
    CountPs,
    Sum,
    First,
    Last,
    P90,
    P95,
    P99,
    Min,
    Max,
    Derivative,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Aggregation::Avg => "avg",
            Aggregation::Count => "count",
            Aggregation::CountPs => "count_ps",
            Aggregation::Sum => "sum",
            Aggregation::First => "first",
            Aggregation::Last => "last",
            Aggregation::P90 => "p90",
            Aggregation::P95 => "p95",
            Aggregation::P99 => "p99",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Derivative => "derivative",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

impl TryFrom<&str> for Aggregation {
    type Error = MetricError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let agg = match s {
            "avg" => Aggregation::Avg,
            "count" => Aggregation::Count,
            "count_ps" => Aggregation::CountPs,
            "sum" => Aggregation::Sum,
            "first" => Aggregation::First,
            "last" => Aggregation::Last,
            "p90" => Aggregation::P90,
            "p95" => Aggregation::P95,
            "p99" => Aggregation::P99,
            "min" => Aggregation::Min,
            "max" => Aggregation::Max,
            "derivative" => Aggregation::Derivative,
            _ => return Err(MetricError::from((ErrorKind::InvalidInput, "Unknown aggregation"))),
        };

        Ok(agg)
    }
}

/// Length, in seconds, of the window the collector aggregates over.
///
/// Only the windows supported by the collector can be represented.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum AggregationFrequency {
    #[default]
    TenSeconds,
    FifteenSeconds,
    ThirtySeconds,
    OneMinute,
    FiveMinutes,
}

impl AggregationFrequency {
    pub fn as_secs(&self) -> u32 {
        match *self {
            AggregationFrequency::TenSeconds => 10,
            AggregationFrequency::FifteenSeconds => 15,
            AggregationFrequency::ThirtySeconds => 30,
            AggregationFrequency::OneMinute => 60,
            AggregationFrequency::FiveMinutes => 300,
        }
    }
}

impl TryFrom<u32> for AggregationFrequency {
    type Error = MetricError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        match secs {
            10 => Ok(AggregationFrequency::TenSeconds),
            15 => Ok(AggregationFrequency::FifteenSeconds),
            30 => Ok(AggregationFrequency::ThirtySeconds),
            60 => Ok(AggregationFrequency::OneMinute),
            300 => Ok(AggregationFrequency::FiveMinutes),
            _ => Err(MetricError::from((
                ErrorKind::InvalidInput,
                "Aggregation frequency must be one of 10, 15, 30, 60 or 300",
            ))),
        }
    }
}

/// Potential categories an error from this library falls into.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    InvalidInput,
    IoError,
}

/// Error generated by this library for various reasons.
///
/// Errors are either I/O errors from the underlying transport or invalid
/// input supplied when building a client or a metric. The quiet methods of
/// the client never return these, they are handed to the error handler.
#[derive(Debug)]
pub struct MetricError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    IoError(io::Error),
}

impl MetricError {
    /// Return the kind of the error
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::IoError(_) => ErrorKind::IoError,
            ErrorRepr::WithDescription(kind, _) => kind,
        }
    }
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::IoError(ref err) => err.fmt(f),
            ErrorRepr::WithDescription(_, desc) => desc.fmt(f),
        }
    }
}

impl error::Error for MetricError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.repr {
            ErrorRepr::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MetricError {
    fn from(err: io::Error) -> MetricError {
        MetricError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<(ErrorKind, &'static str)> for MetricError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> MetricError {
        MetricError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

pub type MetricResult<T> = Result<T, MetricError>;
