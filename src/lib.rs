// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A buffered UDP metrics client for Rust!
//!
//! Statful buffers timers, counters and gauges in memory, tagged and
//! annotated with the aggregations the collector should compute, and
//! delivers them in a single UDP datagram when flushed.
//!
//! ## Features
//!
//! * Timers, counters, gauges and raw metrics with per-kind defaults.
//! * Global tags (environment, platform, app and custom tags) merged into
//!   every metric with a configurable precedence.
//! * Client side sampling with the sample rate written on the metric line.
//! * A mock mode that prints metrics instead of sending them.
//! * Support for alternate backends via the `MetricSink` trait.
//!
//! ## Install
//!
//! To make use of `statful` in your project, add it as a dependency in your
//! `Cargo.toml` file.
//!
//! ```toml
//! [dependencies]
//! statful = "x.y.z"
//! ```
//!
//! ## Usage
//!
//! ### Simple Use
//!
//! Create a client that sends to a collector over UDP, record a few metrics
//! and deliver them.
//!
//! ```rust,no_run
//! use statful::prelude::*;
//! use statful::{ClientConfig, StatfulClient, DEFAULT_PORT};
//!
//! let config = ClientConfig::new("my.app")
//!     .with_target("metrics.example.com", DEFAULT_PORT)
//!     .with_environment("production")
//!     .with_app("checkout");
//! let client = StatfulClient::new(config);
//!
//! client.inc("orders", 1);
//! client.time("payment", 230u64);
//! client.gauge("queue.size", 12);
//! client.send();
//! ```
//!
//! Metrics without any tag, either from the configuration or from the call,
//! are dropped. Setting an `app` or an environment is usually enough.
//!
//! ### Custom Options
//!
//! Every metric kind has a `*_with_options` variant returning a
//! `MetricBuilder` to override tags, namespace, aggregations, aggregation
//! frequency or sample rate for a single metric.
//!
//! ```rust,no_run
//! use statful::prelude::*;
//! use statful::{Aggregation, AggregationFrequency, ClientConfig, StatfulClient};
//!
//! let client = StatfulClient::new(ClientConfig::new("my.app").with_app("checkout"));
//!
//! client
//!     .time_with_options("db.query", 18u64)
//!     .with_tag("table", "orders")
//!     .with_aggregations(&[Aggregation::P99, Aggregation::Max])
//!     .with_agg_freq(AggregationFrequency::OneMinute)
//!     .send();
//! ```
//!
//! ### Error Handling
//!
//! Recording and delivering metrics never fails from the point of view of
//! the application. Errors are logged with `tracing` and handed to an error
//! handler, if one was set.
//!
//! ```rust,no_run
//! use statful::prelude::*;
//! use statful::{ClientConfig, MetricError, StatfulClient, UdpMetricSink, DEFAULT_PORT};
//!
//! fn my_error_handler(err: MetricError) {
//!     eprintln!("Error sending metrics: {}", err);
//! }
//!
//! let sink = UdpMetricSink::connect("metrics.example.com", DEFAULT_PORT);
//! let client = StatfulClient::builder(ClientConfig::new("my.app").with_app("checkout"), sink)
//!     .with_error_handler(my_error_handler)
//!     .build();
//!
//! client.inc("logins", 1);
//! client.flush();
//! ```
//!
//! ### Mock Mode
//!
//! With `ClientConfig::with_mock`, flushed metrics go to the mock sink of the
//! client, which prints them to stdout unless another one is set.
//!
//! ```
//! use statful::prelude::*;
//! use statful::{ClientConfig, NopMetricSink, StatfulClient};
//!
//! let client = StatfulClient::from_sink(ClientConfig::new("my.app").with_app("test").with_mock(true), NopMetricSink);
//! client.inc("orders", 1);
//! client.flush();
//! ```

#![forbid(unsafe_code)]

pub use self::builder::MetricBuilder;

pub use self::client::{Counted, Gauged, MetricClient, StatfulClient, StatfulClientBuilder, Timed};

pub use self::config::{ClientConfig, DEFAULT_HOST, DEFAULT_NAMESPACE, DEFAULT_PORT};

pub use self::formatter::{MetricValue, ToMetricValue};

pub use self::line::{MetricLine, ParsedLine};

pub use self::sampler::{should_emit, should_emit_with, SampleRate};

pub use self::sinks::{ConsoleMetricSink, MetricSink, NopMetricSink, SinkStats, SpyMetricSink, UdpMetricSink};

pub use self::tags::{resolve, GlobalTags, TagPrecedence, TagSet};

pub use self::types::{Aggregation, AggregationFrequency, ErrorKind, Metric, MetricError, MetricResult};

mod buffer;
mod builder;
mod client;
mod config;
mod formatter;
mod line;
pub mod prelude;
mod sampler;
mod sinks;
mod tags;
mod types;
