// Statful - A buffered UDP metrics client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Export commonly used parts of Statful for easy glob imports
//!
//! # Example
//!
//! ```
//! use statful::prelude::*;
//! use statful::{ClientConfig, NopMetricSink, StatfulClient};
//!
//! let client = StatfulClient::from_sink(ClientConfig::new("some.prefix").with_app("web"), NopMetricSink);
//!
//! client.inc("some.counter", 1);
//! client.time("some.timer", 23u64);
//! client.gauge("some.gauge", 45);
//! assert_eq!(3, client.buffered());
//! ```

pub use crate::client::{Counted, Gauged, MetricClient, Timed};
pub use crate::types::Metric;
