// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Export commonly used parts of Metronome for easy glob imports
//!
//! # Example
//!
//! ```
//! use metronome::prelude::*;
//! use metronome::{StatsClient, NopMetricSink};
//!
//! let client = StatsClient::from_sink("some.prefix", NopMetricSink);
//!
//! client.incr("some.counter");
//! client.timing("some.timer", 23);
//! client.gauge("some.gauge", 45);
//! client.set("some.set", 123);
//! client.with_pipeline(|pipe| pipe.decr("some.counter"));
//! ```

pub use crate::client::{Batched, Counted, Gauged, MetricClient, Setted, Timed};
