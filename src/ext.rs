// Metronome - A batching Statsd client for Rust!
//
// Copyright 2018-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Advanced extension points for the Metronome library
//!
//! Most users of Metronome shouldn't need to make use of this module or
//! the included traits and types.
//!
//! The `MetricBackend` trait is what the reporting traits are implemented
//! over. It's useful as a bound for code that should accept either a client
//! or a pipeline, and for forwarding preformatted lines via `.deliver()`.
//!
//! The various `To*Value` traits are used as markers for types that are
//! valid for each type of metric. They also contain conversion logic for
//! the types in some cases (such as in the case of `Duration` objects).
//!
//! # Example
//!
//! ```
//! use metronome::ext::MetricBackend;
//! use metronome::{StatsClient, SpyMetricSink};
//!
//! let (rx, sink) = SpyMetricSink::new();
//! let client = StatsClient::from_sink("", sink);
//!
//! fn forward<B: MetricBackend>(backend: &B, line: &str) {
//!     backend.deliver(line.to_string());
//! }
//!
//! forward(&client, "already.formatted:1|c");
//! assert_eq!("already.formatted:1|c".as_bytes(), rx.recv().unwrap().as_slice());
//! ```

pub use crate::builder::MetricValue;
pub use crate::client::{MetricBackend, ToGaugeValue, ToSetValue, ToTimerValue};
