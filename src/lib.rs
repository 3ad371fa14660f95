// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A batching Statsd client for Rust!
//!
//! Metronome formats counters, gauges, timers, and sets into the Statsd wire
//! protocol and sends them over UDP. Metrics can be sent one per datagram or
//! collected in a `Pipeline` and packed into as few datagrams as possible.
//!
//! ## Features
//!
//! * Support for emitting counters, timers, gauges (absolute and delta), and
//!   sets to Statsd over UDP.
//! * Client side sampling and `key:value` tags.
//! * Pipelines that batch metrics into datagrams below a configurable size.
//! * Scoped timers.
//! * Support for alternate backends via the `MetricSink` trait.
//!
//! ## Install
//!
//! To make use of `metronome` in your project, add it as a dependency in your `Cargo.toml` file.
//!
//! ```toml
//! [dependencies]
//! metronome = "x.y.z"
//! ```
//!
//! ## Usage
//!
//! ### Simple Use
//!
//! Create a client that sends to a Statsd server over UDP and send a few
//! metrics. Every metric is sent right away, in its own datagram.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use metronome::prelude::*;
//! use metronome::{StatsClient, DEFAULT_PORT};
//!
//! // Note that you'll probably want to actually handle any errors creating
//! // the client when you use it for real in your application. We're just
//! // using .unwrap() here since this is an example!
//! let client = StatsClient::from_udp_host("my.metrics", "metrics.example.com", DEFAULT_PORT).unwrap();
//!
//! client.incr("some.counter");
//! client.timing("some.methodCall", 42);
//! client.timing("some.query", Duration::from_micros(1250));
//! client.gauge("some.thing", 7);
//! client.gauge_delta("some.pool", -2);
//! client.set("some.users", "alice");
//! ```
//!
//! ### Pipelines
//!
//! Metrics recorded on a pipeline are buffered until the pipeline is flushed,
//! either explicitly or when it goes out of scope. Buffered lines are joined
//! with newlines into datagrams that stay below the configured maximum size
//! (512 bytes unless set otherwise).
//!
//! ```rust,no_run
//! use metronome::prelude::*;
//! use metronome::{AddressFamily, StatsClient, UdpMetricSink, DEFAULT_HOST, DEFAULT_PORT};
//!
//! let sink = UdpMetricSink::connect(DEFAULT_HOST, DEFAULT_PORT, AddressFamily::Ipv4).unwrap();
//! let client = StatsClient::builder("my.prefix", sink)
//!     .with_max_udp_size(1432)
//!     .build();
//!
//! {
//!     let pipe = client.pipeline();
//!     pipe.incr("requests");
//!     pipe.timing("response", 214);
//!     pipe.gauge("queue.depth", 12);
//! } // <- sent here
//!
//! client.with_pipeline(|pipe| {
//!     pipe.incr_by("items", 3);
//! });
//! ```
//!
//! ### Tags and Sampling
//!
//! Every reporting method has a `_with_tags` variant that returns a
//! `MetricBuilder`. Tags set on the builder override global tags configured
//! on the client with the same key.
//!
//! ```rust
//! use metronome::prelude::*;
//! use metronome::{StatsClient, SpyMetricSink};
//!
//! let (rx, sink) = SpyMetricSink::new();
//! let client = StatsClient::builder("app", sink)
//!     .with_tag("env", "prod")
//!     .build();
//!
//! client.incr_with_tags("logins")
//!     .with_tag("method", "oauth")
//!     .with_sample_rate(1.0)
//!     .send();
//!
//! assert_eq!(
//!     "app.logins:1|c|env:prod,method:oauth".as_bytes(),
//!     rx.recv().unwrap().as_slice()
//! );
//! ```
//!
//! ### Errors
//!
//! Sending a metric never fails from the point of view of the caller. Invalid
//! input and transport errors are passed to the error handler of the client,
//! which logs them at debug level using the `log` crate unless a custom
//! handler is set with `StatsClientBuilder::with_error_handler`.

#![forbid(unsafe_code)]

/// Default port of a Statsd server.
pub const DEFAULT_PORT: u16 = 8125;

/// Default host of a Statsd server.
pub const DEFAULT_HOST: &str = "localhost";

/// Default size, in bytes, that datagrams built by a pipeline stay below.
pub const DEFAULT_MAX_UDP_SIZE: usize = 512;

pub use self::builder::{MetricBuilder, MetricType, Sampler, ThreadRngSampler};

pub use self::client::{Batched, Counted, Gauged, MetricClient, Setted, StatsClient, StatsClientBuilder, Timed};

pub use self::pipeline::Pipeline;

pub use self::sinks::{AddressFamily, MetricSink, NopMetricSink, SinkStats, SpyMetricSink, UdpMetricSink};

pub use self::timer::Timer;

pub use self::types::{ErrorKind, MetricError, MetricResult, TagValue, Tags};

mod builder;
mod client;
pub mod ext;
pub mod parse;
mod pipeline;
pub mod prelude;
mod sinks;
mod timer;
mod types;

mod sealed {
    pub trait Sealed {}
}
