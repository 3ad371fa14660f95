// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::builder::{MetricBuilder, MetricFormatter, MetricValue, Sampler, ThreadRngSampler};
use crate::pipeline::Pipeline;
use crate::sealed::Sealed;
use crate::sinks::{AddressFamily, MetricSink, SinkStats, UdpMetricSink};
use crate::timer::Timer;
use crate::types::{ErrorKind, MetricError, MetricResult, TagValue, Tags};
use crate::DEFAULT_MAX_UDP_SIZE;
use log::debug;
use std::fmt;
use std::panic::RefUnwindSafe;
use std::time::Duration;

/// Conversion trait for valid values for timers
///
/// This trait must be implemented for any types that are used as timer
/// values (currently `u64` and `f64` milliseconds, and `Duration`). This
/// trait is internal to how values are formatted as part of metrics but is
/// exposed publicly for documentation purposes.
///
/// Typical use of Metronome shouldn't require interacting with this trait.
pub trait ToTimerValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToTimerValue for u64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Millis(self as f64))
    }
}

impl ToTimerValue for f64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        if self.is_finite() {
            Ok(MetricValue::Millis(self))
        } else {
            Err(MetricError::from((ErrorKind::InvalidInput, "Timing must be finite")))
        }
    }
}

impl ToTimerValue for Duration {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Millis(self.as_secs_f64() * 1000.0))
    }
}

/// Conversion trait for valid values for gauges
///
/// This trait must be implemented for any types that are used as gauge
/// values (currently `i32`, `i64`, `u64`, and `f64`). This trait is internal
/// to how values are formatted as part of metrics but is exposed publicly
/// for documentation purposes.
///
/// Typical use of Metronome shouldn't require interacting with this trait.
pub trait ToGaugeValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToGaugeValue for i32 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(i64::from(self)))
    }
}

impl ToGaugeValue for i64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(self))
    }
}

impl ToGaugeValue for u64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Unsigned(self))
    }
}

impl ToGaugeValue for f64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        if self.is_finite() {
            Ok(MetricValue::Float(self))
        } else {
            Err(MetricError::from((ErrorKind::InvalidInput, "Gauge value must be finite")))
        }
    }
}

/// Conversion trait for valid values for sets
///
/// This trait must be implemented for any types that are used as set
/// values (currently integers and strings). This trait is internal to how
/// values are formatted as part of metrics but is exposed publicly for
/// documentation purposes.
///
/// Typical use of Metronome shouldn't require interacting with this trait.
pub trait ToSetValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToSetValue for i32 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(i64::from(self)))
    }
}

impl ToSetValue for i64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(self))
    }
}

impl ToSetValue for u64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Unsigned(self))
    }
}

impl ToSetValue for &str {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Text(self.to_string()))
    }
}

impl ToSetValue for String {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Text(self))
    }
}

/// Something that metrics can be reported to: either a `StatsClient` which
/// sends every metric right away, or a `Pipeline` which buffers them until
/// it is flushed.
///
/// All of the reporting traits (`Counted`, `Gauged`, `Timed`, `Setted`, and
/// `Batched`) are implemented for every `MetricBackend`, so the same calls
/// work against a client or a pipeline.
///
/// This trait is sealed and can't be implemented outside of this crate.
pub trait MetricBackend: Sealed {
    /// The client that owns the sink, prefix, and global tags used by this
    /// backend.
    fn client(&self) -> &StatsClient;

    /// Hand a fully formatted line (prefix and tags included) to this backend.
    ///
    /// Clients send the line immediately as its own datagram. Pipelines
    /// append it to their buffer.
    fn deliver(&self, line: String);

    /// Start a new pipeline on top of this backend.
    fn pipeline(&self) -> Pipeline<'_>;
}

/// Trait for incrementing and decrementing counters.
///
/// Counters are simple values incremented or decremented by a client. The
/// rates at which these events occur or average values will be determined
/// by the server receiving them. Examples of counter uses include number
/// of logins to a system or requests received.
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
///
/// Note that tags are an extension to Statsd and may not be supported by
/// your server.
pub trait Counted: MetricBackend + Sized {
    /// Increment the counter by 1
    fn incr(&self, key: &str) {
        self.incr_with_tags(key).send()
    }

    /// Increment the counter by 1 and return a `MetricBuilder` that can
    /// be used to add tags or a sample rate to the metric.
    fn incr_with_tags<'a>(&'a self, key: &'a str) -> MetricBuilder<'a, 'a, Self> {
        self.incr_by_with_tags(key, 1)
    }

    /// Increment the counter by the given amount
    fn incr_by(&self, key: &str, count: i64) {
        self.incr_by_with_tags(key, count).send()
    }

    /// Increment the counter by the given amount and return a `MetricBuilder`
    /// that can be used to add tags or a sample rate to the metric.
    fn incr_by_with_tags<'a>(&'a self, key: &'a str, count: i64) -> MetricBuilder<'a, 'a, Self> {
        MetricBuilder::from_fmt(MetricFormatter::counter(key, MetricValue::Signed(count)), self)
    }

    /// Decrement the counter by 1
    fn decr(&self, key: &str) {
        self.decr_with_tags(key).send()
    }

    /// Decrement the counter by 1 and return a `MetricBuilder` that can
    /// be used to add tags or a sample rate to the metric.
    fn decr_with_tags<'a>(&'a self, key: &'a str) -> MetricBuilder<'a, 'a, Self> {
        self.decr_by_with_tags(key, 1)
    }

    /// Decrement the counter by the given amount
    fn decr_by(&self, key: &str, count: i64) {
        self.decr_by_with_tags(key, count).send()
    }

    /// Decrement the counter by the given amount and return a `MetricBuilder`
    /// that can be used to add tags or a sample rate to the metric.
    ///
    /// The amount is negated, saturating at the bounds of `i64`.
    fn decr_by_with_tags<'a>(&'a self, key: &'a str, count: i64) -> MetricBuilder<'a, 'a, Self> {
        self.incr_by_with_tags(key, count.saturating_neg())
    }
}

/// Trait for recording timings in milliseconds.
///
/// Timings are a positive number of milliseconds between a start and end
/// time. Examples include time taken to render a web page or time taken
/// for a database call to return. `Duration` values are converted to
/// milliseconds before being recorded. Timings are always written with six
/// decimal places.
///
/// The following types are valid for timers:
/// * `u64`
/// * `f64`
/// * `Duration`
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait Timed<T>: MetricBackend + Sized
where
    T: ToTimerValue,
{
    /// Record a timing in milliseconds with the given key
    fn timing(&self, key: &str, time: T) {
        self.timing_with_tags(key, time).send()
    }

    /// Record a timing in milliseconds with the given key and return a
    /// `MetricBuilder` that can be used to add tags or a sample rate to the
    /// metric.
    fn timing_with_tags<'a>(&'a self, key: &'a str, time: T) -> MetricBuilder<'a, 'a, Self> {
        match time.try_to_value() {
            Ok(v) => MetricBuilder::from_fmt(MetricFormatter::timer(key, v), self),
            Err(e) => MetricBuilder::from_error(e, self),
        }
    }
}

/// Trait for recording gauge values.
///
/// Gauge values are an instantaneous measurement of a value determined
/// by the client. They do not change unless changed by the client. Examples
/// include things like load average or how many connections are active.
///
/// Absolute gauges can't be negative on the wire, since a leading `-` is
/// read as a delta. A negative absolute value is sent as a reset to `0`
/// followed by the value, both in the same datagram.
///
/// The following types are valid for gauges:
/// * `i32`
/// * `i64`
/// * `u64`
/// * `f64`
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait Gauged<T>: MetricBackend + Sized
where
    T: ToGaugeValue,
{
    /// Record a gauge value with the given key
    fn gauge(&self, key: &str, value: T) {
        self.gauge_with_tags(key, value).send()
    }

    /// Record a gauge value with the given key and return a `MetricBuilder`
    /// that can be used to add tags or a sample rate to the metric.
    fn gauge_with_tags<'a>(&'a self, key: &'a str, value: T) -> MetricBuilder<'a, 'a, Self> {
        match value.try_to_value() {
            Ok(v) => MetricBuilder::from_fmt(MetricFormatter::gauge(key, v), self),
            Err(e) => MetricBuilder::from_error(e, self),
        }
    }

    /// Change a gauge by the given (possibly negative) amount
    fn gauge_delta(&self, key: &str, delta: T) {
        self.gauge_delta_with_tags(key, delta).send()
    }

    /// Change a gauge by the given amount and return a `MetricBuilder` that
    /// can be used to add tags or a sample rate to the metric.
    fn gauge_delta_with_tags<'a>(&'a self, key: &'a str, delta: T) -> MetricBuilder<'a, 'a, Self> {
        match delta.try_to_value() {
            Ok(v) => MetricBuilder::from_fmt(MetricFormatter::gauge_delta(key, v), self),
            Err(e) => MetricBuilder::from_error(e, self),
        }
    }
}

/// Trait for recording set values.
///
/// Sets count the number of unique elements in a group. You can use them to,
/// for example, count the unique visitors to your site.
///
/// The following types are valid for sets:
/// * `i32`
/// * `i64`
/// * `u64`
/// * `&str`
/// * `String`
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait Setted<T>: MetricBackend + Sized
where
    T: ToSetValue,
{
    /// Record a single set value with the given key
    fn set(&self, key: &str, value: T) {
        self.set_with_tags(key, value).send()
    }

    /// Record a single set value with the given key and return a
    /// `MetricBuilder` that can be used to add tags or a sample rate to the
    /// metric.
    fn set_with_tags<'a>(&'a self, key: &'a str, value: T) -> MetricBuilder<'a, 'a, Self> {
        match value.try_to_value() {
            Ok(v) => MetricBuilder::from_fmt(MetricFormatter::set(key, v), self),
            Err(e) => MetricBuilder::from_error(e, self),
        }
    }
}

/// Trait for scoped helpers: pipelines and timers.
///
/// # Example
///
/// ```
/// use metronome::prelude::*;
/// use metronome::{StatsClient, SpyMetricSink};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let client = StatsClient::from_sink("app", sink);
///
/// client.with_pipeline(|pipe| {
///     pipe.incr("requests");
///     pipe.timing("response", 12);
/// });
///
/// assert_eq!(
///     "app.requests:1|c\napp.response:12.000000|ms".as_bytes(),
///     rx.recv().unwrap().as_slice()
/// );
/// ```
pub trait Batched: MetricBackend + Sized {
    /// Run the closure with a new pipeline and flush the pipeline once the
    /// closure returns (or unwinds).
    fn with_pipeline<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Pipeline<'_>) -> R,
    {
        let pipeline = self.pipeline();
        f(&pipeline)
    }

    /// Create an unstarted `Timer` that reports to this backend under the
    /// given key.
    fn timer(&self, key: &str) -> Timer<'_, Self> {
        Timer::new(self, key)
    }
}

/// Trait that encompasses all other traits for sending metrics.
///
/// If you wish to use `StatsClient` or `Pipeline` with a generically
/// typed parameter, this trait is the bound to use. It is implemented for
/// every `MetricBackend`.
///
/// # Example
///
/// ```
/// use metronome::prelude::*;
/// use metronome::{StatsClient, NopMetricSink};
///
/// fn record_login<M: MetricClient>(metrics: &M) {
///     metrics.incr("logins");
///     metrics.gauge("sessions", 12);
///     metrics.set("users", "alice");
/// }
///
/// let client = StatsClient::from_sink("some.prefix", NopMetricSink);
/// record_login(&client);
/// client.with_pipeline(|pipe| record_login(pipe));
/// ```
pub trait MetricClient:
    Counted
    + Timed<u64>
    + Timed<f64>
    + Timed<Duration>
    + Gauged<i32>
    + Gauged<i64>
    + Gauged<u64>
    + Gauged<f64>
    + for<'s> Setted<&'s str>
    + Setted<String>
    + Setted<i32>
    + Setted<i64>
    + Setted<u64>
    + Batched
{
}

impl<B> Counted for B where B: MetricBackend {}

impl<B, T> Timed<T> for B
where
    B: MetricBackend,
    T: ToTimerValue,
{
}

impl<B, T> Gauged<T> for B
where
    B: MetricBackend,
    T: ToGaugeValue,
{
}

impl<B, T> Setted<T> for B
where
    B: MetricBackend,
    T: ToSetValue,
{
}

impl<B> Batched for B where B: MetricBackend {}

impl<B> MetricClient for B where B: MetricBackend {}

/// Builder for creating and customizing `StatsClient` instances.
///
/// Instances of the builder should be created by calling the `::builder()`
/// method on the `StatsClient` struct.
///
/// # Example
///
/// ```
/// use metronome::prelude::*;
/// use metronome::{MetricError, StatsClient, NopMetricSink};
///
/// fn my_error_handler(err: MetricError) {
///     println!("Metric error! {}", err);
/// }
///
/// let client = StatsClient::builder("prefix", NopMetricSink)
///     .with_error_handler(my_error_handler)
///     .with_tag("environment", "production")
///     .with_max_udp_size(1432)
///     .build();
///
/// client.incr_by("something", 123);
/// client.incr_by_with_tags("some.counter", 42)
///     .with_tag("region", "us-east-2")
///     .send();
/// ```
pub struct StatsClientBuilder {
    prefix: String,
    sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    errors: Box<dyn Fn(MetricError) + Sync + Send + RefUnwindSafe>,
    sampler: Box<dyn Sampler + Sync + Send + RefUnwindSafe>,
    tags: Tags,
    max_udp_size: usize,
}

impl StatsClientBuilder {
    // Set the required fields and defaults for optional fields
    fn new<T>(prefix: &str, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        StatsClientBuilder {
            // required
            prefix: Self::formatted_prefix(prefix),
            sink: Box::new(sink),

            // optional with defaults
            errors: Box::new(log_error_handler),
            sampler: Box::new(ThreadRngSampler),
            tags: Tags::new(),
            max_udp_size: DEFAULT_MAX_UDP_SIZE,
        }
    }

    /// Set an error handler to use for metrics sent via `MetricBuilder::send()`
    ///
    /// The error handler is only invoked when metrics are not able to be sent
    /// correctly. Either due to invalid input, I/O errors encountered when trying
    /// to send them via a `MetricSink`, or some other reason.
    ///
    /// The error handler should consume the error without panicking. The error
    /// may be logged, printed to stderr, discarded, etc. - this is up to the
    /// implementation. The default handler logs the error at debug level.
    pub fn with_error_handler<F>(mut self, errors: F) -> Self
    where
        F: Fn(MetricError) + Sync + Send + RefUnwindSafe + 'static,
    {
        self.errors = Box::new(errors);
        self
    }

    /// Add a global tag with key and value to every metric published by the
    /// built [StatsClient].
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TagValue>,
    {
        self.tags.insert(key, value);
        self
    }

    /// Add several global tags, in order.
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TagValue>,
    {
        for (k, v) in tags {
            self.tags.insert(k, v);
        }
        self
    }

    /// Use the given source of randomness for sampling decisions instead of
    /// the thread local RNG.
    pub fn with_sampler<S>(mut self, sampler: S) -> Self
    where
        S: Sampler + Sync + Send + RefUnwindSafe + 'static,
    {
        self.sampler = Box::new(sampler);
        self
    }

    /// Set the size (in bytes) that datagrams built by pipelines must stay
    /// below. Defaults to 512.
    pub fn with_max_udp_size(mut self, size: usize) -> Self {
        self.max_udp_size = size;
        self
    }

    /// Construct a new `StatsClient` instance based on current settings.
    pub fn build(self) -> StatsClient {
        StatsClient::from_builder(self)
    }

    fn formatted_prefix(prefix: &str) -> String {
        if prefix.is_empty() {
            String::new()
        } else {
            format!("{}.", prefix.trim_end_matches('.'))
        }
    }
}

/// Client for Statsd that implements various traits to record metrics.
///
/// # Traits
///
/// The client is the main entry point for users of this library. It supports
/// several traits for recording metrics of different types.
///
/// * `Counted` for emitting counters.
/// * `Timed` for emitting timings.
/// * `Gauged` for emitting gauge values.
/// * `Setted` for emitting set values.
/// * `Batched` for pipelines and timers.
/// * `MetricClient` for a combination of all of the above.
///
/// For more information about the uses for each type of metric, see the
/// documentation for each mentioned trait.
///
/// # Sending
///
/// Every metric recorded directly on the client (and surviving sampling) is
/// sent right away as a single datagram. Metrics recorded on a `Pipeline`
/// are buffered and packed into as few datagrams as possible when the
/// pipeline is flushed.
///
/// Reporting a metric never returns an error. Problems are handed to the
/// error handler, which logs them at debug level unless a different handler
/// is configured.
///
/// # Threading
///
/// The `StatsClient` is `Send` and `Sync` and can be shared between threads
/// by wrapping it in an `Arc`. Pipelines are not `Sync` and are meant to be
/// used from the thread that created them.
///
/// ``` no_run
/// use std::sync::Arc;
/// use std::thread;
/// use metronome::prelude::*;
/// use metronome::{StatsClient, DEFAULT_HOST, DEFAULT_PORT};
///
/// let client = Arc::new(StatsClient::from_udp_host("some.prefix", DEFAULT_HOST, DEFAULT_PORT).unwrap());
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let metrics = client.clone();
///         thread::spawn(move || metrics.incr("request.handler"))
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
/// ```
pub struct StatsClient {
    prefix: String,
    sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    errors: Box<dyn Fn(MetricError) + Sync + Send + RefUnwindSafe>,
    sampler: Box<dyn Sampler + Sync + Send + RefUnwindSafe>,
    tags: Tags,
    max_udp_size: usize,
}

impl StatsClient {
    /// Create a new client instance that will use the given prefix for
    /// all metrics emitted to the given `MetricSink` implementation.
    ///
    /// # No-op Example
    ///
    /// ```
    /// use metronome::{StatsClient, NopMetricSink};
    ///
    /// let prefix = "my.stats";
    /// let client = StatsClient::from_sink(prefix, NopMetricSink);
    /// ```
    ///
    /// # UDP Socket Example
    ///
    /// ```
    /// use std::net::UdpSocket;
    /// use metronome::{StatsClient, UdpMetricSink, DEFAULT_PORT};
    ///
    /// let prefix = "my.stats";
    /// let host = ("127.0.0.1", DEFAULT_PORT);
    ///
    /// let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
    /// socket.set_nonblocking(true).unwrap();
    ///
    /// let sink = UdpMetricSink::from(host, socket).unwrap();
    /// let client = StatsClient::from_sink(prefix, sink);
    /// ```
    pub fn from_sink<T>(prefix: &str, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        Self::builder(prefix, sink).build()
    }

    /// Create a new builder with the provided prefix and metric sink.
    ///
    /// A prefix and a metric sink are required to create a new client
    /// instance. All other optional customizations can be set by calling
    /// methods on the returned builder. Any customizations that aren't
    /// set by the caller will use defaults.
    ///
    /// Note, though a metric prefix is required, you may pass an empty
    /// string as a prefix. In this case, the metrics emitted will use only
    /// the bare keys supplied when you call the various methods to emit
    /// metrics.
    ///
    /// General defaults:
    ///
    /// * Errors are logged at debug level and discarded.
    /// * Sampling uses the thread local RNG.
    /// * Pipelines keep datagrams below 512 bytes.
    /// * No global tags.
    ///
    /// # Example
    ///
    /// ```
    /// use metronome::prelude::*;
    /// use metronome::{StatsClient, MetricError, NopMetricSink};
    ///
    /// fn my_handler(err: MetricError) {
    ///     println!("Metric error: {}", err);
    /// }
    ///
    /// let client = StatsClient::builder("some.prefix", NopMetricSink)
    ///     .with_error_handler(my_handler)
    ///     .build();
    ///
    /// client.gauge_with_tags("some.key", 7)
    ///    .with_tag("region", "us-west-1")
    ///    .send();
    /// ```
    pub fn builder<T>(prefix: &str, sink: T) -> StatsClientBuilder
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        StatsClientBuilder::new(prefix, sink)
    }

    /// Create a client that sends to the given host and port over UDP (IPv4)
    /// using the default settings.
    ///
    /// # Failures
    ///
    /// This method fails if the host doesn't resolve to an IPv4 address or
    /// if a local socket can't be bound.
    pub fn from_udp_host(prefix: &str, host: &str, port: u16) -> MetricResult<Self> {
        let sink = UdpMetricSink::connect(host, port, AddressFamily::Ipv4)?;
        Ok(Self::from_sink(prefix, sink))
    }

    /// Prefix prepended to every metric name, including the trailing `.`
    /// (empty when no prefix is configured).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Maximum size in bytes of datagrams built by pipelines.
    pub fn max_udp_size(&self) -> usize {
        self.max_udp_size
    }

    /// Tags attached to every metric sent by this client.
    pub fn global_tags(&self) -> &Tags {
        &self.tags
    }

    /// Mutable access to the global tags.
    ///
    /// Since this requires exclusive access to the client, tags can't change
    /// while a pipeline or timer created from the client is alive.
    pub fn global_tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }

    /// Add or replace a single global tag.
    pub fn set_global_tag<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<TagValue>,
    {
        self.tags.insert(key, value);
    }

    /// Start a new pipeline that sends through this client when flushed.
    ///
    /// # Example
    ///
    /// ```
    /// use metronome::prelude::*;
    /// use metronome::{StatsClient, SpyMetricSink};
    ///
    /// let (rx, sink) = SpyMetricSink::new();
    /// let client = StatsClient::from_sink("", sink);
    ///
    /// {
    ///     let pipe = client.pipeline();
    ///     pipe.incr("a");
    ///     pipe.gauge("b", 3);
    /// }
    ///
    /// assert_eq!("a:1|c\nb:3|g".as_bytes(), rx.recv().unwrap().as_slice());
    /// ```
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self)
    }

    /// I/O telemetry of the underlying sink.
    pub fn stats(&self) -> SinkStats {
        self.sink.stats()
    }

    /// Flush the underlying metric sink.
    pub fn flush(&self) -> MetricResult<()> {
        Ok(self.sink.flush()?)
    }

    /// Release the transport held by the sink (e.g. close the UDP socket).
    ///
    /// Closing more than once is harmless. Metrics sent after the client is
    /// closed are dropped and reported to the error handler.
    pub fn close(&self) {
        self.sink.close();
    }

    /// Send one datagram through the sink, passing any failure to the error
    /// handler.
    pub(crate) fn transmit(&self, datagram: &str) {
        if let Err(err) = self.sink.emit(datagram) {
            self.consume_error(err.into());
        }
    }

    pub(crate) fn sampler(&self) -> &(dyn Sampler + Sync + Send + RefUnwindSafe) {
        self.sampler.as_ref()
    }

    /// Consume a possible error from attempting to send a metric.
    ///
    /// This invokes the error handler configured for this client.
    pub fn consume_error(&self, err: MetricError) {
        (self.errors)(err);
    }

    // Create a new StatsClient by consuming the builder
    fn from_builder(builder: StatsClientBuilder) -> Self {
        StatsClient {
            prefix: builder.prefix,
            sink: builder.sink,
            errors: builder.errors,
            sampler: builder.sampler,
            tags: builder.tags,
            max_udp_size: builder.max_udp_size,
        }
    }
}

impl Sealed for StatsClient {}

impl MetricBackend for StatsClient {
    fn client(&self) -> &StatsClient {
        self
    }

    fn deliver(&self, line: String) {
        self.transmit(&line);
    }

    fn pipeline(&self) -> Pipeline<'_> {
        StatsClient::pipeline(self)
    }
}

impl fmt::Debug for StatsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StatsClient {{ prefix: {:?}, sink: ..., errors: ..., sampler: ..., tags: {:?}, max_udp_size: {} }}",
            self.prefix, self.tags, self.max_udp_size,
        )
    }
}

#[allow(clippy::needless_pass_by_value)]
fn log_error_handler(err: MetricError) {
    debug!("Got error sending metric: {}", err);
}
