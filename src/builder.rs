// Metronome - A batching Statsd client for Rust!
//
// Copyright 2018 Philip Jenvey <pjenvey@mozilla.com>
// Copyright 2018-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::client::MetricBackend;
use crate::types::{ErrorKind, MetricError, TagValue, Tags};
use std::fmt::{self, Write};

mod sample_rate;
mod sampler;

pub(crate) use self::sample_rate::SampleRate;
pub(crate) use self::sampler::keep;
pub use self::sampler::{Sampler, ThreadRngSampler};

/// Type of metric that knows how to display itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    Counter,
    Timer,
    Gauge,
    Set,
}

impl MetricType {
    /// Type code used on the wire.
    pub fn as_str(&self) -> &'static str {
        match *self {
            MetricType::Counter => "c",
            MetricType::Timer => "ms",
            MetricType::Gauge => "g",
            MetricType::Set => "s",
        }
    }

    pub(crate) fn from_code(code: &str) -> Option<MetricType> {
        match code {
            "c" => Some(MetricType::Counter),
            "ms" => Some(MetricType::Timer),
            "g" => Some(MetricType::Gauge),
            "s" => Some(MetricType::Set),
            _ => None,
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Holder for primitive metric values that knows how to display itself
///
/// This enum is internal to how various types that are valid for each type
/// of metric (e.g. types for which `ToGaugeValue`, `ToTimerValue`, etc) are
/// implemented but is exposed for documentation purposes and advanced use cases.
///
/// Typical use of Metronome shouldn't require interacting with this type.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    /// Milliseconds, always written with six decimal places
    Millis(f64),
    Text(String),
}

impl MetricValue {
    pub(crate) fn is_negative(&self) -> bool {
        match *self {
            MetricValue::Signed(v) => v < 0,
            MetricValue::Float(v) | MetricValue::Millis(v) => v < 0.0,
            MetricValue::Unsigned(_) | MetricValue::Text(_) => false,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Signed(v) => v.fmt(f),
            MetricValue::Unsigned(v) => v.fmt(f),
            MetricValue::Float(v) => v.fmt(f),
            MetricValue::Millis(v) => write!(f, "{:.6}", v),
            MetricValue::Text(v) => v.fmt(f),
        }
    }
}

/// Characters that would corrupt the framing of a line or a datagram.
fn is_wire_safe(s: &str, extra: &[char]) -> bool {
    !s.chars().any(|c| c == '\n' || c == '\r' || c == '|' || extra.contains(&c))
}

/// A single metric sample: everything needed to render one line except the
/// client wide prefix and global tags.
#[derive(Debug, Clone)]
pub(crate) struct MetricFormatter<'a> {
    key: &'a str,
    val: MetricValue,
    type_: MetricType,
    delta: bool,
    rate: SampleRate,
    tags: Vec<(&'a str, TagValue)>,
}

impl<'a> MetricFormatter<'a> {
    const TAG_PREFIX: &'static str = "|";

    pub(crate) fn counter(key: &'a str, val: MetricValue) -> Self {
        Self::from_val(key, val, MetricType::Counter)
    }

    pub(crate) fn timer(key: &'a str, val: MetricValue) -> Self {
        Self::from_val(key, val, MetricType::Timer)
    }

    pub(crate) fn gauge(key: &'a str, val: MetricValue) -> Self {
        Self::from_val(key, val, MetricType::Gauge)
    }

    pub(crate) fn gauge_delta(key: &'a str, val: MetricValue) -> Self {
        let mut fmt = Self::from_val(key, val, MetricType::Gauge);
        fmt.delta = true;
        fmt
    }

    pub(crate) fn set(key: &'a str, val: MetricValue) -> Self {
        Self::from_val(key, val, MetricType::Set)
    }

    fn from_val(key: &'a str, val: MetricValue, type_: MetricType) -> Self {
        MetricFormatter {
            key,
            val,
            type_,
            delta: false,
            rate: SampleRate::FULL,
            tags: Vec::new(),
        }
    }

    fn with_tag(&mut self, key: &'a str, value: TagValue) {
        self.tags.push((key, value));
    }

    fn with_sample_rate(&mut self, rate: SampleRate) {
        self.rate = rate;
    }

    fn validate(&self) -> Result<(), MetricError> {
        if self.key.is_empty() || !is_wire_safe(self.key, &[':']) {
            return Err(MetricError::from((
                ErrorKind::InvalidInput,
                "Metric name must be non-empty and not contain ':', '|', or line breaks",
            )));
        }

        if let MetricValue::Text(ref v) = self.val {
            if v.is_empty() || !is_wire_safe(v, &[]) {
                return Err(MetricError::from((
                    ErrorKind::InvalidInput,
                    "Set value must be non-empty and not contain '|' or line breaks",
                )));
            }
        }

        let bad_tag = self.tags.iter().any(|(k, v)| match v {
            TagValue::Str(s) => !is_wire_safe(k, &[',', ':']) || !is_wire_safe(s, &[',']),
            _ => !is_wire_safe(k, &[',', ':']),
        });
        if bad_tag {
            return Err(MetricError::from((
                ErrorKind::InvalidInput,
                "Tags must not contain ',', '|', or line breaks",
            )));
        }

        Ok(())
    }

    /// Absolute negative gauges can't be written directly: most servers read
    /// a leading '-' as a delta. They're sent as a reset to zero followed by
    /// the value instead.
    fn needs_reset(&self) -> bool {
        self.type_ == MetricType::Gauge && !self.delta && self.val.is_negative()
    }

    /// The reset half of a negative gauge pair, already sampled.
    fn reset_line(&self) -> Self {
        MetricFormatter {
            val: MetricValue::Signed(0),
            rate: SampleRate::FULL,
            ..self.clone()
        }
    }

    /// This sample with sampling already applied.
    fn at_full_rate(&self) -> Self {
        MetricFormatter {
            rate: SampleRate::FULL,
            ..self.clone()
        }
    }

    fn write_base_metric(&self, prefix: &str, out: &mut String) {
        out.push_str(prefix);
        out.push_str(self.key);
        out.push(':');
        if self.delta && !self.val.is_negative() {
            out.push('+');
        }
        let _ = write!(out, "{}|{}", self.val, self.type_);
        if self.rate.is_sampled() {
            let _ = write!(out, "|{}", self.rate);
        }
    }

    fn write_tags<'t, I>(out: &mut String, tags: I)
    where
        I: IntoIterator<Item = (&'t str, &'t TagValue)>,
    {
        for (i, (key, value)) in tags.into_iter().enumerate() {
            out.push_str(if i == 0 { Self::TAG_PREFIX } else { "," });
            out.push_str(key);
            out.push(':');
            let _ = write!(out, "{}", value);
        }
    }

    /// Render this sample as a single line. Local tags override global tags
    /// with the same key, keeping the position of the global tag.
    pub(crate) fn format(&self, prefix: &str, global: &Tags) -> String {
        let mut out = String::with_capacity(prefix.len() + self.key.len() + 24);
        self.write_base_metric(prefix, &mut out);

        if self.tags.is_empty() {
            Self::write_tags(&mut out, global.iter());
        } else {
            let mut merged = global.clone();
            for (k, v) in self.tags.iter() {
                merged.insert(*k, v.clone());
            }
            Self::write_tags(&mut out, merged.iter());
        }

        out
    }
}

/// Internal state of a `MetricBuilder`
///
/// The builder can either be in the process of formatting a metric to send
/// via a client or pipeline or it can be simply holding on to an error that
/// will be handed to the client's error handler when `.send()` is invoked.
#[derive(Debug)]
enum BuilderRepr<'m> {
    Success(MetricFormatter<'m>),
    Error(MetricError),
}

/// Builder for adding tags and a sample rate to in-progress metrics.
///
/// This builder adds `key:value` tags and an optional sample rate to a metric
/// that was previously constructed by a call to a method on `StatsClient` or
/// `Pipeline`. The metric is formatted and handed to the client (sent right
/// away) or pipeline (buffered) when `MetricBuilder::send()` is invoked.
///
/// Sending never returns an error. Invalid input (bad sample rates, names
/// containing separators, non-finite values) and transport errors are passed
/// to the error handler of the client, which logs them at debug level by
/// default.
///
/// # Example
///
/// ```
/// use metronome::prelude::*;
/// use metronome::{StatsClient, SpyMetricSink};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let client = StatsClient::from_sink("some.prefix", sink);
///
/// client.incr_with_tags("some.key")
///     .with_tag("host", "app11.example.com")
///     .with_tag("segment", 23)
///     .send();
///
/// assert_eq!(
///     "some.prefix.some.key:1|c|host:app11.example.com,segment:23".as_bytes(),
///     rx.recv().unwrap().as_slice()
/// );
/// ```
#[must_use = "Did you forget to call .send() after adding tags?"]
#[derive(Debug)]
pub struct MetricBuilder<'m, 'c, B>
where
    B: MetricBackend,
{
    repr: BuilderRepr<'m>,
    backend: &'c B,
}

impl<'m, 'c, B> MetricBuilder<'m, 'c, B>
where
    B: MetricBackend,
{
    pub(crate) fn from_fmt(formatter: MetricFormatter<'m>, backend: &'c B) -> Self {
        MetricBuilder {
            repr: BuilderRepr::Success(formatter),
            backend,
        }
    }

    pub(crate) fn from_error(err: MetricError, backend: &'c B) -> Self {
        MetricBuilder {
            repr: BuilderRepr::Error(err),
            backend,
        }
    }

    /// Add a key-value tag to this metric.
    ///
    /// If the client has a global tag with the same key, this value replaces
    /// it for this metric only.
    pub fn with_tag<V>(mut self, key: &'m str, value: V) -> Self
    where
        V: Into<TagValue>,
    {
        if let BuilderRepr::Success(ref mut formatter) = self.repr {
            formatter.with_tag(key, value.into());
        }
        self
    }

    /// Add several key-value tags to this metric, in order.
    pub fn with_tags<I, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (&'m str, V)>,
        V: Into<TagValue>,
    {
        if let BuilderRepr::Success(ref mut formatter) = self.repr {
            for (k, v) in tags {
                formatter.with_tag(k, v.into());
            }
        }
        self
    }

    /// Set the sample rate for this metric, a value greater than 0.0 and at
    /// most 1.0.
    ///
    /// Metrics with a rate below 1.0 are only sent some of the time and carry
    /// the rate (`|@0.5`) so that the server can scale them back up.
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        if let BuilderRepr::Success(ref mut formatter) = self.repr {
            match SampleRate::try_from(rate) {
                Ok(rate) => formatter.with_sample_rate(rate),
                Err(e) => self.repr = BuilderRepr::Error(e),
            }
        }
        self
    }

    /// Format the metric and hand it to the client or pipeline that created
    /// this builder.
    ///
    /// Note that the builder is consumed by this method and thus `.send()`
    /// can only be called a single time per builder.
    pub fn send(self) {
        let client = self.backend.client();
        let formatter = match self.repr {
            BuilderRepr::Error(err) => return client.consume_error(err),
            BuilderRepr::Success(formatter) => formatter,
        };

        if let Err(err) = formatter.validate() {
            return client.consume_error(err);
        }

        if !keep(client.sampler(), formatter.rate) {
            return;
        }

        if formatter.needs_reset() {
            // Both lines need to end up in the same flush unit
            let pipeline = self.backend.pipeline();
            pipeline.deliver(formatter.reset_line().format(client.prefix(), client.global_tags()));
            pipeline.deliver(formatter.at_full_rate().format(client.prefix(), client.global_tags()));
        } else {
            self.backend
                .deliver(formatter.format(client.prefix(), client.global_tags()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MetricFormatter, MetricType, MetricValue, SampleRate};
    use crate::types::{TagValue, Tags};

    fn no_tags() -> Tags {
        Tags::new()
    }

    #[test]
    fn test_metric_type_codes() {
        for t in [MetricType::Counter, MetricType::Timer, MetricType::Gauge, MetricType::Set] {
            assert_eq!(Some(t), MetricType::from_code(t.as_str()));
        }
        assert_eq!(None, MetricType::from_code("h"));
    }

    #[test]
    fn test_metric_formatter_counter_no_tags() {
        let fmt = MetricFormatter::counter("some.key", MetricValue::Signed(4));
        assert_eq!("prefix.some.key:4|c", &fmt.format("prefix.", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_empty_prefix() {
        let fmt = MetricFormatter::counter("some.key", MetricValue::Signed(-3));
        assert_eq!("some.key:-3|c", &fmt.format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_counter_with_tags() {
        let mut fmt = MetricFormatter::counter("some.key", MetricValue::Signed(4));
        fmt.with_tag("host", TagValue::from("app03.example.com"));
        fmt.with_tag("bucket", TagValue::from(2));
        fmt.with_tag("beta", TagValue::from(true));

        assert_eq!(
            "prefix.some.key:4|c|host:app03.example.com,bucket:2,beta:true",
            &fmt.format("prefix.", &no_tags())
        );
    }

    #[test]
    fn test_metric_formatter_timer_six_decimals() {
        let fmt = MetricFormatter::timer("some.method", MetricValue::Millis(21.5));
        assert_eq!("prefix.some.method:21.500000|ms", &fmt.format("prefix.", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_gauge() {
        let fmt = MetricFormatter::gauge("num.failures", MetricValue::Unsigned(7));
        assert_eq!("num.failures:7|g", &fmt.format("", &no_tags()));

        let fmt = MetricFormatter::gauge("load", MetricValue::Float(0.25));
        assert_eq!("load:0.25|g", &fmt.format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_gauge_delta() {
        let up = MetricFormatter::gauge_delta("conns", MetricValue::Signed(3));
        let zero = MetricFormatter::gauge_delta("conns", MetricValue::Signed(0));
        let down = MetricFormatter::gauge_delta("conns", MetricValue::Signed(-3));

        assert_eq!("conns:+3|g", &up.format("", &no_tags()));
        assert_eq!("conns:+0|g", &zero.format("", &no_tags()));
        assert_eq!("conns:-3|g", &down.format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_set() {
        let fmt = MetricFormatter::set("users.uniques", MetricValue::Text("alice".to_string()));
        assert_eq!("users.uniques:alice|s", &fmt.format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_with_sample_rate() {
        let mut fmt = MetricFormatter::counter("some.key", MetricValue::Signed(4));
        fmt.with_sample_rate(SampleRate::try_from(0.5).unwrap());
        fmt.with_tag("a", TagValue::from(1));

        assert_eq!("some.key:4|c|@0.5|a:1", &fmt.format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_doesnt_write_full_sample_rate() {
        let mut fmt = MetricFormatter::counter("some.key", MetricValue::Signed(4));
        fmt.with_sample_rate(SampleRate::try_from(1.0).unwrap());

        assert_eq!("some.key:4|c", &fmt.format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_local_tags_override_global() {
        let global: Tags = vec![("a", 1)].into_iter().collect();
        let mut fmt = MetricFormatter::counter("k", MetricValue::Signed(1));
        fmt.with_tag("a", TagValue::from(2));
        fmt.with_tag("b", TagValue::from(3));

        assert_eq!("k:1|c|a:2,b:3", &fmt.format("", &global));
    }

    #[test]
    fn test_metric_formatter_override_keeps_global_position() {
        let global: Tags = vec![("a", "1"), ("c", "5")].into_iter().collect();
        let mut fmt = MetricFormatter::counter("k", MetricValue::Signed(1));
        fmt.with_tag("b", TagValue::from(3));
        fmt.with_tag("a", TagValue::from(2));

        assert_eq!("k:1|c|a:2,c:5,b:3", &fmt.format("", &global));
    }

    #[test]
    fn test_metric_formatter_global_tags_only() {
        let global: Tags = vec![("env", "prod")].into_iter().collect();
        let fmt = MetricFormatter::counter("k", MetricValue::Signed(1));

        assert_eq!("k:1|c|env:prod", &fmt.format("", &global));
    }

    #[test]
    fn test_metric_formatter_needs_reset() {
        assert!(MetricFormatter::gauge("g", MetricValue::Signed(-5)).needs_reset());
        assert!(MetricFormatter::gauge("g", MetricValue::Float(-0.5)).needs_reset());
        assert!(!MetricFormatter::gauge("g", MetricValue::Signed(5)).needs_reset());
        assert!(!MetricFormatter::gauge_delta("g", MetricValue::Signed(-5)).needs_reset());
        assert!(!MetricFormatter::counter("c", MetricValue::Signed(-5)).needs_reset());
    }

    #[test]
    fn test_metric_formatter_reset_line_drops_rate() {
        let mut fmt = MetricFormatter::gauge("x", MetricValue::Signed(-5));
        fmt.with_sample_rate(SampleRate::try_from(0.5).unwrap());

        assert_eq!("x:0|g", &fmt.reset_line().format("", &no_tags()));
        assert_eq!("x:-5|g", &fmt.at_full_rate().format("", &no_tags()));
    }

    #[test]
    fn test_metric_formatter_validate() {
        assert!(MetricFormatter::counter("ok.name", MetricValue::Signed(1)).validate().is_ok());
        assert!(MetricFormatter::counter("", MetricValue::Signed(1)).validate().is_err());
        assert!(MetricFormatter::counter("bad:name", MetricValue::Signed(1)).validate().is_err());
        assert!(MetricFormatter::counter("bad\nname", MetricValue::Signed(1)).validate().is_err());
        assert!(MetricFormatter::set("s", MetricValue::Text("a|b".to_string())).validate().is_err());

        let mut fmt = MetricFormatter::counter("k", MetricValue::Signed(1));
        fmt.with_tag("t", TagValue::from("a,b"));
        assert!(fmt.validate().is_err());
    }
}
