// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parsing of Statsd lines and datagrams
//!
//! This is the inverse of the formatting done when metrics are sent and is
//! mostly useful for tests or tools that inspect the datagrams a client
//! emits (for example, datagrams captured by a `SpyMetricSink`).
//!
//! # Example
//!
//! ```
//! use metronome::MetricType;
//! use metronome::parse::parse_line;
//!
//! let line = parse_line("app.requests:3|c|@0.5|env:prod,shard:2").unwrap();
//!
//! assert_eq!("app.requests", line.name);
//! assert_eq!("3", line.value);
//! assert_eq!(MetricType::Counter, line.metric_type);
//! assert_eq!(Some(0.5), line.sample_rate);
//! assert_eq!(vec![("env", "prod"), ("shard", "2")], line.tags);
//! ```

use crate::builder::MetricType;
use crate::types::{ErrorKind, MetricError, MetricResult};

/// The parts of a single Statsd line, borrowed from the input.
///
/// The value is kept as written (including a leading `+` for gauge deltas).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub metric_type: MetricType,
    pub sample_rate: Option<f64>,
    pub tags: Vec<(&'a str, &'a str)>,
}

fn invalid(desc: &'static str) -> MetricError {
    MetricError::from((ErrorKind::InvalidInput, desc))
}

/// Parse a single `name:value|type[|@rate][|k:v,...]` line.
///
/// # Failures
///
/// Returns an `InvalidInput` error if the line is missing a name, value, or
/// type, has an unknown type code, or has a sample rate or tag that can't
/// be parsed.
pub fn parse_line(line: &str) -> MetricResult<ParsedLine<'_>> {
    let (name, rest) = line.split_once(':').ok_or_else(|| invalid("Missing ':' after metric name"))?;
    if name.is_empty() {
        return Err(invalid("Empty metric name"));
    }

    let mut chunks = rest.split('|');
    let value = match chunks.next() {
        Some(v) if !v.is_empty() => v,
        _ => return Err(invalid("Empty metric value")),
    };

    let metric_type = chunks
        .next()
        .and_then(MetricType::from_code)
        .ok_or_else(|| invalid("Missing or unknown metric type"))?;

    let mut sample_rate = None;
    let mut tags = Vec::new();

    for chunk in chunks {
        match chunk.as_bytes().first() {
            Some(b'@') => {
                let rate = chunk[1..].parse::<f64>().map_err(|_| invalid("Invalid sample rate"))?;
                sample_rate = Some(rate);
            }
            Some(_) => {
                for pair in chunk.split(',') {
                    let (k, v) = pair.split_once(':').ok_or_else(|| invalid("Tag must be a key:value pair"))?;
                    tags.push((k, v));
                }
            }
            None => return Err(invalid("Empty field")),
        }
    }

    Ok(ParsedLine {
        name,
        value,
        metric_type,
        sample_rate,
        tags,
    })
}

/// Parse every line of a datagram, in order.
///
/// Lines are separated by a single `\n`. A trailing newline is tolerated.
pub fn parse_datagram(datagram: &str) -> MetricResult<Vec<ParsedLine<'_>>> {
    datagram
        .strip_suffix('\n')
        .unwrap_or(datagram)
        .split('\n')
        .map(parse_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_datagram, parse_line, ParsedLine};
    use crate::builder::{MetricType, Sampler};
    use crate::client::{Counted, Gauged, Setted, StatsClient, Timed};
    use crate::sinks::SpyMetricSink;
    use crate::types::ErrorKind;

    #[test]
    fn test_parse_line_simple() {
        let line = parse_line("some.key:4|c").unwrap();
        assert_eq!(
            ParsedLine {
                name: "some.key",
                value: "4",
                metric_type: MetricType::Counter,
                sample_rate: None,
                tags: vec![],
            },
            line
        );
    }

    #[test]
    fn test_parse_line_gauge_delta() {
        let line = parse_line("conns:+3|g").unwrap();
        assert_eq!("+3", line.value);
        assert_eq!(MetricType::Gauge, line.metric_type);
    }

    #[test]
    fn test_parse_line_tags_without_rate() {
        let line = parse_line("k:1|ms|a:1,b:true").unwrap();
        assert_eq!(MetricType::Timer, line.metric_type);
        assert_eq!(None, line.sample_rate);
        assert_eq!(vec![("a", "1"), ("b", "true")], line.tags);
    }

    #[test]
    fn test_parse_line_errors() {
        for bad in ["", "nocolon", ":1|c", "k:|c", "k:1", "k:1|h", "k:1|c|@x", "k:1|c|tag", "k:1|c||a:b"] {
            let err = parse_line(bad).unwrap_err();
            assert_eq!(ErrorKind::InvalidInput, err.kind(), "input: {:?}", bad);
        }
    }

    #[test]
    fn test_parse_datagram() {
        let lines = parse_datagram("a:1|c\nb:2|g\nc:x|s\n").unwrap();
        let names: Vec<_> = lines.iter().map(|l| l.name).collect();
        assert_eq!(vec!["a", "b", "c"], names);
    }

    #[test]
    fn test_parse_round_trip_from_client() {
        let (rx, sink) = SpyMetricSink::new();
        let client = StatsClient::builder("app", sink).with_tag("env", "prod").build();

        client
            .incr_by_with_tags("hits", 7)
            .with_tag("shard", 3)
            .with_sample_rate(1.0)
            .send();
        client.timing_with_tags("lat", 2.25).with_tag("env", "dev").send();
        client.gauge_delta("pool", 4);
        client.set("users", "alice");

        let hits = String::from_utf8(rx.recv().unwrap()).unwrap();
        let hits = parse_line(&hits).unwrap();
        assert_eq!("app.hits", hits.name);
        assert_eq!("7", hits.value);
        assert_eq!(MetricType::Counter, hits.metric_type);
        assert_eq!(vec![("env", "prod"), ("shard", "3")], hits.tags);

        let lat = String::from_utf8(rx.recv().unwrap()).unwrap();
        let lat = parse_line(&lat).unwrap();
        assert_eq!("2.250000", lat.value);
        assert_eq!(vec![("env", "dev")], lat.tags);

        let pool = String::from_utf8(rx.recv().unwrap()).unwrap();
        assert_eq!("+4", parse_line(&pool).unwrap().value);

        let users = String::from_utf8(rx.recv().unwrap()).unwrap();
        assert_eq!(MetricType::Set, parse_line(&users).unwrap().metric_type);
    }

    struct AlwaysKeep;

    impl Sampler for AlwaysKeep {
        fn draw(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_parse_round_trip_from_client_sampled() {
        let (rx, sink) = SpyMetricSink::new();
        let client = StatsClient::builder("app", sink)
            .with_tag("env", "prod")
            .with_sampler(AlwaysKeep)
            .build();

        client
            .incr_by_with_tags("hits", 7)
            .with_tag("shard", 3)
            .with_sample_rate(0.5)
            .send();

        let hits = String::from_utf8(rx.recv().unwrap()).unwrap();
        assert_eq!("app.hits:7|c|@0.5|env:prod,shard:3", hits);

        let hits = parse_line(&hits).unwrap();
        assert_eq!("app.hits", hits.name);
        assert_eq!("7", hits.value);
        assert_eq!(MetricType::Counter, hits.metric_type);
        assert_eq!(Some(0.5), hits.sample_rate);
        assert_eq!(vec![("env", "prod"), ("shard", "3")], hits.tags);
    }
}
