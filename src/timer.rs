// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::client::{MetricBackend, Timed};
use crate::types::{ErrorKind, MetricError, MetricResult, TagValue, Tags};
use std::fmt;
use std::time::Instant;

/// Measures elapsed wall clock time and reports it as a timing.
///
/// Timers are created unstarted by `timer()` on a client or pipeline and
/// report to whichever one created them.
///
/// Calling `start()` again restarts the measurement and clears any previously
/// recorded value. A timer that is still running when it's dropped is stopped
/// and sent. A timer stopped with `stop_without_send()` is only sent if
/// `send()` is called.
///
/// Misusing a timer (stopping it before starting it, sending without a
/// recorded value, or sending twice) returns an `InvalidInput` error.
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
/// let mut timer = client.timer("db.query");
/// let rows = timer.time(|| vec![1, 2, 3]);
///
/// assert_eq!(3, rows.len());
/// let line = String::from_utf8(rx.recv().unwrap()).unwrap();
/// assert!(line.starts_with("app.db.query:"));
/// assert!(line.ends_with("|ms"));
/// ```
pub struct Timer<'a, B>
where
    B: MetricBackend,
{
    backend: &'a B,
    key: String,
    rate: f64,
    tags: Tags,
    start: Option<Instant>,
    ms: Option<f64>,
    sent: bool,
}

impl<'a, B> Timer<'a, B>
where
    B: MetricBackend,
{
    pub(crate) fn new(backend: &'a B, key: &str) -> Self {
        Timer {
            backend,
            key: key.to_string(),
            rate: 1.0,
            tags: Tags::new(),
            start: None,
            ms: None,
            sent: false,
        }
    }

    /// Sample rate used when the timing is sent.
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Add a tag to the timing when it is sent.
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TagValue>,
    {
        self.tags.insert(key, value);
        self
    }

    /// Start (or restart) measuring.
    pub fn start(&mut self) -> MetricResult<()> {
        self.start = Some(Instant::now());
        self.ms = None;
        self.sent = false;
        Ok(())
    }

    /// Stop measuring and send the elapsed time.
    pub fn stop(&mut self) -> MetricResult<()> {
        self.stop_without_send()?;
        self.send()
    }

    /// Stop measuring and record the elapsed time without sending it.
    pub fn stop_without_send(&mut self) -> MetricResult<()> {
        let start = self
            .start
            .ok_or_else(|| MetricError::from((ErrorKind::InvalidInput, "Timer was not started")))?;
        self.ms = Some(start.elapsed().as_secs_f64() * 1000.0);
        Ok(())
    }

    /// Send the recorded elapsed time. Only one send is allowed per
    /// measurement.
    pub fn send(&mut self) -> MetricResult<()> {
        if self.sent {
            return Err(MetricError::from((ErrorKind::InvalidInput, "Timer was already sent")));
        }

        let ms = self
            .ms
            .ok_or_else(|| MetricError::from((ErrorKind::InvalidInput, "Timer has no recorded time")))?;

        self.backend
            .timing_with_tags(&self.key, ms)
            .with_sample_rate(self.rate)
            .with_tags(self.tags.iter())
            .send();
        self.sent = true;
        Ok(())
    }

    /// Run the closure, then send the time it took.
    pub fn time<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        self.start = Some(start);
        self.sent = false;
        let result = f();
        self.ms = Some(start.elapsed().as_secs_f64() * 1000.0);

        if let Err(err) = self.send() {
            self.backend.client().consume_error(err);
        }
        result
    }

    /// Elapsed milliseconds recorded by the last stop, if any.
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.ms
    }

    fn is_running(&self) -> bool {
        self.start.is_some() && self.ms.is_none()
    }
}

impl<'a, B> Drop for Timer<'a, B>
where
    B: MetricBackend,
{
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                self.backend.client().consume_error(err);
            }
        }
    }
}

impl<'a, B> fmt::Debug for Timer<'a, B>
where
    B: MetricBackend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("key", &self.key)
            .field("rate", &self.rate)
            .field("tags", &self.tags)
            .field("ms", &self.ms)
            .field("sent", &self.sent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{Batched, StatsClient};
    use crate::sinks::SpyMetricSink;
    use crate::types::ErrorKind;
    use crossbeam_channel::Receiver;
    use std::thread;
    use std::time::Duration;

    fn spy_client() -> (Receiver<Vec<u8>>, StatsClient) {
        let (rx, sink) = SpyMetricSink::new();
        (rx, StatsClient::from_sink("", sink))
    }

    fn received(rx: &Receiver<Vec<u8>>) -> Vec<String> {
        rx.try_iter().map(|d| String::from_utf8(d).unwrap()).collect()
    }

    #[test]
    fn test_timer_start_stop_sends_once() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t");
        timer.start().unwrap();
        thread::sleep(Duration::from_millis(2));
        timer.stop().unwrap();
        drop(timer);

        let lines = received(&rx);
        assert_eq!(1, lines.len());
        let value: f64 = lines[0]
            .trim_start_matches("t:")
            .trim_end_matches("|ms")
            .parse()
            .unwrap();
        assert!(value >= 2.0, "value: {}", value);
    }

    #[test]
    fn test_timer_stop_before_start() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t");

        assert_eq!(ErrorKind::InvalidInput, timer.stop().unwrap_err().kind());
        drop(timer);
        assert!(received(&rx).is_empty());
    }

    #[test]
    fn test_timer_send_without_data() {
        let (_rx, client) = spy_client();
        let mut timer = client.timer("t");
        timer.start().unwrap();

        assert_eq!(ErrorKind::InvalidInput, timer.send().unwrap_err().kind());
    }

    #[test]
    fn test_timer_double_send() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t");
        timer.start().unwrap();
        timer.stop().unwrap();

        assert_eq!(ErrorKind::InvalidInput, timer.send().unwrap_err().kind());
        drop(timer);
        assert_eq!(1, received(&rx).len());
    }

    #[test]
    fn test_timer_stop_without_send() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t");
        timer.start().unwrap();
        timer.stop_without_send().unwrap();
        assert!(timer.elapsed_ms().is_some());
        assert!(received(&rx).is_empty());

        timer.send().unwrap();
        assert_eq!(1, received(&rx).len());
    }

    #[test]
    fn test_timer_restart_clears_previous() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t");
        timer.start().unwrap();
        timer.stop().unwrap();
        timer.start().unwrap();
        assert!(timer.elapsed_ms().is_none());
        timer.stop().unwrap();

        assert_eq!(2, received(&rx).len());
    }

    #[test]
    fn test_timer_drop_sends_running_timer() {
        let (rx, client) = spy_client();
        {
            let mut timer = client.timer("t");
            timer.start().unwrap();
        }

        assert_eq!(1, received(&rx).len());
    }

    #[test]
    fn test_timer_drop_unstarted_sends_nothing() {
        let (rx, client) = spy_client();
        {
            let _timer = client.timer("t");
        }

        assert!(received(&rx).is_empty());
    }

    #[test]
    fn test_timer_time_closure() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t");
        let out = timer.time(|| 42);

        assert_eq!(42, out);
        assert_eq!(1, received(&rx).len());
    }

    #[test]
    fn test_timer_tags_and_rate() {
        let (rx, client) = spy_client();
        let mut timer = client.timer("t").with_tag("db", "users").with_sample_rate(1.0);
        timer.start().unwrap();
        timer.stop().unwrap();

        let lines = received(&rx);
        assert!(lines[0].ends_with("|ms|db:users"), "line: {}", lines[0]);
    }

    #[test]
    fn test_timer_in_pipeline() {
        let (rx, client) = spy_client();
        {
            let pipe = client.pipeline();
            let mut timer = pipe.timer("t");
            timer.start().unwrap();
            timer.stop().unwrap();
            assert_eq!(1, pipe.len());
        }

        assert_eq!(1, received(&rx).len());
    }
}
