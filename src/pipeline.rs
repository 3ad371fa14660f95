// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::client::{MetricBackend, StatsClient};
use crate::sealed::Sealed;
use log::trace;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::mem;

/// Where a pipeline sends its lines when flushed.
#[derive(Clone, Copy)]
enum Upstream<'a> {
    Client(&'a StatsClient),
    Pipeline(&'a Pipeline<'a>),
}

/// Buffer of metric lines that are sent together, packed into as few
/// datagrams as possible, when the pipeline is flushed.
///
/// A pipeline supports every reporting method a `StatsClient` does (it's a
/// `MetricBackend`). Sampling, tags, and formatting happen when each metric
/// is recorded; only sending is deferred.
///
/// When flushed, lines are taken in the order they were recorded and joined
/// with `\n` while the datagram stays below the client's maximum UDP size.
/// A line that doesn't fit starts a new datagram. A single line that is too
/// large on its own is still sent, in a datagram by itself.
///
/// Dropping a pipeline flushes it, so a pipeline bound to a scope sends its
/// metrics exactly once when the scope ends, even while unwinding from a
/// panic. Use `discard` to drop buffered lines without sending them.
///
/// Pipelines can be nested: a pipeline created from another pipeline flushes
/// into its parent's buffer, and only the outermost pipeline sends anything.
/// The child packs its lines the same way before handing them over, and each
/// packed group is kept together in a single datagram by the parent.
///
/// # Example
///
/// ```
/// use metronome::prelude::*;
/// use metronome::{StatsClient, SpyMetricSink};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let client = StatsClient::from_sink("web", sink);
///
/// let outer = client.pipeline();
/// outer.incr("requests");
/// {
///     let inner = outer.pipeline();
///     inner.timing("render", 3);
/// }
/// assert!(rx.try_recv().is_err());
///
/// outer.flush();
/// assert_eq!(
///     "web.requests:1|c\nweb.render:3.000000|ms".as_bytes(),
///     rx.recv().unwrap().as_slice()
/// );
/// ```
pub struct Pipeline<'a> {
    upstream: Upstream<'a>,
    buffer: RefCell<VecDeque<String>>,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(client: &'a StatsClient) -> Self {
        Self::with_upstream(Upstream::Client(client))
    }

    fn with_upstream(upstream: Upstream<'a>) -> Self {
        Pipeline {
            upstream,
            buffer: RefCell::new(VecDeque::new()),
        }
    }

    /// Start a pipeline that flushes into this one.
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::with_upstream(Upstream::Pipeline(self))
    }

    /// Number of entries waiting to be flushed: single lines, or groups of
    /// lines handed over by a nested pipeline.
    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }

    /// Send everything buffered so far, leaving the pipeline empty and
    /// usable.
    ///
    /// Flushing an empty pipeline does nothing. Transport errors are passed
    /// to the client's error handler, one per datagram that failed.
    pub fn flush(&self) {
        let lines = mem::take(&mut *self.buffer.borrow_mut());
        if lines.is_empty() {
            return;
        }

        match self.upstream {
            Upstream::Client(client) => {
                let count = lines.len();
                let mut sent = 0;
                for datagram in Datagrams::new(lines.into_iter(), client.max_udp_size()) {
                    client.transmit(&datagram);
                    sent += 1;
                }
                trace!("Flushed {} metric lines in {} datagrams", count, sent);
            }
            Upstream::Pipeline(parent) => {
                // Each packed chunk stays one entry so the parent never splits it
                let chunks = Datagrams::new(lines.into_iter(), self.client().max_udp_size());
                parent.buffer.borrow_mut().extend(chunks);
            }
        }
    }

    /// Drop everything buffered without sending it.
    pub fn discard(self) {
        self.buffer.borrow_mut().clear();
    }
}

impl<'a> Sealed for Pipeline<'a> {}

impl<'a> MetricBackend for Pipeline<'a> {
    fn client(&self) -> &StatsClient {
        match self.upstream {
            Upstream::Client(client) => client,
            Upstream::Pipeline(parent) => parent.client(),
        }
    }

    fn deliver(&self, line: String) {
        self.buffer.borrow_mut().push_back(line);
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::pipeline(self)
    }
}

impl<'a> Drop for Pipeline<'a> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl<'a> fmt::Debug for Pipeline<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nested = matches!(self.upstream, Upstream::Pipeline(_));
        write!(f, "Pipeline {{ nested: {}, buffered: {} }}", nested, self.len())
    }
}

/// Greedy packing of lines into datagrams.
///
/// Lines are joined with `\n` as long as the result stays strictly below
/// `max` bytes. Order is preserved and every line ends up in exactly one
/// datagram.
pub(crate) struct Datagrams<I> {
    lines: I,
    pending: Option<String>,
    max: usize,
}

impl<I> Datagrams<I>
where
    I: Iterator<Item = String>,
{
    pub(crate) fn new(lines: I, max: usize) -> Self {
        Datagrams {
            lines,
            pending: None,
            max,
        }
    }
}

impl<I> Iterator for Datagrams<I>
where
    I: Iterator<Item = String>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut data = match self.pending.take() {
            Some(line) => line,
            None => self.lines.next()?,
        };

        for line in self.lines.by_ref() {
            if data.len() + line.len() + 1 >= self.max {
                self.pending = Some(line);
                return Some(data);
            }
            data.push('\n');
            data.push_str(&line);
        }

        Some(data)
    }
}
