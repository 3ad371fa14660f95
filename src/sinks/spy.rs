// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::sinks::core::{MetricSink, SinkStats, SocketStats};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};

/// `MetricSink` implementation that writes every datagram to the `Sender` half
/// of a channel while callers are given ownership of the `Receiver` half.
///
/// This is not a general purpose sink, rather it's a sink meant for verifying
/// datagrams written during the course of integration tests. By default, the
/// channel used is unbounded. The channel size can be limited using the
/// `with_capacity` method.
///
/// Each datagram is sent to the underlying channel when the `.emit()` method is
/// called, in the thread of the caller. Once the sink is closed, datagrams are
/// dropped and reported as errors, mirroring a closed socket.
#[derive(Debug)]
pub struct SpyMetricSink {
    sender: Sender<Vec<u8>>,
    closed: AtomicBool,
    stats: SocketStats,
}

impl SpyMetricSink {
    pub fn new() -> (Receiver<Vec<u8>>, Self) {
        Self::with_queue_capacity(None)
    }

    pub fn with_capacity(queue: usize) -> (Receiver<Vec<u8>>, Self) {
        Self::with_queue_capacity(Some(queue))
    }

    fn with_queue_capacity(queue: Option<usize>) -> (Receiver<Vec<u8>>, Self) {
        let (tx, rx) = new_channel(queue);
        let sink = SpyMetricSink {
            sender: tx,
            closed: AtomicBool::new(false),
            stats: SocketStats::default(),
        };
        (rx, sink)
    }
}

impl MetricSink for SpyMetricSink {
    fn emit(&self, datagram: &str) -> io::Result<usize> {
        let res = if self.closed.load(Ordering::Acquire) {
            Err(io::Error::new(ErrorKind::NotConnected, "sink closed"))
        } else {
            send_datagram(&self.sender, datagram.as_bytes())
        };

        self.stats.update(res, datagram.len())
    }

    fn stats(&self) -> SinkStats {
        (&self.stats).into()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn new_channel(cap: Option<usize>) -> (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    if let Some(sz) = cap {
        bounded(sz)
    } else {
        unbounded()
    }
}

fn send_datagram(sender: &Sender<Vec<u8>>, datagram: &[u8]) -> io::Result<usize> {
    match sender.try_send(datagram.to_vec()) {
        Err(TrySendError::Disconnected(_)) => Err(io::Error::new(ErrorKind::Other, "channel disconnected")),
        Err(TrySendError::Full(_)) => Err(io::Error::new(ErrorKind::Other, "channel full")),
        Ok(_) => Ok(datagram.len()),
    }
}
