// Metronome - A batching Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::RwLock;

use crate::sinks::core::{MetricSink, SinkStats, SocketStats};
use crate::types::{ErrorKind, MetricError, MetricResult};

/// Address family used when resolving the Statsd host and binding the local
/// socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    #[default]
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    fn matches(self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Ipv4 => addr.is_ipv4(),
            AddressFamily::Ipv6 => addr.is_ipv6(),
        }
    }

    fn unspecified(self) -> SocketAddr {
        match self {
            AddressFamily::Ipv4 => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            AddressFamily::Ipv6 => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        }
    }
}

/// Attempt to convert anything implementing the `ToSocketAddrs` trait
/// into a concrete `SocketAddr` instance, optionally restricted to an
/// address family, returning an `InvalidInput` error if no address could
/// be found.
// Public portion of the API (the sink constructors) is pass by value so
// there's no point in changing this to be pass by reference yet.
#[allow(clippy::needless_pass_by_value)]
fn get_addr<A: ToSocketAddrs>(addr: A, family: Option<AddressFamily>) -> MetricResult<SocketAddr> {
    let found = addr
        .to_socket_addrs()?
        .find(|a| family.map_or(true, |f| f.matches(a)));

    match found {
        Some(addr) => Ok(addr),
        None => Err(MetricError::from((
            ErrorKind::InvalidInput,
            "No socket addresses yielded",
        ))),
    }
}

/// Implementation of a `MetricSink` that emits datagrams over UDP.
///
/// It accepts a UDP socket instance over which to write datagrams and the
/// address of the Statsd server to send packets to. Each datagram is sent to
/// the Statsd server when the `.emit()` method is called, in the thread of
/// the caller.
///
/// Closing the sink releases the socket. Datagrams emitted afterwards fail
/// with a `NotConnected` I/O error which the client logs and discards.
#[derive(Debug)]
pub struct UdpMetricSink {
    addr: SocketAddr,
    socket: RwLock<Option<UdpSocket>>,
    stats: SocketStats,
}

impl UdpMetricSink {
    /// Construct a new `UdpMetricSink` instance.
    ///
    /// The address should be the address of the remote metric server to
    /// emit metrics to over UDP. The socket should already be bound to a
    /// local address with any desired configuration applied (blocking vs
    /// non-blocking, timeouts, etc.).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::net::UdpSocket;
    /// use metronome::{UdpMetricSink, DEFAULT_PORT};
    ///
    /// let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
    /// socket.set_nonblocking(true).unwrap();
    /// let host = ("metrics.example.com", DEFAULT_PORT);
    /// let sink = UdpMetricSink::from(host, socket);
    /// ```
    ///
    /// # Failures
    ///
    /// This method may fail if:
    ///
    /// * It is unable to resolve the hostname of the metric server.
    /// * The host address is otherwise unable to be parsed
    pub fn from<A>(to_addr: A, socket: UdpSocket) -> MetricResult<UdpMetricSink>
    where
        A: ToSocketAddrs,
    {
        let addr = get_addr(to_addr, None)?;
        Ok(Self::new(addr, socket))
    }

    /// Resolve the given host and port using the requested address family,
    /// bind an ephemeral local socket of the same family, and construct a new
    /// `UdpMetricSink` that sends to the resolved address.
    ///
    /// The socket is put in non-blocking mode so that emitting a metric never
    /// blocks the caller.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use metronome::{AddressFamily, UdpMetricSink, DEFAULT_PORT};
    ///
    /// let sink = UdpMetricSink::connect("localhost", DEFAULT_PORT, AddressFamily::Ipv6).unwrap();
    /// ```
    ///
    /// # Failures
    ///
    /// This method may fail if:
    ///
    /// * The host doesn't resolve to any address of the requested family.
    /// * A local socket can't be bound or configured.
    pub fn connect(host: &str, port: u16, family: AddressFamily) -> MetricResult<UdpMetricSink> {
        let addr = get_addr((host, port), Some(family))?;
        let socket = UdpSocket::bind(family.unspecified())?;
        socket.set_nonblocking(true)?;
        Ok(Self::new(addr, socket))
    }

    fn new(addr: SocketAddr, socket: UdpSocket) -> UdpMetricSink {
        UdpMetricSink {
            addr,
            socket: RwLock::new(Some(socket)),
            stats: SocketStats::default(),
        }
    }

    /// Address datagrams are sent to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        let socket = self.socket.read().unwrap_or_else(|e| e.into_inner());
        match socket.as_ref() {
            Some(s) => s.send_to(datagram, self.addr),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed")),
        }
    }
}

impl MetricSink for UdpMetricSink {
    fn emit(&self, datagram: &str) -> io::Result<usize> {
        self.stats.update(self.send(datagram.as_bytes()), datagram.len())
    }

    fn stats(&self) -> SinkStats {
        (&self.stats).into()
    }

    fn close(&self) {
        let mut socket = self.socket.write().unwrap_or_else(|e| e.into_inner());
        // Dropping the socket closes it
        socket.take();
    }
}
