// Statful - A buffered UDP metrics client for Rust!
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
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::sinks::core::{MetricSink, SinkStats, SocketStats};
use crate::types::{ErrorKind, MetricError, MetricResult};

/// Attempt to convert anything implementing the `ToSocketAddrs` trait
/// into a concrete `SocketAddr` instance, returning an `InvalidInput`
/// error if the address could not be parsed.
#[allow(clippy::needless_pass_by_value)]
fn get_addr<A: ToSocketAddrs>(addr: A) -> MetricResult<SocketAddr> {
    match addr.to_socket_addrs()?.next() {
        Some(addr) => Ok(addr),
        None => Err(MetricError::from((ErrorKind::InvalidInput, "No socket addresses yielded"))),
    }
}

/// Bind a local, non-blocking socket suitable for sending to `addr`.
fn bind_for(addr: &SocketAddr) -> io::Result<UdpSocket> {
    let local = if addr.is_ipv6() {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    };

    let socket = UdpSocket::bind(local)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

#[derive(Debug)]
enum Transport {
    Open { addr: SocketAddr, socket: UdpSocket },
    Closed { addr: SocketAddr },
    Failed,
}

/// Implementation of a `MetricSink` that emits metrics over UDP.
///
/// Each call to `.emit()` results in exactly one datagram sent to the
/// collector, in the thread of the caller. Nothing is retried.
///
/// The sink can be closed and is transparently re-opened by the next emit.
/// A sink that could not be opened in the first place (see
/// `UdpMetricSink::connect`) never sends anything.
#[derive(Debug)]
pub struct UdpMetricSink {
    transport: Mutex<Transport>,
    stats: SocketStats,
}

impl UdpMetricSink {
    /// Construct a new `UdpMetricSink` instance from an already bound socket.
    ///
    /// The address should be the address of the remote collector. The socket
    /// should already be bound to a local address with any desired
    /// configuration applied (blocking vs non-blocking, timeouts, etc.).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::net::UdpSocket;
    /// use statful::{UdpMetricSink, DEFAULT_PORT};
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
    /// * It is unable to resolve the hostname of the collector.
    /// * The host address is otherwise unable to be parsed
    pub fn from<A>(to_addr: A, socket: UdpSocket) -> MetricResult<UdpMetricSink>
    where
        A: ToSocketAddrs,
    {
        let addr = get_addr(to_addr)?;
        Ok(Self::with_transport(Transport::Open { addr, socket }))
    }

    /// Open a non-blocking UDP socket for sending to `host:port`.
    ///
    /// This never fails. If the host can't be resolved or a local socket
    /// can't be bound the failure is logged and the returned sink is inert:
    /// every emit returns an error and nothing is ever sent.
    pub fn connect(host: &str, port: u16) -> UdpMetricSink {
        let opened = get_addr((host, port))
            .and_then(|addr| Ok(Transport::Open { addr, socket: bind_for(&addr)? }));

        match opened {
            Ok(transport) => Self::with_transport(transport),
            Err(e) => {
                warn!(host, port, error = %e, "Failed to open UDP transport, metrics will not be sent.");
                Self::with_transport(Transport::Failed)
            }
        }
    }

    fn with_transport(transport: Transport) -> Self {
        UdpMetricSink {
            transport: Mutex::new(transport),
            stats: SocketStats::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the sink currently holds an open socket.
    pub fn is_open(&self) -> bool {
        matches!(*self.lock(), Transport::Open { .. })
    }

    fn send(transport: &mut Transport, buf: &[u8]) -> io::Result<usize> {
        if let Transport::Closed { addr } = *transport {
            debug!(%addr, "Re-opening closed UDP transport.");
            let socket = bind_for(&addr)?;
            *transport = Transport::Open { addr, socket };
        }

        match transport {
            Transport::Open { addr, socket } => socket.send_to(buf, *addr),
            Transport::Closed { .. } | Transport::Failed => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "UDP transport could not be opened",
            )),
        }
    }
}

impl MetricSink for UdpMetricSink {
    fn emit(&self, message: &str) -> io::Result<usize> {
        let mut transport = self.lock();
        self.stats
            .update(Self::send(&mut transport, message.as_bytes()), message.len())
    }

    fn close(&self) -> io::Result<()> {
        let mut transport = self.lock();
        if let Transport::Open { addr, .. } = *transport {
            // dropping the socket closes it
            *transport = Transport::Closed { addr };
        }
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        (&self.stats).into()
    }
}

#[cfg(test)]
mod tests {
    use super::{get_addr, MetricSink, UdpMetricSink};
    use std::net::{SocketAddr, UdpSocket};
    use std::time::Duration;

    fn receiver() -> (UdpSocket, SocketAddr) {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let addr = server.local_addr().unwrap();
        (server, addr)
    }

    fn recv(server: &UdpSocket) -> String {
        let mut buf = [0u8; 1024];
        let n = server.recv(&mut buf).unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn test_get_addr_bad_address() {
        let res = get_addr("asdf");
        assert!(res.is_err());
    }

    #[test]
    fn test_get_addr_valid_address() {
        let res = get_addr("127.0.0.1:2013");
        assert!(res.is_ok());
    }

    #[test]
    fn test_udp_metric_sink_from() {
        let (server, addr) = receiver();
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sink = UdpMetricSink::from(addr, socket).unwrap();

        assert_eq!(13, sink.emit("a.b.c,x=y 1 2").unwrap());
        assert_eq!("a.b.c,x=y 1 2", recv(&server));
        assert_eq!(1, sink.stats().packets_sent);
    }

    #[test]
    fn test_udp_metric_sink_connect_and_reopen() {
        let (server, addr) = receiver();
        let sink = UdpMetricSink::connect("127.0.0.1", addr.port());
        assert!(sink.is_open());

        sink.emit("first").unwrap();
        assert_eq!("first", recv(&server));

        sink.close().unwrap();
        assert!(!sink.is_open());

        sink.emit("second").unwrap();
        assert!(sink.is_open());
        assert_eq!("second", recv(&server));
    }

    #[test]
    fn test_udp_metric_sink_connect_failure_is_inert() {
        let sink = UdpMetricSink::connect("this host does not resolve", 2013);
        assert!(!sink.is_open());

        assert!(sink.emit("dropped").is_err());
        assert!(sink.close().is_ok());
        assert!(sink.emit("dropped again").is_err());

        let stats = sink.stats();
        assert_eq!(0, stats.packets_sent);
        assert_eq!(2, stats.packets_dropped);
    }
}
