//! Datagram sources for the capture loop.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use tracing::{info, warn};

use crate::{CaptureConfig, TransportError};

/// Non-blocking datagram receive.
///
/// Implementations return [`io::ErrorKind::WouldBlock`] when nothing is
/// pending; the capture loop sleeps briefly and polls again.
pub trait DatagramSource: Send + 'static {
    /// Copy one datagram into `buf`, returning its length.
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Address the source listens on, when it has one.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl DatagramSource for UdpSocket {
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv_from(buf).map(|(len, _peer)| len)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        UdpSocket::local_addr(self).ok()
    }
}

/// Bind the telemetry socket described by `config`.
///
/// Failing to enlarge the receive buffer is logged, not returned.
pub fn bind_udp(config: &CaptureConfig) -> Result<UdpSocket, TransportError> {
    let addr = config.bind_addr;
    let bind_failed = |source: io::Error| TransportError::BindFailed { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_failed)?;

    match socket.set_recv_buffer_size(config.recv_buffer_bytes) {
        Ok(()) => {
            let actual = socket.recv_buffer_size().unwrap_or_default();
            info!(requested = config.recv_buffer_bytes, actual, "SO_RCVBUF set");
        }
        Err(e) => warn!(error = %e, requested = config.recv_buffer_bytes, "SO_RCVBUF set failed"),
    }

    socket.bind(&SockAddr::from(addr)).map_err(bind_failed)?;
    socket.set_nonblocking(true).map_err(bind_failed)?;

    let socket: UdpSocket = socket.into();
    info!(addr = %socket.local_addr().unwrap_or(addr), "UDP bind OK");
    Ok(socket)
}
