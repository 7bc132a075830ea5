//! Datagram relay between the HTTP front and the store writer
//!
//! One form body travels as exactly one UDP datagram, no framing, no
//! acknowledgement. Delivery and ordering are best effort.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;

/// Sending half, used by the HTTP front
#[derive(Debug, Clone)]
pub struct RelaySender {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl RelaySender {
    /// Bind an ephemeral local socket aimed at `target`.
    pub async fn bind(target: SocketAddr) -> io::Result<Self> {
        let local = match target.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket: Arc::new(socket),
            target,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send `payload` as one datagram.
    pub async fn forward(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, self.target).await
    }
}

/// A received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    /// Whole payload
    Complete { payload: Bytes, peer: SocketAddr },
    /// Payload did not fit the receive buffer and was cut by the kernel
    Oversized { received: usize, peer: SocketAddr },
}

/// Receiving half, owned by the store writer
#[derive(Debug)]
pub struct RelayReceiver {
    socket: UdpSocket,
    buffer_size: usize,
    // One byte past `buffer_size` to tell a full datagram from a cut one
    buffer: Vec<u8>,
}

impl RelayReceiver {
    pub async fn bind(addr: SocketAddr, buffer_size: usize) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket, buffer_size))
    }

    pub fn from_socket(socket: UdpSocket, buffer_size: usize) -> Self {
        Self {
            socket,
            buffer_size,
            buffer: vec![0u8; buffer_size + 1],
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Wait for the next datagram.
    pub async fn recv(&mut self) -> io::Result<Datagram> {
        let (len, peer) = self.socket.recv_from(&mut self.buffer).await?;

        if len > self.buffer_size {
            return Ok(Datagram::Oversized { received: len, peer });
        }

        Ok(Datagram::Complete {
            payload: Bytes::copy_from_slice(&self.buffer[..len]),
            peer,
        })
    }
}
