//! This module defines the [TransportInterface] trait.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

/// The largest datagram a transport will carry.
pub const TRANSPORT_MTU: usize = 8192;

/// A datagram received by a transport, tagged with its source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Where the datagram came from, as observed by the receiving socket.
    pub source: SocketAddr,
    /// The raw bytes.
    pub data: Bytes,
}

/// Any transport implements this trait can be used by the swarm.
///
/// Sending is fire-and-forget: an `Ok` only means the datagram left the local
/// endpoint. Receiving is expected to be cancel safe, so that it can be raced
/// against timers in a `select!`.
#[async_trait]
pub trait TransportInterface {
    /// Error type of the transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The address this endpoint is bound to.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;

    /// Send a datagram to `dest`.
    async fn send_to(&self, dest: SocketAddr, data: &[u8]) -> Result<(), Self::Error>;

    /// Wait for the next inbound datagram.
    async fn recv_from(&self) -> Result<Datagram, Self::Error>;
}

