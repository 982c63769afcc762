//! DHT types about peers and the ring state.
#![warn(missing_docs)]
use std::net::IpAddr;
use std::net::Ipv6Addr;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use super::did::Did;

/// A socket address as it travels on the wire and as it is hashed:
/// sixteen address bytes, IPv4 mapped into IPv6, and a big-endian port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireAddr {
    /// IPv6 or IPv4-mapped address octets.
    pub addr: [u8; 16],
    /// UDP port.
    pub port: u16,
}

impl WireAddr {
    /// The eighteen bytes fed to the identifier hash.
    pub fn to_bytes(&self) -> [u8; 18] {
        let mut out = [0u8; 18];
        out[..16].copy_from_slice(&self.addr);
        out[16..].copy_from_slice(&self.port.to_be_bytes());
        out
    }
}

impl From<SocketAddr> for WireAddr {
    fn from(addr: SocketAddr) -> Self {
        let octets = match addr.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        Self {
            addr: octets,
            port: addr.port(),
        }
    }
}

impl From<WireAddr> for SocketAddr {
    fn from(w: WireAddr) -> Self {
        SocketAddr::new(Ipv6Addr::from(w.addr).to_canonical(), w.port)
    }
}

/// Strip IPv4-mapped IPv6 down to plain IPv4 so one peer has one spelling.
pub fn canonical_addr(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

/// A peer of the ring: its identifier and the address it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Sha1 of the wire form of `addr`.
    pub id: Did,
    /// Canonical socket address.
    pub addr: SocketAddr,
}

impl Node {
    /// Derive the node living at `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        let addr = canonical_addr(addr);
        Self {
            id: Did::hash(&WireAddr::from(addr).to_bytes()),
            addr,
        }
    }

    /// Wire form of the address.
    pub fn wire_addr(&self) -> WireAddr {
        WireAddr::from(self.addr)
    }
}

impl From<SocketAddr> for Node {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl From<WireAddr> for Node {
    fn from(w: WireAddr) -> Self {
        Self::new(w.into())
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.addr)
    }
}

/// Life cycle of the local node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
pub enum RingState {
    /// Nothing started yet.
    Uninitialized,
    /// Asking well-known peers for the external address.
    Discovering,
    /// Address known, no predecessor confirmed yet.
    Joining,
    /// A predecessor answered a ping.
    Stable,
}
