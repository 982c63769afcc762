#![warn(missing_docs)]
//! Tickets bind a reply to the request that asked for it.
//!
//! A ticket is the creation time followed by a truncated SHA-256 digest of a secret
//! salt, that time, and a [TicketScope]. The requester mints it with its own salt,
//! the responder echoes it untouched, and the requester recomputes the digest from
//! what it knows about the reply. Nothing is stored between request and reply.

use std::net::SocketAddr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::consts::TICKET_HASH_LEN;
use crate::consts::TICKET_SALT_LEN;
use crate::consts::TICKET_TIMEOUT_MS;
use crate::dht::types::WireAddr;
use crate::error::Error;
use crate::error::Result;

/// Bytes in a ticket.
pub const TICKET_LEN: usize = 8 + TICKET_HASH_LEN;

/// Secret of a node, never leaves the process.
#[derive(Clone)]
pub struct Salt([u8; TICKET_SALT_LEN]);

impl Salt {
    /// Draw a salt from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; TICKET_SALT_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(Error::RandomSource)?;
        Ok(Self(bytes))
    }

    /// Use known bytes, for deterministic tests.
    pub fn from_bytes(bytes: [u8; TICKET_SALT_LEN]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// What a ticket is bound to, besides salt and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    /// An address discovery sent to `to`.
    AddrDiscover {
        /// The queried peer.
        to: SocketAddr,
    },
    /// A find successor lookup; any node on the route may answer.
    FindSuccessor,
    /// A ping sent to `to` at `time`.
    Ping {
        /// The pinged peer.
        to: SocketAddr,
        /// Timestamp carried by the ping.
        time: u64,
    },
}

impl TicketScope {
    fn digest_into(&self, hasher: &mut Sha256) {
        match self {
            Self::AddrDiscover { to } => {
                hasher.update([0u8]);
                hasher.update(WireAddr::from(*to).to_bytes());
            }
            Self::FindSuccessor => {
                hasher.update([3u8]);
            }
            Self::Ping { to, time } => {
                hasher.update([8u8]);
                hasher.update(WireAddr::from(*to).to_bytes());
                hasher.update(time.to_be_bytes());
            }
        }
    }
}

/// Opaque proof that a reply answers one of our requests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket([u8; TICKET_LEN]);

impl Ticket {
    fn digest(salt: &Salt, time: u64, scope: &TicketScope) -> [u8; TICKET_HASH_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(salt.0);
        hasher.update(time.to_be_bytes());
        scope.digest_into(&mut hasher);
        let full = hasher.finalize();
        let mut out = [0u8; TICKET_HASH_LEN];
        out.copy_from_slice(&full[..TICKET_HASH_LEN]);
        out
    }

    /// Mint a ticket at `now` (ms).
    pub fn mint(salt: &Salt, now: u64, scope: &TicketScope) -> Self {
        let mut bytes = [0u8; TICKET_LEN];
        bytes[..8].copy_from_slice(&now.to_be_bytes());
        bytes[8..].copy_from_slice(&Self::digest(salt, now, scope));
        Self(bytes)
    }

    /// Creation time in ms.
    pub fn time(&self) -> u64 {
        let mut time = [0u8; 8];
        time.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(time)
    }

    /// Check freshness and digest.
    pub fn verify(&self, salt: &Salt, now: u64, scope: &TicketScope) -> bool {
        let time = self.time();
        if now.saturating_sub(time) > TICKET_TIMEOUT_MS
            || time.saturating_sub(now) > TICKET_TIMEOUT_MS
        {
            tracing::debug!("ticket {} is stale at {}", self, now);
            return false;
        }
        let expected = Self::digest(salt, time, scope);
        expected.ct_eq(&self.0[8..]).into()
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; TICKET_LEN] {
        &self.0
    }
}

impl From<[u8; TICKET_LEN]> for Ticket {
    fn from(bytes: [u8; TICKET_LEN]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Ticket({})", self)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from_str("192.168.1.7:9000").unwrap()
    }

    #[test]
    fn test_round_trip() {
        let salt = Salt::generate().unwrap();
        let scope = TicketScope::AddrDiscover { to: peer() };
        let t = Ticket::mint(&salt, 1_000_000, &scope);
        assert_eq!(t.time(), 1_000_000);
        assert!(t.verify(&salt, 1_000_000, &scope));
        assert!(t.verify(&salt, 1_000_000 + TICKET_TIMEOUT_MS, &scope));
    }

    #[test]
    fn test_expired() {
        let salt = Salt::from_bytes([1; TICKET_SALT_LEN]);
        let t = Ticket::mint(&salt, 1_000_000, &TicketScope::FindSuccessor);
        assert!(!t.verify(
            &salt,
            1_000_000 + TICKET_TIMEOUT_MS + 1,
            &TicketScope::FindSuccessor
        ));
        // From too far in the future is refused as well.
        assert!(!t.verify(
            &salt,
            1_000_000 - TICKET_TIMEOUT_MS - 1,
            &TicketScope::FindSuccessor
        ));
    }

    #[test]
    fn test_scope_tamper() {
        let salt = Salt::from_bytes([2; TICKET_SALT_LEN]);
        let scope = TicketScope::Ping {
            to: peer(),
            time: 42,
        };
        let t = Ticket::mint(&salt, 5000, &scope);
        assert!(t.verify(&salt, 5000, &scope));
        assert!(!t.verify(&salt, 5000, &TicketScope::Ping {
            to: peer(),
            time: 43
        }));
        assert!(!t.verify(&salt, 5000, &TicketScope::Ping {
            to: SocketAddr::from_str("192.168.1.7:9001").unwrap(),
            time: 42
        }));
        assert!(!t.verify(&salt, 5000, &TicketScope::FindSuccessor));
    }

    #[test]
    fn test_wrong_salt() {
        let a = Salt::from_bytes([3; TICKET_SALT_LEN]);
        let b = Salt::from_bytes([4; TICKET_SALT_LEN]);
        let t = Ticket::mint(&a, 5000, &TicketScope::FindSuccessor);
        assert!(!t.verify(&b, 5000, &TicketScope::FindSuccessor));
    }

    #[test]
    fn test_time_tamper() {
        let salt = Salt::from_bytes([5; TICKET_SALT_LEN]);
        let t = Ticket::mint(&salt, 5000, &TicketScope::FindSuccessor);
        let mut bytes = *t.as_bytes();
        bytes[7] ^= 1;
        assert!(!Ticket::from(bytes).verify(&salt, 5000, &TicketScope::FindSuccessor));
    }
}
