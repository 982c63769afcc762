//! Error of chordring_core

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chordring-core.
///
/// The first group is the protocol taxonomy: every message handler returns one
/// of them and the swarm drops the offending datagram after logging it. None
/// of them is retried, stabilization re-probes instead.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("TTL expired")]
    TtlExpired,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid ticket")]
    InvalidTicket,

    #[error("Own address is not discovered yet")]
    AddrUndiscovered,

    #[error("Message originated from self")]
    SelfOriginator,

    #[error("Finger table refused the peer")]
    FingerError,

    #[error("Bincode serialization error")]
    BincodeSerialize(#[source] bincode::Error),

    #[error("Bincode deserialization error")]
    BincodeDeserialize(#[source] bincode::Error),

    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("Invalid hexadecimal did")]
    BadHexInDid,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to seed ticket salt from the OS random source: {0}")]
    RandomSource(#[source] rand::Error),

    #[error("At least one well-known peer is required")]
    MissingWellKnownPeers,

    #[error("Message handler lock poisoned")]
    HandlerLock,
}

impl Error {
    /// Errors that mean the datagram itself was malformed, as opposed to
    /// well formed but rejected.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::ProtocolError(_)
                | Error::BincodeDeserialize(_)
                | Error::UnsupportedVersion(_)
                | Error::UnknownMessageType(_)
        )
    }
}
