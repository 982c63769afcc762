//! Wire codec of [Message].
//!
//! A datagram is a bincode [Header] whose payload is the bincode form of the typed
//! message. Integers are fixed width and big-endian, nothing may trail the encoding.

use bincode::Options;
use bytes::Bytes;
use chordring_transport::core::transport::TRANSPORT_MTU;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use super::types::Message;
use super::types::MessageType;
use crate::consts::PROTOCOL_VERSION;
use crate::error::Error;
use crate::error::Result;

/// Envelope of every datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Must equal [PROTOCOL_VERSION].
    pub version: u8,
    /// A [MessageType] tag.
    pub message_type: u8,
    /// Encoded body.
    pub payload: Vec<u8>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(TRANSPORT_MTU as u64)
        .reject_trailing_bytes()
}

fn to_bytes<T: Serialize>(v: &T) -> Result<Vec<u8>> {
    options().serialize(v).map_err(Error::BincodeSerialize)
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options()
        .deserialize(bytes)
        .map_err(Error::BincodeDeserialize)
}

/// Turn a value into a datagram.
pub trait Encoder {
    /// encode
    fn encode(&self) -> Result<Bytes>;
}

/// Parse a datagram.
pub trait Decoder: Sized {
    /// decode
    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl Encoder for Message {
    fn encode(&self) -> Result<Bytes> {
        let payload = match self {
            Message::AddrDiscover(m) => to_bytes(m),
            Message::AddrDiscoverReply(m) => to_bytes(m),
            Message::Data(m) => to_bytes(m),
            Message::FindSuccessor(m) => to_bytes(m),
            Message::FindSuccessorReply(m) => to_bytes(m),
            Message::Stabilize(m) => to_bytes(m),
            Message::StabilizeReply(m) => to_bytes(m),
            Message::Notify(m) => to_bytes(m),
            Message::Ping(m) => to_bytes(m),
            Message::Pong(m) => to_bytes(m),
        }?;
        let header = Header {
            version: PROTOCOL_VERSION,
            message_type: self.message_type() as u8,
            payload,
        };
        to_bytes(&header).map(Bytes::from)
    }
}

impl Decoder for Message {
    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::ProtocolError("empty datagram".to_string()));
        }
        let header: Header = from_bytes(bytes)?;
        if header.version != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }
        let ty = MessageType::from_repr(header.message_type)
            .ok_or(Error::UnknownMessageType(header.message_type))?;
        let body = header.payload.as_slice();
        Ok(match ty {
            MessageType::AddrDiscover => Message::AddrDiscover(from_bytes(body)?),
            MessageType::AddrDiscoverReply => Message::AddrDiscoverReply(from_bytes(body)?),
            MessageType::Data => Message::Data(from_bytes(body)?),
            MessageType::FindSuccessor => Message::FindSuccessor(from_bytes(body)?),
            MessageType::FindSuccessorReply => Message::FindSuccessorReply(from_bytes(body)?),
            MessageType::Stabilize => Message::Stabilize(from_bytes(body)?),
            MessageType::StabilizeReply => Message::StabilizeReply(from_bytes(body)?),
            MessageType::Notify => Message::Notify(from_bytes(body)?),
            MessageType::Ping => Message::Ping(from_bytes(body)?),
            MessageType::Pong => Message::Pong(from_bytes(body)?),
        })
    }
}
