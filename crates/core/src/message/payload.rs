#![warn(missing_docs)]

use std::net::SocketAddr;

use super::types::Message;
use crate::dht::types::canonical_addr;
use crate::dht::types::Node;

/// `MessagePayload` is the context a handler sees: a decoded [Message], who sent it and
/// when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    /// Source address of the datagram.
    pub from: SocketAddr,
    /// Receive time, in ms.
    pub now: u64,
    /// Payload data
    pub data: Message,
}

impl MessagePayload {
    /// Wrap a message received from `from` at `now`.
    pub fn new(from: SocketAddr, now: u64, data: Message) -> Self {
        Self {
            from: canonical_addr(from),
            now,
            data,
        }
    }

    /// The implicit sender. Its id is always derived from the source address.
    pub fn from_node(&self) -> Node {
        Node::new(self.from)
    }
}
