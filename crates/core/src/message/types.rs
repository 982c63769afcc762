#![warn(missing_docs)]
//! This module defines the message structures of the ring.
//! Most of the messages follow the request/reply pattern, such as `FindSuccessor` and
//! `FindSuccessorReply`. Replies to authenticated requests echo the requester's
//! [Ticket] untouched.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::types::WireAddr;
use crate::dht::Did;
use crate::ticket::Ticket;

/// Type tag carried in the header of every datagram.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::FromRepr,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[repr(u8)]
pub enum MessageType {
    /// Ask a peer which address it sees us at.
    AddrDiscover = 0,
    /// Report the observed address.
    AddrDiscoverReply = 1,
    /// Application payload routed to the owner of a key.
    Data = 2,
    /// Lookup of the node responsible for an id.
    FindSuccessor = 3,
    /// Answer to a lookup.
    FindSuccessorReply = 4,
    /// Ask the successor for its predecessor.
    Stabilize = 5,
    /// The predecessor as seen by our successor.
    StabilizeReply = 6,
    /// Tell a peer we might be its predecessor.
    Notify = 7,
    /// Liveness probe.
    Ping = 8,
    /// Liveness answer.
    Pong = 9,
}

/// MessageType use to discover the external address.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AddrDiscover {
    /// Minted by the requester, bound to the queried peer.
    pub ticket: Ticket,
}

/// MessageType report the address the request came from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AddrDiscoverReply {
    /// Echo of the request ticket.
    pub ticket: Ticket,
    /// Source address of the request as observed by the replier.
    pub addr: WireAddr,
}

/// MessageType carry application data toward the node owning `target`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Data {
    /// Remaining hops.
    pub ttl: u8,
    /// Set when the receiver should be the owner or just past it, so the message
    /// only walks backward from here.
    pub last: bool,
    /// Key the payload is addressed to.
    pub target: Did,
    /// The node that first sent the payload.
    pub origin: WireAddr,
    /// Opaque application bytes.
    pub payload: Bytes,
}

/// MessageType use to find successor in a chord ring.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessor {
    /// Minted by the requester, forwarded untouched.
    pub ticket: Ticket,
    /// Remaining hops.
    pub ttl: u8,
    /// The node expecting the reply.
    pub requester: WireAddr,
    /// did of target
    pub target: Did,
}

/// MessageType use to report the successor to the requester.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorReply {
    /// Echo of the request ticket.
    pub ticket: Ticket,
    /// The node responsible for the target.
    pub answer: WireAddr,
}

/// MessageType ask the receiver for its predecessor.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Stabilize;

/// MessageType report the predecessor of the sender.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StabilizeReply {
    /// The current predecessor of the replier.
    pub candidate: WireAddr,
}

/// MessageType tell the receiver about the sender.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Notify;

/// MessageType probe liveness.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Ping {
    /// Minted by the pinger, bound to the receiver and `time`.
    pub ticket: Ticket,
    /// Send time of the pinger, in ms.
    pub time: u64,
}

/// MessageType answer a ping.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Pong {
    /// Echo of the ping ticket.
    pub ticket: Ticket,
    /// Echo of the ping time.
    pub time: u64,
}

/// A collection MessageType use for unified management.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// Address discovery request.
    AddrDiscover(AddrDiscover),
    /// Address discovery reply.
    AddrDiscoverReply(AddrDiscoverReply),
    /// Routed application data.
    Data(Data),
    /// Successor lookup.
    FindSuccessor(FindSuccessor),
    /// Successor lookup reply.
    FindSuccessorReply(FindSuccessorReply),
    /// Stabilization request.
    Stabilize(Stabilize),
    /// Stabilization reply.
    StabilizeReply(StabilizeReply),
    /// Predecessor notification.
    Notify(Notify),
    /// Liveness probe.
    Ping(Ping),
    /// Liveness answer.
    Pong(Pong),
}

impl Message {
    /// The header tag of this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::AddrDiscover(_) => MessageType::AddrDiscover,
            Message::AddrDiscoverReply(_) => MessageType::AddrDiscoverReply,
            Message::Data(_) => MessageType::Data,
            Message::FindSuccessor(_) => MessageType::FindSuccessor,
            Message::FindSuccessorReply(_) => MessageType::FindSuccessorReply,
            Message::Stabilize(_) => MessageType::Stabilize,
            Message::StabilizeReply(_) => MessageType::StabilizeReply,
            Message::Notify(_) => MessageType::Notify,
            Message::Ping(_) => MessageType::Ping,
            Message::Pong(_) => MessageType::Pong,
        }
    }

    /// Everything but address discovery needs a known own address.
    pub fn is_routing(&self) -> bool {
        !matches!(
            self,
            Message::AddrDiscover(_) | Message::AddrDiscoverReply(_)
        )
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message_type())
    }
}
