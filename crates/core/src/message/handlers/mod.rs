#![warn(missing_docs)]
//! This module implemented message handler of the ring.
/// Message Flow:
/// +---------+    +------------------------------+    +--------------------------+
/// | Message | -> | MessageHandler.handle_message | -> | Vec<MessageHandlerEvent> |
/// +---------+    +------------------------------+    +--------------------------+
///                                                                ||
///                                                     +----------------------+
///                                                     | Swarm executes events |
///                                                     +----------------------+
use std::net::SocketAddr;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::Message;
use super::MessagePayload;
use crate::consts::DEFAULT_TTL;
use crate::dht::types::Node;
use crate::dht::types::RingState;
use crate::dht::Did;
use crate::dht::PeerRing;
use crate::error::Error;
use crate::error::Result;
use crate::message::types::AddrDiscover;
use crate::message::types::Data;
use crate::message::types::FindSuccessor;
use crate::message::types::Ping;
use crate::ticket::Salt;
use crate::ticket::Ticket;
use crate::ticket::TicketScope;

/// Operator and Handler for address discovery
pub mod addr;
/// Operator and Handler for liveness probes
pub mod ping;
/// Operator and Handler for lookups and data routing
pub mod routing;
/// Operator and handler for DHT stablization
pub mod stabilization;

/// MessageHandlerEvent that will be handled by Swarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageHandlerEvent {
    /// Instructs the swarm to send a message to an address.
    Send(Message, SocketAddr),

    /// Data for a key this node owns, with the node that first sent it.
    Deliver(Bytes, Node),

    /// The owned arc is now `(pred_bound, self_id]`.
    UpdateRange(Did, Did),

    /// The own address is known, stop asking for it.
    CancelDiscovery,

    /// Start the periodic stabilization.
    ArmStabilization,

    /// The node moved to another [RingState].
    StateChange(RingState),
}

/// MessageHandler will manage resources.
///
/// It owns the whole per-node state: the ring once the own address is known, the
/// ticket salt and the well-known peers.
pub struct MessageHandler {
    dht: Option<PeerRing>,
    salt: Salt,
    well_known: Vec<SocketAddr>,
    rng: StdRng,
    state: RingState,
}

/// Generic trait for handle message ,inspired by Actor-Model.
pub trait HandleMsg<T> {
    /// Message handler.
    fn handle(&mut self, ctx: &MessagePayload, msg: &T) -> Result<Vec<MessageHandlerEvent>>;
}

impl MessageHandler {
    /// Create a new MessageHandler Instance with a fresh salt.
    pub fn new(well_known: Vec<SocketAddr>) -> Result<Self> {
        Ok(Self::new_with_salt(
            Salt::generate()?,
            well_known,
            StdRng::from_entropy(),
        ))
    }

    /// Same as new, with a given salt and random source.
    pub fn new_with_salt(salt: Salt, well_known: Vec<SocketAddr>, rng: StdRng) -> Self {
        Self {
            dht: None,
            salt,
            well_known,
            rng,
            state: RingState::Uninitialized,
        }
    }

    /// The ring, once the own address is known.
    pub fn dht(&self) -> Option<&PeerRing> {
        self.dht.as_ref()
    }

    /// Mutable ring, for maintenance outside the message flow.
    pub fn dht_mut(&mut self) -> Option<&mut PeerRing> {
        self.dht.as_mut()
    }

    pub(crate) fn ring(&mut self) -> Result<&mut PeerRing> {
        self.dht.as_mut().ok_or(Error::AddrUndiscovered)
    }

    /// Life cycle state.
    pub fn state(&self) -> RingState {
        self.state
    }

    /// Bootstrap peers.
    pub fn well_known(&self) -> &[SocketAddr] {
        &self.well_known
    }

    /// Adopt `addr` as the own external address. Does nothing when one is known.
    pub fn init(&mut self, addr: SocketAddr) -> Vec<MessageHandlerEvent> {
        if self.dht.is_some() {
            return vec![];
        }
        let node = Node::new(addr);
        tracing::info!("own address is {}, id {}", node.addr, node.id);
        self.dht = Some(PeerRing::new(node));
        let mut events = vec![
            MessageHandlerEvent::CancelDiscovery,
            MessageHandlerEvent::ArmStabilization,
            MessageHandlerEvent::UpdateRange(node.id, node.id),
        ];
        self.refresh_state(&mut events);
        events
    }

    /// Ask every well-known peer for our address.
    pub fn discover(&mut self, now: u64) -> Vec<MessageHandlerEvent> {
        if self.dht.is_some() {
            return vec![];
        }
        let mut events: Vec<MessageHandlerEvent> = self
            .well_known
            .iter()
            .map(|to| {
                let ticket = Ticket::mint(&self.salt, now, &TicketScope::AddrDiscover { to: *to });
                MessageHandlerEvent::Send(Message::AddrDiscover(AddrDiscover { ticket }), *to)
            })
            .collect();
        self.refresh_state(&mut events);
        events
    }

    /// Check the ring state and report a transition.
    fn refresh_state(&mut self, events: &mut Vec<MessageHandlerEvent>) {
        let state = match &self.dht {
            Some(dht) => dht.state(),
            None => RingState::Discovering,
        };
        if state != self.state {
            tracing::info!("ring state {} -> {}", self.state, state);
            self.state = state;
            events.push(MessageHandlerEvent::StateChange(state));
        }
    }

    /// A ping to `to`, stamped `now`.
    pub(crate) fn ping(&self, to: SocketAddr, now: u64) -> MessageHandlerEvent {
        let ticket = Ticket::mint(&self.salt, now, &TicketScope::Ping { to, time: now });
        MessageHandlerEvent::Send(Message::Ping(Ping { ticket, time: now }), to)
    }

    /// A fresh lookup of `target` sent to `to` on our behalf.
    pub(crate) fn find_successor(
        &self,
        me: Node,
        to: SocketAddr,
        target: Did,
        now: u64,
    ) -> MessageHandlerEvent {
        let ticket = Ticket::mint(&self.salt, now, &TicketScope::FindSuccessor);
        MessageHandlerEvent::Send(
            Message::FindSuccessor(FindSuccessor {
                ticket,
                ttl: DEFAULT_TTL,
                requester: me.wire_addr(),
                target,
            }),
            to,
        )
    }

    /// Check a ticket against our salt.
    pub(crate) fn verify(&self, ticket: &Ticket, now: u64, scope: TicketScope) -> Result<()> {
        if ticket.verify(&self.salt, now, &scope) {
            Ok(())
        } else {
            Err(Error::InvalidTicket)
        }
    }

    /// Route application data toward the owner of `target`.
    /// Locally originated data keeps its full ttl on the first hop.
    pub fn send_data(&mut self, target: Did, payload: Bytes) -> Result<Vec<MessageHandlerEvent>> {
        let dht = self.ring()?;
        let me = dht.node;
        let data = Data {
            ttl: DEFAULT_TTL,
            last: false,
            target,
            origin: me.wire_addr(),
            payload,
        };
        Ok(routing::route_data(dht, data))
    }

    /// Handle builtin message.
    pub fn handle_message(&mut self, payload: &MessagePayload) -> Result<Vec<MessageHandlerEvent>> {
        tracing::debug!("handle {} from {}", payload.data, payload.from);

        if payload.data.is_routing() {
            let me = self.dht.as_ref().ok_or(Error::AddrUndiscovered)?.node;
            if payload.from == me.addr {
                return Err(Error::SelfOriginator);
            }
        }

        let mut events = match &payload.data {
            Message::AddrDiscover(ref msg) => self.handle(payload, msg),
            Message::AddrDiscoverReply(ref msg) => self.handle(payload, msg),
            Message::Data(ref msg) => self.handle(payload, msg),
            Message::FindSuccessor(ref msg) => self.handle(payload, msg),
            Message::FindSuccessorReply(ref msg) => self.handle(payload, msg),
            Message::Stabilize(ref msg) => self.handle(payload, msg),
            Message::StabilizeReply(ref msg) => self.handle(payload, msg),
            Message::Notify(ref msg) => self.handle(payload, msg),
            Message::Ping(ref msg) => self.handle(payload, msg),
            Message::Pong(ref msg) => self.handle(payload, msg),
        }?;

        self.refresh_state(&mut events);
        Ok(events)
    }
}
