//! In-process ring: every node is a [MessageHandler], datagrams go through a FIFO
//! queue and time only moves when a test says so.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::net::SocketAddr;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dht::types::Node;
use crate::dht::Did;
use crate::dht::PeerRing;
use crate::message::Decoder;
use crate::message::Encoder;
use crate::message::Message;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::MessagePayload;
use crate::ticket::Salt;

mod test_ring;
mod test_swarm;

/// Stabilization period of the virtual clock.
pub const ROUND_MS: u64 = 3000;

pub fn addr(i: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, i], 7000))
}

/// Salt of the node at `addr(i)`.
pub fn salt(i: u8) -> Salt {
    Salt::from_bytes([i; 16])
}

pub struct Network {
    pub now: u64,
    nodes: BTreeMap<SocketAddr, MessageHandler>,
    queue: VecDeque<(SocketAddr, SocketAddr, Bytes)>,
    down: HashSet<SocketAddr>,
    /// `(receiver, payload, origin)` of every delivery.
    pub delivered: Vec<(SocketAddr, Bytes, Node)>,
    /// Data datagrams handled so far.
    pub hops: usize,
}

impl Network {
    /// `n` nodes at `addr(1)..=addr(n)`. The first one is the seed and knows its
    /// address, the others discover it through the seed.
    pub fn new(n: u8) -> Self {
        let mut net = Self {
            now: 1_000_000,
            nodes: BTreeMap::new(),
            queue: VecDeque::new(),
            down: HashSet::new(),
            delivered: vec![],
            hops: 0,
        };
        for i in 1..=n {
            net.join(i);
        }
        net
    }

    pub fn join(&mut self, i: u8) {
        let at = addr(i);
        let mut h = MessageHandler::new_with_salt(
            salt(i),
            vec![addr(1)],
            StdRng::seed_from_u64(i as u64),
        );
        let events = if i == 1 {
            h.init(at)
        } else {
            h.discover(self.now)
        };
        self.nodes.insert(at, h);
        self.dispatch(at, events);
        self.run();
    }

    pub fn handler(&mut self, at: SocketAddr) -> &mut MessageHandler {
        self.nodes.get_mut(&at).unwrap()
    }

    pub fn ring(&self, at: SocketAddr) -> &PeerRing {
        self.nodes[&at].dht().unwrap()
    }

    /// Stop delivering anything to or from `at`.
    pub fn kill(&mut self, at: SocketAddr) {
        self.down.insert(at);
    }

    pub fn live(&self) -> Vec<SocketAddr> {
        self.nodes
            .keys()
            .filter(|a| !self.down.contains(a))
            .copied()
            .collect()
    }

    /// Live ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<Did> {
        let mut ids: Vec<Did> = self.live().into_iter().map(|a| Node::new(a).id).collect();
        ids.sort();
        ids
    }

    /// The live node that should own `target`.
    pub fn owner(&self, target: Did) -> SocketAddr {
        self.live()
            .into_iter()
            .min_by_key(|a| Node::new(*a).id - target)
            .unwrap()
    }

    pub fn dispatch(&mut self, from: SocketAddr, events: Vec<MessageHandlerEvent>) {
        for ev in events {
            match ev {
                MessageHandlerEvent::Send(msg, to) => {
                    self.queue.push_back((from, to, msg.encode().unwrap()));
                }
                MessageHandlerEvent::Deliver(payload, origin) => {
                    self.delivered.push((from, payload, origin));
                }
                _ => {}
            }
        }
    }

    /// Drain the queue.
    pub fn run(&mut self) {
        let mut steps = 0;
        while let Some((from, to, bytes)) = self.queue.pop_front() {
            steps += 1;
            assert!(steps < 100_000, "message storm");
            if self.down.contains(&from) || self.down.contains(&to) {
                continue;
            }
            let now = self.now;
            let Some(h) = self.nodes.get_mut(&to) else {
                continue;
            };
            let msg = Message::decode(&bytes).unwrap();
            if matches!(msg, Message::Data(_)) {
                self.hops += 1;
            }
            match h.handle_message(&MessagePayload::new(from, now, msg)) {
                Ok(events) => self.dispatch(to, events),
                Err(e) => tracing::debug!("{} rejected datagram from {}: {}", to, from, e),
            }
        }
    }

    /// One stabilization tick on every live node.
    pub fn round(&mut self) {
        self.now += ROUND_MS;
        for at in self.live() {
            let now = self.now;
            let h = self.handler(at);
            let events = if h.dht().is_some() {
                h.stabilize(now).unwrap()
            } else {
                h.discover(now)
            };
            self.dispatch(at, events);
            self.run();
        }
    }

    pub fn rounds(&mut self, n: usize) {
        for _ in 0..n {
            self.round();
        }
    }

    /// Originate data at `from`.
    pub fn send(&mut self, from: SocketAddr, target: Did, payload: Bytes) {
        let events = self.handler(from).send_data(target, payload).unwrap();
        self.dispatch(from, events);
        self.run();
    }

    /// Every live node points at its true neighbours.
    pub fn assert_converged(&self) {
        let ids = self.sorted_ids();
        let n = ids.len();
        for at in self.live() {
            let ring = self.ring(at);
            let pos = ids.iter().position(|id| *id == ring.did()).unwrap();
            assert_eq!(
                ring.successor().map(|s| s.id),
                Some(ids[(pos + 1) % n]),
                "successor of {}",
                ring.node
            );
            assert_eq!(
                ring.predecessor().map(|p| p.id),
                Some(ids[(pos + n - 1) % n]),
                "predecessor of {}",
                ring.node
            );
        }
    }
}
