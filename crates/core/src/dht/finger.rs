#![warn(missing_docs)]
//! The finger list of a node.
//!
//! Every peer the node knows about lives in one sequence ordered by forward distance
//! from the local identifier. The head is the nearest successor and the tail the
//! nearest predecessor, so the successor list, the predecessor list and the routing
//! fingers are all just positions in the same list.
//!
//! The list is an arena of slots linked by index. A [FingerHandle] stays valid until
//! the finger it names is removed.

use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;

use crate::consts::MAX_PASSIVE_FINGERS;
use crate::consts::PING_THRESH;
use crate::dht::types::Node;
use crate::dht::Did;
use crate::measure::Rtt;

/// Stable index of a finger inside a [FingerTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerHandle(usize);

/// Whether the peer has ever answered us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerStatus {
    /// Heard of, reachability not confirmed.
    Passive,
    /// Confirmed by a verified pong.
    Active,
}

/// A peer with liveness data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finger {
    /// The peer.
    pub node: Node,
    /// Passive until the first verified pong.
    pub status: FingerStatus,
    /// Consecutive unanswered pings.
    pub npings: u32,
    /// Round trip estimate.
    pub rtt: Rtt,
}

impl Finger {
    fn new(node: Node) -> Self {
        Self {
            node,
            status: FingerStatus::Passive,
            npings: 0,
            rtt: Rtt::new(),
        }
    }

    /// Shortcut of `status == Active`.
    pub fn is_active(&self) -> bool {
        self.status == FingerStatus::Active
    }
}

#[derive(Debug, Clone)]
struct Slot {
    finger: Finger,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Finger table of Chord DHT, ordered by clockwise distance `id - self` from the
/// local node.
#[derive(Debug, Clone)]
pub struct FingerTable {
    node: Node,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    passive: usize,
    max_passive: usize,
}

impl FingerTable {
    /// builder
    pub fn new(node: Node) -> Self {
        Self::with_max_passive(node, MAX_PASSIVE_FINGERS)
    }

    /// Same as new, with another cap of passive fingers.
    pub fn with_max_passive(node: Node, max_passive: usize) -> Self {
        Self {
            node,
            slots: vec![],
            free: vec![],
            head: None,
            tail: None,
            len: 0,
            passive: 0,
            max_passive,
        }
    }

    /// The local node the table is ordered from.
    pub fn node(&self) -> Node {
        self.node
    }

    /// Number of fingers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of passive fingers.
    pub fn passive_count(&self) -> usize {
        self.passive
    }

    fn slot(&self, h: FingerHandle) -> Option<&Slot> {
        self.slots.get(h.0).and_then(|s| s.as_ref())
    }

    fn slot_mut(&mut self, h: FingerHandle) -> Option<&mut Slot> {
        self.slots.get_mut(h.0).and_then(|s| s.as_mut())
    }

    /// getter
    pub fn get(&self, h: FingerHandle) -> Option<&Finger> {
        self.slot(h).map(|s| &s.finger)
    }

    /// mut getter
    pub fn get_mut(&mut self, h: FingerHandle) -> Option<&mut Finger> {
        self.slot_mut(h).map(|s| &mut s.finger)
    }

    /// Look a finger up by identifier.
    pub fn find(&self, id: Did) -> Option<FingerHandle> {
        self.iter().find(|(_, f)| f.node.id == id).map(|(h, _)| h)
    }

    /// Nearest finger walking forward, passive included.
    pub fn head(&self) -> Option<FingerHandle> {
        self.head.map(FingerHandle)
    }

    /// Nearest finger walking backward, passive included.
    pub fn tail(&self) -> Option<FingerHandle> {
        self.tail.map(FingerHandle)
    }

    /// The finger after `h`, toward the tail.
    pub fn next(&self, h: FingerHandle) -> Option<FingerHandle> {
        self.slot(h).and_then(|s| s.next).map(FingerHandle)
    }

    /// The finger before `h`, toward the head.
    pub fn prev(&self, h: FingerHandle) -> Option<FingerHandle> {
        self.slot(h).and_then(|s| s.prev).map(FingerHandle)
    }

    /// Walk from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            cursor: self.head,
        }
    }

    /// First active finger from the head.
    pub fn successor(&self) -> Option<FingerHandle> {
        self.iter().find(|(_, f)| f.is_active()).map(|(h, _)| h)
    }

    /// First active finger from the tail.
    pub fn predecessor(&self) -> Option<FingerHandle> {
        let mut cursor = self.tail;
        while let Some(i) = cursor {
            let slot = self.slot(FingerHandle(i))?;
            if slot.finger.is_active() {
                return Some(FingerHandle(i));
            }
            cursor = slot.prev;
        }
        None
    }

    /// The farthest finger strictly between the local node and `id`.
    /// Passive fingers are skipped unless `include_passive`.
    pub fn closest_preceding(&self, id: Did, include_passive: bool) -> Option<FingerHandle> {
        let me = self.node.id;
        let mut cursor = self.tail;
        while let Some(i) = cursor {
            let slot = self.slot(FingerHandle(i))?;
            let f = &slot.finger;
            if (include_passive || f.is_active()) && f.node.id.is_strictly_between(me, id) {
                return Some(FingerHandle(i));
            }
            cursor = slot.prev;
        }
        None
    }

    /// Add a peer, or refresh it when its identifier is already known.
    /// Returns the handle and whether the finger is new; `None` for the local node.
    pub fn insert(&mut self, node: Node) -> Option<(FingerHandle, bool)> {
        if node.id == self.node.id || node.addr == self.node.addr {
            tracing::debug!("finger table refuses to insert self {}", node);
            return None;
        }

        if let Some(h) = self.find(node.id) {
            let f = self.get_mut(h)?;
            if f.node.addr != node.addr {
                tracing::debug!("finger {} moved to {}", f.node, node.addr);
                f.node = node;
            }
            f.rtt.reset();
            return Some((h, false));
        }

        if self.passive >= self.max_passive {
            if let Some(worst) = self.worst_passive() {
                let evicted = self.remove(worst);
                tracing::debug!("evict passive finger {:?} for {}", evicted, node);
            }
        }

        let after = self.closest_preceding(node.id, true);
        let idx = self.alloc(Slot {
            finger: Finger::new(node),
            prev: None,
            next: None,
        });
        self.link_after(after.map(|h| h.0), idx);
        self.len += 1;
        self.passive += 1;
        tracing::debug!("insert finger {}", node);
        Some((FingerHandle(idx), true))
    }

    /// The passive finger with most unanswered pings, scanning from the head.
    fn worst_passive(&self) -> Option<FingerHandle> {
        let mut worst: Option<(FingerHandle, u32)> = None;
        for (h, f) in self.iter().filter(|(_, f)| !f.is_active()) {
            if worst.map(|(_, n)| f.npings > n).unwrap_or(true) {
                worst = Some((h, f.npings));
            }
            if f.npings >= PING_THRESH - 1 {
                break;
            }
        }
        worst.map(|(h, _)| h)
    }

    /// Mark the finger confirmed.
    pub fn activate(&mut self, h: FingerHandle) {
        let mut activated = false;
        if let Some(f) = self.get_mut(h) {
            if !f.is_active() {
                f.status = FingerStatus::Active;
                activated = true;
            }
        }
        if activated {
            self.passive -= 1;
        }
    }

    /// Unlink a finger and give it back.
    pub fn remove(&mut self, h: FingerHandle) -> Option<Finger> {
        let slot = self.slots.get_mut(h.0)?.take()?;
        match slot.prev {
            Some(p) => {
                if let Some(s) = self.slots[p].as_mut() {
                    s.next = slot.next;
                }
            }
            None => self.head = slot.next,
        }
        match slot.next {
            Some(n) => {
                if let Some(s) = self.slots[n].as_mut() {
                    s.prev = slot.prev;
                }
            }
            None => self.tail = slot.prev,
        }
        self.free.push(h.0);
        self.len -= 1;
        if !slot.finger.is_active() {
            self.passive -= 1;
        }
        Some(slot.finger)
    }

    /// Garbage collect routing fingers.
    ///
    /// Fingers up to `nsucc` places past the successor stay, and so do fingers from
    /// `npred` places before the predecessor to the tail. Passive fingers closer than
    /// the successor or farther than the predecessor stay too. In between, a finger
    /// stays only when it is the first finger at or past some target `self + 2^k`,
    /// that is when a power of two lies in `(d(prev), d(f)]` where `d` is the distance
    /// from the local node. Returns the removed peers.
    pub fn prune(&mut self, nsucc: usize, npred: usize) -> Vec<Node> {
        let fingers: Vec<(FingerHandle, bool)> =
            self.iter().map(|(h, f)| (h, f.is_active())).collect();
        let handles: Vec<FingerHandle> = fingers.iter().map(|(h, _)| *h).collect();
        let succ_pos = fingers.iter().position(|(_, a)| *a).unwrap_or(0);
        let pred_pos = fingers
            .iter()
            .rposition(|(_, a)| *a)
            .unwrap_or(handles.len().saturating_sub(1));
        let start = succ_pos + nsucc;
        let end = (pred_pos + 1).saturating_sub(npred);
        if start >= end {
            return vec![];
        }
        let me = self.node.id;
        let dist = |t: &Self, h: FingerHandle| t.get(h).map(|f| f.node.id - me);

        let mut doomed = vec![];
        for i in start..end {
            let (Some(d), Some(d_prev)) = (
                dist(self, handles[i]),
                if i == 0 {
                    Some(Did::ZERO)
                } else {
                    dist(self, handles[i - 1])
                },
            ) else {
                continue;
            };
            let keep = highest_target(d).map(|t| t > d_prev).unwrap_or(false);
            if !keep {
                doomed.push(handles[i]);
            }
        }

        doomed
            .into_iter()
            .filter_map(|h| self.remove(h))
            .map(|f| f.node)
            .collect()
    }

    fn alloc(&mut self, slot: Slot) -> usize {
        match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn link_after(&mut self, after: Option<usize>, idx: usize) {
        let next = match after {
            Some(a) => self.slots[a].as_ref().and_then(|s| s.next),
            None => self.head,
        };
        if let Some(s) = self.slots[idx].as_mut() {
            s.prev = after;
            s.next = next;
        }
        match after {
            Some(a) => {
                if let Some(s) = self.slots[a].as_mut() {
                    s.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slots[n].as_mut() {
                    s.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
    }
}

/// Largest power of two not above `d`.
fn highest_target(d: Did) -> Option<Did> {
    let bits = BigUint::from(d).bits();
    if bits == 0 {
        None
    } else {
        Some(Did::pow2(bits as usize - 1))
    }
}

/// Iterator of [FingerTable], head to tail.
pub struct Iter<'a> {
    table: &'a FingerTable,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (FingerHandle, &'a Finger);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.cursor?;
        let slot = self.table.slots.get(i)?.as_ref()?;
        self.cursor = slot.next;
        Some((FingerHandle(i), &slot.finger))
    }
}
