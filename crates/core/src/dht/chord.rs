//! Chord algorithm implement.
#![warn(missing_docs)]

use super::finger::FingerHandle;
use super::finger::FingerTable;
use super::types::Node;
use super::types::RingState;
use crate::consts::NFINGERS;
use crate::dht::Did;

/// PeerRing is used to help a node interact with other nodes.
/// All nodes form a clockwise ring in the order of Did.
/// This struct takes its name from that.
///
/// It exists once the node knows its own external address. The owned arc of the
/// node is `(pred_bound, node.id]`.
#[derive(Debug, Clone)]
pub struct PeerRing {
    /// The local node.
    pub node: Node,
    /// [FingerTable] help node to find successor quickly.
    pub finger: FingerTable,
    pred_bound: Did,
    /// Next finger index to fix, counting down.
    pub(crate) to_fix_finger: usize,
    /// Steps to walk from successor and predecessor when fixing backups.
    pub(crate) to_fix_backup: usize,
    /// Position of the round robin ping.
    pub(crate) to_ping: usize,
    /// Stabilization ticks so far.
    pub(crate) ticks: u64,
}

impl PeerRing {
    /// A ring made of the local node alone, owning everything.
    pub fn new(node: Node) -> Self {
        Self {
            node,
            finger: FingerTable::new(node),
            pred_bound: node.id,
            to_fix_finger: NFINGERS - 1,
            to_fix_backup: 0,
            to_ping: 0,
            ticks: 0,
        }
    }

    /// Did of the local node.
    pub fn did(&self) -> Did {
        self.node.id
    }

    /// Exclusive lower end of the owned arc.
    pub fn pred_bound(&self) -> Did {
        self.pred_bound
    }

    /// First active finger walking forward.
    pub fn successor(&self) -> Option<Node> {
        self.finger
            .successor()
            .and_then(|h| self.finger.get(h))
            .map(|f| f.node)
    }

    /// First active finger walking backward.
    pub fn predecessor(&self) -> Option<Node> {
        self.finger
            .predecessor()
            .and_then(|h| self.finger.get(h))
            .map(|f| f.node)
    }

    /// Whether `id` falls on the owned arc.
    pub fn owns(&self, id: Did) -> bool {
        id == self.node.id || id.is_between(self.pred_bound, self.node.id)
    }

    /// Joining until both neighbours are confirmed.
    pub fn state(&self) -> RingState {
        if self.successor().is_some() && self.predecessor().is_some() {
            RingState::Stable
        } else {
            RingState::Joining
        }
    }

    /// The active finger that most closely precedes `target`, or the successor.
    pub fn closest_preceding(&self, target: Did) -> Option<Node> {
        self.finger
            .closest_preceding(target, false)
            .and_then(|h| self.finger.get(h))
            .map(|f| f.node)
            .or_else(|| self.successor())
    }

    /// Next hop toward `target` and whether it should be the last forward hop.
    /// `None` when there is no successor.
    pub fn next_hop(&self, target: Did) -> Option<(Node, bool)> {
        let succ = self.successor()?;
        if target.is_between(self.node.id, succ.id) {
            return Some((succ, true));
        }
        self.closest_preceding(target).map(|n| (n, false))
    }

    /// Recompute `pred_bound`, returns the new bound when it moved.
    pub fn refresh_range(&mut self) -> Option<Did> {
        let bound = self.predecessor().map(|p| p.id).unwrap_or(self.node.id);
        if bound == self.pred_bound {
            return None;
        }
        tracing::debug!(
            "{} owned arc moves from {} to {}",
            self.node,
            self.pred_bound,
            bound
        );
        self.pred_bound = bound;
        Some(bound)
    }

    /// Remove a finger, returns the new bound if the predecessor changed.
    pub fn remove(&mut self, h: FingerHandle) -> Option<Did> {
        self.finger.remove(h)?;
        self.refresh_range()
    }

    /// Activate a finger, returns the new bound if the predecessor changed.
    pub fn activate(&mut self, h: FingerHandle) -> Option<Did> {
        self.finger.activate(h);
        self.refresh_range()
    }
}
