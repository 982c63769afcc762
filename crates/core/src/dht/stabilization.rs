//! Ring side of the periodic stabilization: which fingers to probe and which
//! identifiers to look up on each tick. Turning these into messages is the job of
//! [MessageHandler::stabilize](crate::message::MessageHandler::stabilize).
#![warn(missing_docs)]

use rand::Rng;

use super::chord::PeerRing;
use super::finger::FingerHandle;
use super::types::Node;
use crate::consts::CLEAN_UP_TICKS;
use crate::consts::NFINGERS;
use crate::consts::NPREDECESSORS;
use crate::consts::NSUCCESSORS;
use crate::consts::PING_THRESH;
use crate::consts::PRED_PING_TICKS;
use crate::dht::Did;

/// Outcome of a ping sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sweep {
    /// Fingers to ping now, their `npings` already incremented.
    pub ping: Vec<Node>,
    /// Fingers evicted for silence.
    pub evicted: Vec<Node>,
    /// New owned-arc bound, if the predecessor was evicted.
    pub range: Option<Did>,
}

/// Lookup produced by finger fixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerFix {
    /// Ask `via` for the successor of `target`.
    Target {
        /// Closest preceding active finger, or the successor.
        via: Node,
        /// `self + 2^i`.
        target: Did,
    },
    /// Every remaining finger target falls before the successor. Ask a well-known
    /// peer about a random id in our successor arc to learn about nodes hidden there.
    Random(Did),
}

impl PeerRing {
    /// Advance the tick counter, returns the new count.
    pub(crate) fn tick(&mut self) -> u64 {
        self.ticks += 1;
        self.ticks
    }

    /// Whether the predecessor is pinged on this tick.
    pub(crate) fn pred_ping_due(&self) -> bool {
        self.ticks % PRED_PING_TICKS == 0
    }

    /// Whether garbage collection runs on this tick.
    pub(crate) fn clean_up_due(&self) -> bool {
        self.ticks % CLEAN_UP_TICKS == 0
    }

    /// Evict silent fingers and choose the ones to ping.
    ///
    /// Every finger with an outstanding ping is pinged again, plus the finger at the
    /// round robin position `to_ping`.
    pub fn sweep(&mut self) -> Sweep {
        let mut out = Sweep::default();
        let mut pos = 0;
        let mut rr_has_next = None;
        let mut cursor = self.finger.head();

        while let Some(h) = cursor {
            cursor = self.finger.next(h);
            let Some(npings) = self.finger.get(h).map(|f| f.npings) else {
                break;
            };

            if npings >= PING_THRESH {
                if let Some(f) = self.finger.remove(h) {
                    tracing::info!("{} drops {} after {} lost pings", self.node, f.node, npings);
                    out.evicted.push(f.node);
                }
                pos += 1;
                continue;
            }

            let round_robin = pos == self.to_ping;
            if round_robin {
                rr_has_next = Some(cursor.is_some());
            }
            if npings > 0 || round_robin {
                if let Some(f) = self.finger.get_mut(h) {
                    f.npings += 1;
                    out.ping.push(f.node);
                }
            }
            pos += 1;
        }

        self.to_ping = match rr_has_next {
            Some(true) => self.to_ping + 1,
            _ => 0,
        };
        if !out.evicted.is_empty() {
            out.range = self.refresh_range();
        }
        out
    }

    /// Lookups refreshing the successor and predecessor backups.
    ///
    /// Walks `to_fix_backup` steps from the successor toward the tail and asks that
    /// finger for the node right after it. Walks as many steps from the predecessor
    /// toward the head and, if there is a finger further out, asks it for a random id
    /// between the two.
    pub fn backup_fixes<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<(Node, Did)> {
        let steps = self.to_fix_backup;
        self.to_fix_backup = (steps + 1) % NSUCCESSORS;

        let mut out = vec![];
        let walk = |start: Option<FingerHandle>, forward: bool| -> Option<FingerHandle> {
            let mut h = start;
            for _ in 0..steps {
                h = if forward {
                    self.finger.next(h?)
                } else {
                    self.finger.prev(h?)
                };
            }
            h
        };

        if let Some(f) = walk(self.finger.successor(), true).and_then(|h| self.finger.get(h)) {
            out.push((f.node, f.node.id + Did::from(1u32)));
        }

        let back = walk(self.finger.predecessor(), false);
        let outward = back.and_then(|h| self.finger.prev(h));
        if let (Some(f), Some(o)) = (
            back.and_then(|h| self.finger.get(h)),
            outward.and_then(|h| self.finger.get(h)),
        ) {
            out.push((o.node, Did::random_between(rng, o.node.id, f.node.id)));
        }
        out
    }

    /// Next finger target to look up. `None` without a successor.
    pub fn finger_fix<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<FingerFix> {
        let succ = self.successor()?;
        let me = self.node.id;
        let target = me.successor(self.to_fix_finger);
        if self.to_fix_finger == 0 || target.is_between(me, succ.id) {
            self.to_fix_finger = NFINGERS - 1;
            return Some(FingerFix::Random(Did::random_between(rng, me, succ.id)));
        }
        self.to_fix_finger -= 1;
        let via = self.closest_preceding(target)?;
        Some(FingerFix::Target { via, target })
    }

    /// Garbage collect routing fingers. Returns the new bound if the predecessor went
    /// away with them.
    pub fn clean_up(&mut self) -> Option<Did> {
        let removed = self.finger.prune(NSUCCESSORS, NPREDECESSORS);
        if removed.is_empty() {
            return None;
        }
        tracing::debug!("{} garbage collected {} fingers", self.node, removed.len());
        self.refresh_range()
    }
}
