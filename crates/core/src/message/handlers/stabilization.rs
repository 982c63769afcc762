#![warn(missing_docs)]

use std::net::SocketAddr;

use rand::seq::SliceRandom;

use crate::dht::types::Node;
use crate::dht::Did;
use crate::dht::FingerFix;
use crate::error::Error;
use crate::error::Result;
use crate::message::types::Message;
use crate::message::types::Notify;
use crate::message::types::Stabilize;
use crate::message::types::StabilizeReply;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::MessagePayload;

impl HandleMsg<Stabilize> for MessageHandler {
    fn handle(
        &mut self,
        ctx: &MessagePayload,
        _msg: &Stabilize,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let dht = self.ring()?;
        dht.finger.insert(ctx.from_node());
        Ok(dht
            .predecessor()
            .map(|pred| {
                MessageHandlerEvent::Send(
                    Message::StabilizeReply(StabilizeReply {
                        candidate: pred.wire_addr(),
                    }),
                    ctx.from,
                )
            })
            .into_iter()
            .collect())
    }
}

impl HandleMsg<StabilizeReply> for MessageHandler {
    fn handle(
        &mut self,
        ctx: &MessagePayload,
        msg: &StabilizeReply,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let candidate = Node::from(msg.candidate);
        let dht = self.ring()?;
        if candidate.id == dht.did() {
            return Ok(vec![]);
        }
        let is_new = matches!(dht.finger.insert(candidate), Some((_, true)));

        let mut events = vec![];
        if let Some(succ) = dht.successor() {
            events.push(MessageHandlerEvent::Send(Message::Notify(Notify), succ.addr));
        }
        if is_new {
            events.push(self.ping(candidate.addr, ctx.now));
        }
        Ok(events)
    }
}

impl HandleMsg<Notify> for MessageHandler {
    fn handle(&mut self, ctx: &MessagePayload, _msg: &Notify) -> Result<Vec<MessageHandlerEvent>> {
        let sender = ctx.from_node();
        let dht = self.ring()?;
        match dht.finger.insert(sender) {
            Some((_, true)) => Ok(vec![self.ping(sender.addr, ctx.now)]),
            _ => Ok(vec![]),
        }
    }
}

/// One step of a stabilization tick, in the order it happened.
enum Step {
    Ping(SocketAddr),
    Lookup(SocketAddr, Did),
    Stabilize(SocketAddr),
    Range(Did),
}

impl MessageHandler {
    /// One stabilization tick at `now`.
    ///
    /// Without an active successor the bootstrap restarts through the well-known
    /// peers and nothing else happens. Otherwise silent fingers are evicted and probed, the successor is asked for
    /// its predecessor, and one backup pair and one finger are refreshed. The
    /// predecessor is pinged and the list garbage collected every few ticks.
    pub fn stabilize(&mut self, now: u64) -> Result<Vec<MessageHandlerEvent>> {
        let Self {
            dht,
            rng,
            well_known,
            ..
        } = &mut *self;
        let dht = dht.as_mut().ok_or(Error::AddrUndiscovered)?;
        let me = dht.node;
        let mut steps = vec![];

        dht.tick();

        if dht.successor().is_none() {
            tracing::debug!("{} has no successor, ask well-known peers", me);
            for peer in well_known.iter().filter(|p| **p != me.addr) {
                steps.push(Step::Lookup(*peer, me.id));
                steps.push(Step::Ping(*peer));
            }
        } else {
            let sweep = dht.sweep();
            steps.extend(sweep.ping.iter().map(|n| Step::Ping(n.addr)));
            steps.extend(sweep.range.map(Step::Range));

            // The sweep may have evicted the last active finger.
            if let Some(succ) = dht.successor() {
                steps.push(Step::Stabilize(succ.addr));

                if dht.pred_ping_due() {
                    steps.extend(dht.predecessor().map(|p| Step::Ping(p.addr)));
                }

                for (via, target) in dht.backup_fixes(&mut *rng) {
                    steps.push(Step::Lookup(via.addr, target));
                }

                match dht.finger_fix(&mut *rng) {
                    Some(FingerFix::Target { via, target }) => {
                        steps.push(Step::Lookup(via.addr, target));
                    }
                    Some(FingerFix::Random(target)) => {
                        let peer = well_known.choose(&mut *rng);
                        if let Some(peer) = peer.filter(|p| **p != me.addr) {
                            steps.push(Step::Lookup(*peer, target));
                        }
                    }
                    None => {}
                }

                if dht.clean_up_due() {
                    steps.extend(dht.clean_up().map(Step::Range));
                }
            }
        }

        let mut events: Vec<MessageHandlerEvent> = steps
            .into_iter()
            .map(|step| match step {
                Step::Ping(to) => self.ping(to, now),
                Step::Lookup(to, target) => self.find_successor(me, to, target, now),
                Step::Stabilize(to) => MessageHandlerEvent::Send(Message::Stabilize(Stabilize), to),
                Step::Range(bound) => MessageHandlerEvent::UpdateRange(bound, me.id),
            })
            .collect();
        self.refresh_state(&mut events);
        Ok(events)
    }
}
