#![warn(missing_docs)]

use crate::dht::types::Node;
use crate::dht::PeerRing;
use crate::error::Error;
use crate::error::Result;
use crate::message::types::Data;
use crate::message::types::FindSuccessor;
use crate::message::types::FindSuccessorReply;
use crate::message::types::Message;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::MessagePayload;
use crate::ticket::TicketScope;

/// Deliver `data` if we own its target, otherwise pick the next hop.
pub(crate) fn route_data(dht: &PeerRing, mut data: Data) -> Vec<MessageHandlerEvent> {
    if dht.owns(data.target) {
        tracing::debug!("{} owns {}, deliver", dht.node, data.target);
        return vec![MessageHandlerEvent::Deliver(
            data.payload,
            Node::from(data.origin),
        )];
    }

    if data.last {
        if let Some(pred) = dht.predecessor() {
            return vec![MessageHandlerEvent::Send(Message::Data(data), pred.addr)];
        }
    }

    match dht.next_hop(data.target) {
        Some((next, last)) => {
            data.last = last;
            vec![MessageHandlerEvent::Send(Message::Data(data), next.addr)]
        }
        None => {
            tracing::debug!("{} has no route to {}", dht.node, data.target);
            vec![]
        }
    }
}

impl HandleMsg<FindSuccessor> for MessageHandler {
    fn handle(
        &mut self,
        _ctx: &MessagePayload,
        msg: &FindSuccessor,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let ttl = msg.ttl.saturating_sub(1);
        if ttl == 0 {
            return Err(Error::TtlExpired);
        }

        let dht = self.ring()?;
        let me = dht.node;
        let requester = Node::from(msg.requester);
        if requester.id == me.id {
            tracing::debug!("lookup of {} came back to its requester", msg.target);
            return Ok(vec![]);
        }

        let reply = |answer: Node| {
            MessageHandlerEvent::Send(
                Message::FindSuccessorReply(FindSuccessorReply {
                    ticket: msg.ticket,
                    answer: answer.wire_addr(),
                }),
                requester.addr,
            )
        };

        let Some(succ) = dht.successor() else {
            return Ok(vec![reply(me)]);
        };
        if msg.target.is_between(me.id, succ.id) {
            return Ok(vec![reply(succ)]);
        }

        let next = dht.closest_preceding(msg.target).unwrap_or(succ);
        tracing::debug!("forward lookup of {} to {}", msg.target, next);
        Ok(vec![MessageHandlerEvent::Send(
            Message::FindSuccessor(FindSuccessor { ttl, ..msg.clone() }),
            next.addr,
        )])
    }
}

impl HandleMsg<FindSuccessorReply> for MessageHandler {
    fn handle(
        &mut self,
        ctx: &MessagePayload,
        msg: &FindSuccessorReply,
    ) -> Result<Vec<MessageHandlerEvent>> {
        self.verify(&msg.ticket, ctx.now, TicketScope::FindSuccessor)?;

        let answer = Node::from(msg.answer);
        let dht = self.ring()?;
        if answer.id == dht.did() {
            return Ok(vec![]);
        }
        match dht.finger.insert(answer) {
            Some((_, true)) => Ok(vec![self.ping(answer.addr, ctx.now)]),
            _ => Ok(vec![]),
        }
    }
}

impl HandleMsg<Data> for MessageHandler {
    fn handle(&mut self, _ctx: &MessagePayload, msg: &Data) -> Result<Vec<MessageHandlerEvent>> {
        let ttl = msg.ttl.saturating_sub(1);
        if ttl == 0 {
            return Err(Error::TtlExpired);
        }
        let dht = self.ring()?;
        Ok(route_data(dht, Data { ttl, ..msg.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;

    use super::*;
    use crate::consts::DEFAULT_TTL;
    use crate::dht::Did;
    use crate::message::handlers::tests::handler;
    use crate::ticket::Salt;
    use crate::ticket::Ticket;

    fn peer(i: u8) -> SocketAddr {
        SocketAddr::from(([127, 0, 1, i], 6000))
    }

    fn lookup(target: Did, requester: SocketAddr, ttl: u8) -> FindSuccessor {
        FindSuccessor {
            ticket: Ticket::mint(&Salt::from_bytes([0; 16]), 0, &TicketScope::FindSuccessor),
            ttl,
            requester: requester.into(),
            target,
        }
    }

    #[test]
    fn test_lookup_alone_answers_self() {
        let (mut h, addr) = handler(10);
        h.init(addr);
        let ctx = MessagePayload::new(peer(1), 0, Message::Notify(crate::message::Notify));
        let events = h.handle(&ctx, &lookup(Did::ZERO, peer(1), 3)).unwrap();
        match &events[..] {
            [MessageHandlerEvent::Send(Message::FindSuccessorReply(r), to)] => {
                assert_eq!(*to, peer(1));
                assert_eq!(SocketAddr::from(r.answer), addr);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lookup_ttl() {
        let (mut h, addr) = handler(11);
        h.init(addr);
        let ctx = MessagePayload::new(peer(1), 0, Message::Notify(crate::message::Notify));
        assert!(matches!(
            h.handle(&ctx, &lookup(Did::ZERO, peer(1), 1)),
            Err(Error::TtlExpired)
        ));
        assert!(matches!(
            h.handle(&ctx, &lookup(Did::ZERO, peer(1), 0)),
            Err(Error::TtlExpired)
        ));
        // A lookup of our own is dropped quietly.
        assert!(h.handle(&ctx, &lookup(Did::ZERO, addr, 2)).unwrap().is_empty());
    }

    #[test]
    fn test_lookup_forwards_with_same_ticket() {
        let (mut h, addr) = handler(12);
        h.init(addr);
        let me = Node::new(addr);
        let mut ids: Vec<Did> = (1..6).map(|i| Node::new(peer(i)).id).collect();
        ids.sort_by_key(|x| *x - me.id);
        {
            let dht = h.dht_mut().unwrap();
            for i in 1..6 {
                let (f, _) = dht.finger.insert(Node::new(peer(i))).unwrap();
                dht.activate(f);
            }
        }
        let ctx = MessagePayload::new(peer(9), 0, Message::Notify(crate::message::Notify));
        let req = lookup(ids[3], peer(9), DEFAULT_TTL);
        let events = h.handle(&ctx, &req).unwrap();
        match &events[..] {
            [MessageHandlerEvent::Send(Message::FindSuccessor(f), to)] => {
                assert_eq!(Node::new(*to).id, ids[2]);
                assert_eq!(f.ticket, req.ticket);
                assert_eq!(f.ttl, DEFAULT_TTL - 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        // The successor answers lookups in its arc.
        let events = h.handle(&ctx, &lookup(ids[0], peer(9), DEFAULT_TTL)).unwrap();
        match &events[..] {
            [MessageHandlerEvent::Send(Message::FindSuccessorReply(r), _)] => {
                assert_eq!(Node::from(r.answer).id, ids[0]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_data_ttl_and_delivery() {
        let (mut h, addr) = handler(13);
        h.init(addr);
        let ctx = MessagePayload::new(peer(1), 0, Message::Notify(crate::message::Notify));
        let data = Data {
            ttl: 1,
            last: false,
            target: Did::hash(b"x"),
            origin: peer(1).into(),
            payload: Bytes::from_static(b"p"),
        };
        assert!(matches!(h.handle(&ctx, &data), Err(Error::TtlExpired)));

        let events = h.handle(&ctx, &Data { ttl: 2, ..data }).unwrap();
        assert_eq!(events, vec![MessageHandlerEvent::Deliver(
            Bytes::from_static(b"p"),
            Node::new(peer(1))
        )]);
    }

    #[test]
    fn test_last_hop_walks_back_to_predecessor() {
        let (mut h, addr) = handler(14);
        h.init(addr);
        let me = Node::new(addr);
        let mut ids: Vec<Did> = (1..6).map(|i| Node::new(peer(i)).id).collect();
        ids.sort_by_key(|x| *x - me.id);
        {
            let dht = h.dht_mut().unwrap();
            for i in 1..6 {
                let (f, _) = dht.finger.insert(Node::new(peer(i))).unwrap();
                dht.activate(f);
            }
            assert_eq!(dht.pred_bound(), ids[4]);
        }
        let ctx = MessagePayload::new(peer(9), 0, Message::Notify(crate::message::Notify));
        let data = Data {
            ttl: DEFAULT_TTL,
            last: true,
            target: ids[4],
            origin: peer(9).into(),
            payload: Bytes::from_static(b"back"),
        };

        // Overshot: the key sits at our predecessor, hand it back with the flag kept.
        let events = h.handle(&ctx, &data).unwrap();
        match &events[..] {
            [MessageHandlerEvent::Send(Message::Data(d), to)] => {
                assert_eq!(Node::new(*to).id, ids[4]);
                assert!(d.last);
                assert_eq!(d.ttl, DEFAULT_TTL - 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Without the flag the same key is routed forward.
        let events = h.handle(&ctx, &Data { last: false, ..data.clone() }).unwrap();
        match &events[..] {
            [MessageHandlerEvent::Send(Message::Data(d), to)] => {
                assert_eq!(Node::new(*to).id, ids[3]);
                assert!(!d.last);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_last_hop_without_predecessor_delivers() {
        let (mut h, addr) = handler(15);
        h.init(addr);
        // A passive finger is no predecessor, the whole ring is still ours.
        h.dht_mut().unwrap().finger.insert(Node::new(peer(2)));
        let ctx = MessagePayload::new(peer(9), 0, Message::Notify(crate::message::Notify));
        let data = Data {
            ttl: DEFAULT_TTL,
            last: true,
            target: Node::new(peer(2)).id,
            origin: peer(9).into(),
            payload: Bytes::from_static(b"mine"),
        };
        let events = h.handle(&ctx, &data).unwrap();
        assert_eq!(events, vec![MessageHandlerEvent::Deliver(
            Bytes::from_static(b"mine"),
            Node::new(peer(9))
        )]);
    }
}
