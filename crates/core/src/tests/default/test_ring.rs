use bytes::Bytes;

use super::addr;
use super::salt;
use super::Network;
use crate::consts::TICKET_TIMEOUT_MS;
use crate::dht::types::Node;
use crate::dht::types::RingState;
use crate::dht::Did;
use crate::error::Error;
use crate::message::types::FindSuccessorReply;
use crate::message::Message;
use crate::message::MessagePayload;
use crate::ticket::Salt;
use crate::ticket::Ticket;
use crate::ticket::TicketScope;

#[test]
fn test_two_nodes_bootstrap() {
    let mut net = Network::new(2);
    // The seed told the joiner its address.
    assert_eq!(net.ring(addr(2)).node.addr, addr(2));
    assert_eq!(net.handler(addr(2)).state(), RingState::Joining);

    net.rounds(2);
    net.assert_converged();

    let (a, b) = (Node::new(addr(1)), Node::new(addr(2)));
    for (me, other) in [(a, b), (b, a)] {
        let ring = net.ring(me.addr);
        assert_eq!(ring.pred_bound(), other.id);
        assert!(ring.owns(me.id));
        assert!(!ring.owns(other.id));
        assert_eq!(net.handler(me.addr).state(), RingState::Stable);
    }
}

#[test]
fn test_five_nodes_route_to_owner() {
    let mut net = Network::new(5);
    net.rounds(30);
    net.assert_converged();

    // Every key has exactly one owner.
    for k in 0..64u32 {
        let key = Did::hash(&k.to_be_bytes());
        let owners: Vec<_> = net
            .live()
            .into_iter()
            .filter(|a| net.ring(*a).owns(key))
            .collect();
        assert_eq!(owners, vec![net.owner(key)]);
    }

    let live = net.live();
    for k in 0..40u32 {
        let key = Did::hash(format!("key-{k}").as_bytes());
        let from = live[k as usize % live.len()];
        net.delivered.clear();
        net.hops = 0;
        net.send(from, key, Bytes::from(format!("value-{k}")));

        assert_eq!(net.delivered.len(), 1, "{} lost", key);
        let (at, payload, origin) = &net.delivered[0];
        assert_eq!(*at, net.owner(key));
        assert_eq!(payload, &Bytes::from(format!("value-{k}")));
        assert_eq!(origin.addr, from);
        assert!(net.hops < live.len(), "{} hops to {}", net.hops, key);
    }
}

#[test]
fn test_departure_moves_owned_arc() {
    let mut net = Network::new(5);
    net.rounds(30);
    net.assert_converged();

    let ids = net.sorted_ids();
    let victim = net.owner(ids[2]);
    let heir = net.owner(ids[3]);
    net.kill(victim);

    net.rounds(25);
    net.assert_converged();
    let ring = net.ring(heir);
    assert_eq!(ring.pred_bound(), ids[1]);
    assert!(ring.owns(ids[2]));

    net.delivered.clear();
    net.send(net.owner(ids[0]), ids[2], Bytes::from_static(b"orphan"));
    assert_eq!(net.delivered.len(), 1);
    assert_eq!(net.delivered[0].0, heir);
}

#[test]
fn test_forged_lookup_reply_is_rejected() {
    let mut net = Network::new(3);
    net.rounds(20);
    net.assert_converged();

    let me = addr(1);
    let intruder = Node::new(addr(99));
    let before = net.ring(me).finger.len();
    let now = net.now;

    let forged = Ticket::mint(
        &Salt::from_bytes([0xee; 16]),
        now,
        &TicketScope::FindSuccessor,
    );
    let stale = Ticket::mint(&salt(1), now - TICKET_TIMEOUT_MS - 1, &TicketScope::FindSuccessor);
    for ticket in [forged, stale] {
        let reply = Message::FindSuccessorReply(FindSuccessorReply {
            ticket,
            answer: intruder.wire_addr(),
        });
        let ctx = MessagePayload::new(addr(2), now, reply);
        assert!(matches!(
            net.handler(me).handle_message(&ctx),
            Err(Error::InvalidTicket)
        ));
    }

    let ring = net.ring(me);
    assert_eq!(ring.finger.len(), before);
    assert!(ring.finger.find(intruder.id).is_none());

    // A genuine ticket is accepted and the answer gets probed.
    let genuine = Ticket::mint(&salt(1), now, &TicketScope::FindSuccessor);
    let reply = Message::FindSuccessorReply(FindSuccessorReply {
        ticket: genuine,
        answer: intruder.wire_addr(),
    });
    let ctx = MessagePayload::new(addr(2), now, reply);
    let events = net.handler(me).handle_message(&ctx).unwrap();
    assert_eq!(events.len(), 1);
    assert!(net.ring(me).finger.find(intruder.id).is_some());
}
