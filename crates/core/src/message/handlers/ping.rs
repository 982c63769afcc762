#![warn(missing_docs)]

use crate::error::Error;
use crate::error::Result;
use crate::message::types::Message;
use crate::message::types::Ping;
use crate::message::types::Pong;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::MessagePayload;
use crate::ticket::TicketScope;

impl HandleMsg<Ping> for MessageHandler {
    fn handle(&mut self, ctx: &MessagePayload, msg: &Ping) -> Result<Vec<MessageHandlerEvent>> {
        let sender = ctx.from_node();
        let dht = self.ring()?;
        let me = dht.did();
        let is_new = matches!(dht.finger.insert(sender), Some((_, true)));
        let closer = dht
            .predecessor()
            .map(|p| sender.id.is_strictly_between(p.id, me))
            .unwrap_or(true);

        let mut events = vec![];
        if is_new && closer {
            tracing::debug!("{} may be our predecessor, ping back", sender);
            events.push(self.ping(sender.addr, ctx.now));
        }
        events.push(MessageHandlerEvent::Send(
            Message::Pong(Pong {
                ticket: msg.ticket,
                time: msg.time,
            }),
            ctx.from,
        ));
        Ok(events)
    }
}

impl HandleMsg<Pong> for MessageHandler {
    fn handle(&mut self, ctx: &MessagePayload, msg: &Pong) -> Result<Vec<MessageHandlerEvent>> {
        self.verify(&msg.ticket, ctx.now, TicketScope::Ping {
            to: ctx.from,
            time: msg.time,
        })?;

        let sender = ctx.from_node();
        let dht = self.ring()?;
        let h = match dht.finger.find(sender.id) {
            Some(h) => h,
            None => dht.finger.insert(sender).ok_or(Error::FingerError)?.0,
        };
        let f = dht.finger.get_mut(h).ok_or(Error::FingerError)?;
        f.npings = 0;
        f.rtt.update(ctx.now.saturating_sub(msg.time));

        match dht.activate(h) {
            Some(bound) => Ok(vec![MessageHandlerEvent::UpdateRange(bound, dht.did())]),
            None => Ok(vec![]),
        }
    }
}
