#![warn(missing_docs)]

use crate::dht::types::WireAddr;
use crate::error::Result;
use crate::message::types::AddrDiscover;
use crate::message::types::AddrDiscoverReply;
use crate::message::types::Message;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::MessagePayload;
use crate::ticket::TicketScope;

impl HandleMsg<AddrDiscover> for MessageHandler {
    fn handle(
        &mut self,
        ctx: &MessagePayload,
        msg: &AddrDiscover,
    ) -> Result<Vec<MessageHandlerEvent>> {
        Ok(vec![MessageHandlerEvent::Send(
            Message::AddrDiscoverReply(AddrDiscoverReply {
                ticket: msg.ticket,
                addr: WireAddr::from(ctx.from),
            }),
            ctx.from,
        )])
    }
}

impl HandleMsg<AddrDiscoverReply> for MessageHandler {
    fn handle(
        &mut self,
        ctx: &MessagePayload,
        msg: &AddrDiscoverReply,
    ) -> Result<Vec<MessageHandlerEvent>> {
        self.verify(&msg.ticket, ctx.now, TicketScope::AddrDiscover { to: ctx.from })?;
        if self.dht().is_some() {
            tracing::debug!("address already known, ignore reply from {}", ctx.from);
            return Ok(vec![]);
        }
        Ok(self.init(msg.addr.into()))
    }
}
