#![warn(missing_docs)]
//! Event loop of a node.
//!
//! A [Swarm] owns one transport endpoint and the [MessageHandler]. Its `listen` task
//! races inbound datagrams against the discovery and stabilization timers, hands
//! each to the handler and executes the [MessageHandlerEvent]s that come back.

mod builder;
/// Callback interface for swarm
pub mod callback;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use bytes::Bytes;
pub use builder::SwarmBuilder;
use chordring_transport::core::transport::Datagram;
use chordring_transport::core::transport::TransportInterface;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;

use crate::dht::types::RingState;
use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::SwarmInspect;
use crate::message::Decoder;
use crate::message::Encoder;
use crate::message::Message;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::MessagePayload;
use crate::swarm::callback::SharedSwarmCallback;
use crate::utils::get_epoch_ms;

/// The transport and dht management.
pub struct Swarm<T> {
    pub(crate) transport: T,
    message_handler: Mutex<MessageHandler>,
    callback: SharedSwarmCallback,
    external_address: Option<SocketAddr>,
    period: Duration,
}

/// Timers owned by the listening task.
#[derive(Default)]
struct Timers {
    discovery: Option<Interval>,
    stabilization: Option<Interval>,
}

fn interval(period: Duration) -> Interval {
    let mut i = tokio::time::interval(period);
    i.set_missed_tick_behavior(MissedTickBehavior::Delay);
    i
}

/// Wait for the next tick, or forever when the timer is off.
async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(i) => {
            i.tick().await;
        }
        None => futures::future::pending::<()>().await,
    }
}

impl<T> Swarm<T>
where
    T: TransportInterface + Send + Sync + 'static,
{
    fn handler(&self) -> Result<MutexGuard<'_, MessageHandler>> {
        self.message_handler.lock().map_err(|_| Error::HandlerLock)
    }

    /// Get did of self, once the own address is known.
    pub fn did(&self) -> Result<Option<Did>> {
        Ok(self.handler()?.dht().map(|d| d.did()))
    }

    /// Life cycle state of the node.
    pub fn state(&self) -> Result<RingState> {
        Ok(self.handler()?.state())
    }

    /// Local address of the transport.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport
            .local_addr()
            .map_err(|e| Error::Transport(e.to_string()))
    }

    /// Check the status of swarm
    pub fn inspect(&self) -> Result<SwarmInspect> {
        let handler = self.handler()?;
        Ok(SwarmInspect::inspect(&handler))
    }

    /// Route `payload` to the node owning `target`.
    pub async fn send_data(&self, target: Did, payload: Bytes) -> Result<()> {
        let events = self.handler()?.send_data(target, payload)?;
        self.handle_message_handler_events(events, None).await;
        Ok(())
    }

    /// Decode and handle one datagram.
    fn handle_datagram(&self, datagram: Datagram) -> Vec<MessageHandlerEvent> {
        let msg = match Message::decode(&datagram.data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("drop undecodable datagram from {}: {}", datagram.source, e);
                return vec![];
            }
        };
        let payload = MessagePayload::new(datagram.source, get_epoch_ms(), msg);
        let result = self
            .handler()
            .and_then(|mut h| h.handle_message(&payload));
        match result {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    "drop {} from {}: {}",
                    payload.data.message_type(),
                    payload.from,
                    e
                );
                vec![]
            }
        }
    }

    /// Event handler of Swarm.
    async fn handle_message_handler_event(
        &self,
        event: MessageHandlerEvent,
        timers: &mut Option<&mut Timers>,
    ) {
        tracing::trace!("handle message handler event: {:?}", event);
        match event {
            MessageHandlerEvent::Send(msg, dest) => {
                let bytes = match msg.encode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!("failed to encode {}: {}", msg, e);
                        return;
                    }
                };
                if let Err(e) = self.transport.send_to(dest, &bytes).await {
                    tracing::error!("failed to send {} to {}: {}", msg, dest, e);
                }
            }
            MessageHandlerEvent::Deliver(payload, origin) => {
                if let Err(e) = self.callback.on_deliver(&payload, origin).await {
                    tracing::warn!("deliver callback failed: {}", e);
                }
            }
            MessageHandlerEvent::UpdateRange(pred_bound, me) => {
                tracing::debug!("owned arc is ({}, {}]", pred_bound, me);
                if let Err(e) = self.callback.on_range_update(pred_bound, me).await {
                    tracing::warn!("range update callback failed: {}", e);
                }
            }
            MessageHandlerEvent::StateChange(state) => {
                if let Err(e) = self.callback.on_state_change(state).await {
                    tracing::warn!("state change callback failed: {}", e);
                }
            }
            MessageHandlerEvent::CancelDiscovery => {
                if let Some(t) = timers {
                    if t.discovery.take().is_some() {
                        tracing::debug!("address discovery cancelled");
                    }
                }
            }
            MessageHandlerEvent::ArmStabilization => {
                if let Some(t) = timers {
                    if t.stabilization.is_none() {
                        t.stabilization = Some(interval(self.period));
                    }
                }
            }
        }
    }

    /// Batch handle events
    async fn handle_message_handler_events(
        &self,
        events: Vec<MessageHandlerEvent>,
        mut timers: Option<&mut Timers>,
    ) {
        for ev in events {
            self.handle_message_handler_event(ev, &mut timers).await;
        }
    }

    /// Listener for native envirement, It will just launch a loop.
    ///
    /// Returns only when the transport fails to receive.
    pub async fn listen(self: Arc<Self>) -> Result<()> {
        let mut timers = Timers::default();

        let boot = match self.external_address {
            Some(addr) => self.handler()?.init(addr),
            None => {
                timers.discovery = Some(interval(self.period));
                vec![]
            }
        };
        self.handle_message_handler_events(boot, Some(&mut timers))
            .await;

        loop {
            let events = tokio::select! {
                received = self.transport.recv_from() => match received {
                    Ok(datagram) => self.handle_datagram(datagram),
                    Err(e) => {
                        tracing::error!("transport failed to receive: {}", e);
                        return Err(Error::Transport(e.to_string()));
                    }
                },
                _ = tick(&mut timers.discovery) => {
                    tracing::info!("discovering own address");
                    let events = self.handler()?.discover(get_epoch_ms());
                    events
                },
                _ = tick(&mut timers.stabilization) => {
                    let result = self.handler()?.stabilize(get_epoch_ms());
                    result.unwrap_or_else(|e| {
                        tracing::warn!("stabilization failed: {}", e);
                        vec![]
                    })
                },
            };
            self.handle_message_handler_events(events, Some(&mut timers))
                .await;
        }
    }
}
