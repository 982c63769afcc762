use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::dht::types::Node;
use crate::dht::types::RingState;
use crate::dht::Did;

/// Error returned by callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// The [Swarm](super::Swarm) will accept shared [SwarmCallback] trait object.
pub type SharedSwarmCallback = Arc<dyn SwarmCallback + Send + Sync>;

/// Any object that implements this trait can be used as a callback for the swarm.
#[async_trait]
pub trait SwarmCallback {
    /// This method is invoked when data addressed to a key this node owns arrives.
    async fn on_deliver(&self, _payload: &Bytes, _origin: Node) -> Result<(), CallbackError> {
        Ok(())
    }

    /// This method is invoked when the owned arc becomes `(pred_bound, me]`.
    async fn on_range_update(&self, _pred_bound: Did, _me: Did) -> Result<(), CallbackError> {
        Ok(())
    }

    /// This method is invoked when the node changes its [RingState].
    async fn on_state_change(&self, _state: RingState) -> Result<(), CallbackError> {
        Ok(())
    }
}
