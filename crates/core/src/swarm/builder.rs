#![warn(missing_docs)]
//! This module provider [SwarmBuilder] and it's interface for
//! [Swarm]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chordring_transport::core::transport::TransportInterface;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::consts::DEFAULT_STABILIZE_INTERVAL;
use crate::error::Error;
use crate::error::Result;
use crate::message::MessageHandler;
use crate::swarm::callback::SharedSwarmCallback;
use crate::swarm::callback::SwarmCallback;
use crate::swarm::Swarm;
use crate::ticket::Salt;

struct DefaultCallback;
impl SwarmCallback for DefaultCallback {}

/// Creates a SwarmBuilder to configure a Swarm.
pub struct SwarmBuilder<T> {
    transport: T,
    well_known: Vec<SocketAddr>,
    external_address: Option<SocketAddr>,
    stabilize_interval: Duration,
    salt: Option<Salt>,
    callback: Option<SharedSwarmCallback>,
}

impl<T> SwarmBuilder<T>
where T: TransportInterface
{
    /// Creates new instance of [SwarmBuilder]
    pub fn new(transport: T, well_known: Vec<SocketAddr>) -> Self {
        SwarmBuilder {
            transport,
            well_known,
            external_address: None,
            stabilize_interval: Duration::from_secs(DEFAULT_STABILIZE_INTERVAL),
            salt: None,
            callback: None,
        }
    }

    /// Sets up the external address of the node.
    /// Address discovery is skipped and the node joins right away.
    pub fn external_address(mut self, external_address: SocketAddr) -> Self {
        self.external_address = Some(external_address);
        self
    }

    /// Period of stabilization and address discovery.
    pub fn stabilize_interval(mut self, interval: Duration) -> Self {
        self.stabilize_interval = interval;
        self
    }

    /// Use a known ticket salt instead of a random one.
    pub fn salt(mut self, salt: Salt) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Bind callback for Swarm.
    pub fn callback(mut self, callback: SharedSwarmCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Try build for `Swarm`.
    pub fn build(self) -> Result<Swarm<T>> {
        if self.well_known.is_empty() {
            return Err(Error::MissingWellKnownPeers);
        }

        let message_handler = match self.salt {
            Some(salt) => {
                MessageHandler::new_with_salt(salt, self.well_known, StdRng::from_entropy())
            }
            None => MessageHandler::new(self.well_known)?,
        };

        let callback = self
            .callback
            .unwrap_or_else(|| Arc::new(DefaultCallback {}));

        Ok(Swarm {
            transport: self.transport,
            message_handler: Mutex::new(message_handler),
            callback,
            external_address: self.external_address,
            period: self.stabilize_interval,
        })
    }
}
