use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::DashSet;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

use crate::core::transport::Datagram;
use crate::core::transport::TransportInterface;
use crate::core::transport::TRANSPORT_MTU;
use crate::error::Error;
use crate::error::Result;

type DatagramSender = mpsc::UnboundedSender<Datagram>;
type DatagramReceiver = mpsc::UnboundedReceiver<Datagram>;

/// An in-memory network for local testing.
/// Every [DummyTransport] bound on the same hub can reach the others, unless
/// the link between them is partitioned or the destination was dropped.
#[derive(Default)]
pub struct DummyHub {
    /// Sender of each bound address, tagged with the bind that created it.
    endpoints: DashMap<SocketAddr, (u64, DatagramSender)>,
    binds: AtomicU64,
    partitions: DashSet<(SocketAddr, SocketAddr)>,
    loss: Mutex<f64>,
}

/// [DummyTransport] is one endpoint attached to a [DummyHub].
/// Implements the [TransportInterface] trait with no real network.
pub struct DummyTransport {
    addr: SocketAddr,
    bind_id: u64,
    hub: Arc<DummyHub>,
    receiver: AsyncMutex<DatagramReceiver>,
}

impl DummyHub {
    /// Create a new, empty hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a new endpoint at `addr`.
    pub fn bind(self: &Arc<Self>, addr: SocketAddr) -> Result<DummyTransport> {
        if self.endpoints.contains_key(&addr) {
            return Err(Error::EndpointAlreadyExists(addr));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let bind_id = self.binds.fetch_add(1, Ordering::Relaxed);
        self.endpoints.insert(addr, (bind_id, tx));
        Ok(DummyTransport {
            addr,
            bind_id,
            hub: self.clone(),
            receiver: AsyncMutex::new(rx),
        })
    }

    /// Detach the endpoint at `addr`. Datagrams sent to it afterwards vanish,
    /// which is what a crashed node looks like to its peers.
    pub fn drop_endpoint(&self, addr: SocketAddr) -> Result<()> {
        self.endpoints
            .remove(&addr)
            .map(|_| ())
            .ok_or(Error::EndpointNotFound(addr))
    }

    /// Stop delivering datagrams in both directions between `a` and `b`.
    pub fn partition(&self, a: SocketAddr, b: SocketAddr) {
        self.partitions.insert((a, b));
        self.partitions.insert((b, a));
    }

    /// Undo [DummyHub::partition].
    pub fn heal(&self, a: SocketAddr, b: SocketAddr) {
        self.partitions.remove(&(a, b));
        self.partitions.remove(&(b, a));
    }

    /// Drop each datagram with the given probability.
    pub fn set_loss(&self, probability: f64) {
        if let Ok(mut loss) = self.loss.lock() {
            *loss = probability.clamp(0.0, 1.0);
        }
    }

    fn deliver(&self, source: SocketAddr, dest: SocketAddr, data: Bytes) {
        if self.partitions.contains(&(source, dest)) {
            tracing::debug!("dummy hub: link {} -> {} is partitioned", source, dest);
            return;
        }
        let loss = self.loss.lock().map(|l| *l).unwrap_or(0.0);
        if loss > 0.0 && rand::thread_rng().gen_bool(loss) {
            tracing::debug!("dummy hub: lost datagram {} -> {}", source, dest);
            return;
        }
        let Some(endpoint) = self.endpoints.get(&dest) else {
            tracing::debug!("dummy hub: no endpoint at {}", dest);
            return;
        };
        if endpoint.1.send(Datagram { source, data }).is_err() {
            tracing::debug!("dummy hub: endpoint {} is gone", dest);
        }
    }
}

#[async_trait]
impl TransportInterface for DummyTransport {
    type Error = Error;

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.addr)
    }

    async fn send_to(&self, dest: SocketAddr, data: &[u8]) -> Result<()> {
        if data.len() > TRANSPORT_MTU {
            return Err(Error::DatagramTooLarge(data.len()));
        }
        self.hub
            .deliver(self.addr, dest, Bytes::copy_from_slice(data));
        Ok(())
    }

    async fn recv_from(&self) -> Result<Datagram> {
        let mut rx = self.receiver.lock().await;
        rx.recv().await.ok_or(Error::EndpointReleased(self.addr))
    }
}

impl Drop for DummyTransport {
    fn drop(&mut self) {
        // The address may already belong to a later bind.
        self.hub
            .endpoints
            .remove_if(&self.addr, |_, (id, _)| *id == self.bind_id);
    }
}
