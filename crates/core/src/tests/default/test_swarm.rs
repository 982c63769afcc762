use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chordring_transport::connections::DummyHub;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio::time::timeout;

use crate::dht::types::Node;
use crate::dht::types::RingState;
use crate::swarm::callback::CallbackError;
use crate::swarm::callback::SwarmCallback;
use crate::swarm::SwarmBuilder;

struct Recorder {
    tx: mpsc::UnboundedSender<(Bytes, Node)>,
}

#[async_trait]
impl SwarmCallback for Recorder {
    async fn on_deliver(&self, payload: &Bytes, origin: Node) -> Result<(), CallbackError> {
        self.tx.send((payload.clone(), origin)).map_err(|e| e.into())
    }
}

#[tokio::test]
async fn test_swarms_join_and_deliver() {
    let hub = DummyHub::new();
    let seed_addr = SocketAddr::from(([10, 1, 0, 1], 7000));
    let joiner_addr = SocketAddr::from(([10, 1, 0, 2], 7000));
    let period = Duration::from_millis(50);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let seed = Arc::new(
        SwarmBuilder::new(hub.bind(seed_addr).unwrap(), vec![seed_addr])
            .external_address(seed_addr)
            .stabilize_interval(period)
            .callback(Arc::new(Recorder { tx }))
            .build()
            .unwrap(),
    );
    let joiner = Arc::new(
        SwarmBuilder::new(hub.bind(joiner_addr).unwrap(), vec![seed_addr])
            .stabilize_interval(period)
            .build()
            .unwrap(),
    );
    assert_eq!(joiner.did().unwrap(), None);

    tokio::spawn(seed.clone().listen());
    tokio::spawn(joiner.clone().listen());

    timeout(Duration::from_secs(10), async {
        while seed.state().unwrap() != RingState::Stable
            || joiner.state().unwrap() != RingState::Stable
        {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("ring did not settle");

    let seed_id = seed.did().unwrap().unwrap();
    assert_eq!(joiner.did().unwrap(), Some(Node::new(joiner_addr).id));
    let inspect = joiner.inspect().unwrap();
    assert_eq!(inspect.dht.unwrap().successor, Some(seed_id.to_string()));

    joiner
        .send_data(seed_id, Bytes::from_static(b"hello"))
        .await
        .unwrap();
    let (payload, origin) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("nothing delivered")
        .unwrap();
    assert_eq!(payload, Bytes::from_static(b"hello"));
    assert_eq!(origin.addr, joiner_addr);
}
