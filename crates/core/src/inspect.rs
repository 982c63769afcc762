#![allow(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use crate::dht::types::RingState;
use crate::dht::FingerStatus;
use crate::dht::PeerRing;
use crate::message::MessageHandler;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmInspect {
    pub state: RingState,
    #[serde(default)]
    pub dht: Option<DHTInspect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DHTInspect {
    pub did: String,
    pub addr: String,
    pub pred_bound: String,
    #[serde(default)]
    pub successor: Option<String>,
    #[serde(default)]
    pub predecessor: Option<String>,
    pub finger_table: Vec<FingerInspect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerInspect {
    pub did: String,
    pub addr: String,
    pub status: FingerStatus,
    pub npings: u32,
    #[serde(default)]
    pub rtt: Option<f64>,
}

impl SwarmInspect {
    pub fn inspect(handler: &MessageHandler) -> Self {
        Self {
            state: handler.state(),
            dht: handler.dht().map(DHTInspect::inspect),
        }
    }
}

impl DHTInspect {
    pub fn inspect(dht: &PeerRing) -> Self {
        let finger_table = dht
            .finger
            .iter()
            .map(|(_, f)| FingerInspect {
                did: f.node.id.to_string(),
                addr: f.node.addr.to_string(),
                status: f.status,
                npings: f.npings,
                rtt: f.rtt.avg(),
            })
            .collect();

        Self {
            did: dht.did().to_string(),
            addr: dht.node.addr.to_string(),
            pred_bound: dht.pred_bound().to_string(),
            successor: dht.successor().map(|n| n.id.to_string()),
            predecessor: dht.predecessor().map(|n| n.id.to_string()),
            finger_table,
        }
    }
}
