#![warn(missing_docs)]
//! Implementation of the ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

mod chord;
pub mod did;
/// Finger table of the ring
pub mod finger;
mod stabilization;
pub mod types;

pub use chord::PeerRing;
pub use did::Did;
pub use finger::Finger;
pub use finger::FingerHandle;
pub use finger::FingerStatus;
pub use finger::FingerTable;
pub use stabilization::FingerFix;
pub use types::Node;
pub use types::RingState;
