//! Default using `UdpTransport` for native environment.
//! Also provide a `DummyTransport` for testing.

#[cfg(feature = "dummy")]
mod dummy;
#[cfg(feature = "native-udp")]
mod udp;

#[cfg(feature = "dummy")]
pub use crate::connections::dummy::DummyHub;
#[cfg(feature = "dummy")]
pub use crate::connections::dummy::DummyTransport;
#[cfg(feature = "native-udp")]
pub use crate::connections::udp::UdpTransport;
