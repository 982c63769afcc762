//! The main concept of this mod is:
//!
//! The [TransportInterface](transport::TransportInterface) trait defines how to
//! send a datagram to a remote socket address and how to wait for the next
//! inbound datagram. It should be implemented for each transport, see the
//! [crate::connections] module.

pub mod transport;
