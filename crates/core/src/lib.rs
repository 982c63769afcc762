#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
pub mod consts;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod measure;
pub mod message;
pub mod swarm;
pub mod ticket;
pub mod utils;

#[cfg(test)]
mod tests;

pub use chordring_transport as transport;
