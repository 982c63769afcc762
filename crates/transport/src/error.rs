#![allow(missing_docs)]

use std::net::SocketAddr;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Datagram of {0} bytes exceeds the transport MTU")]
    DatagramTooLarge(usize),

    #[error("Endpoint {0} already exists")]
    EndpointAlreadyExists(SocketAddr),

    #[error("Endpoint {0} not found")]
    EndpointNotFound(SocketAddr),

    #[error("Endpoint {0} is released")]
    EndpointReleased(SocketAddr),
}
