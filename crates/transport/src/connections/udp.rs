use std::net::IpAddr;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::core::transport::Datagram;
use crate::core::transport::TransportInterface;
use crate::core::transport::TRANSPORT_MTU;
use crate::error::Error;
use crate::error::Result;

/// [UdpTransport] sends and receives datagrams over a single bound UDP socket.
/// One socket serves exactly one ring node.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a new socket on `addr`.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        tracing::info!("udp transport listening on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    /// Wrap an already bound tokio socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl TransportInterface for UdpTransport {
    type Error = Error;

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    async fn send_to(&self, dest: SocketAddr, data: &[u8]) -> Result<()> {
        if data.len() > TRANSPORT_MTU {
            return Err(Error::DatagramTooLarge(data.len()));
        }
        // A dual-stack socket reaches IPv4 peers through their mapped form.
        let dest = match (self.socket.local_addr()?, dest) {
            (SocketAddr::V6(_), SocketAddr::V4(v4)) => {
                SocketAddr::new(IpAddr::V6(v4.ip().to_ipv6_mapped()), v4.port())
            }
            _ => dest,
        };
        self.socket.send_to(data, dest).await?;
        Ok(())
    }

    async fn recv_from(&self) -> Result<Datagram> {
        let mut buf = vec![0u8; TRANSPORT_MTU];
        let (len, source) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok(Datagram {
            source: SocketAddr::new(source.ip().to_canonical(), source.port()),
            data: Bytes::from(buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_loopback() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        a.send_to(b.local_addr().unwrap(), b"hello").await.unwrap();
        let got = b.recv_from().await.unwrap();

        assert_eq!(got.source, a.local_addr().unwrap());
        assert_eq!(&got.data[..], b"hello");
    }

    #[tokio::test]
    async fn test_udp_rejects_oversized_datagram() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let data = vec![0u8; TRANSPORT_MTU + 1];
        assert!(matches!(
            a.send_to(a.local_addr().unwrap(), &data).await,
            Err(Error::DatagramTooLarge(_))
        ));
    }
}
