//! UDP transport: one datagram per flush, no retry

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use super::error::SendError;

pub struct UdpSender {
    host: String,
    port: u16,
    timeout: Duration,
    socket: Option<(UdpSocket, SocketAddr)>,
}

impl UdpSender {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            socket: None,
        }
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<u16, SendError> {
        let timeout = self.timeout;
        let target = self.target();
        let (socket, addr) = self.socket().await?;

        match tokio::time::timeout(timeout, socket.send_to(payload, *addr)).await {
            Ok(result) => {
                result?;
                Ok(0)
            }
            Err(_) => Err(SendError::Timeout {
                target,
                timeout_ms: timeout.as_millis(),
            }),
        }
    }

    async fn socket(&mut self) -> Result<&(UdpSocket, SocketAddr), SendError> {
        if self.socket.is_none() {
            let target = self.target();
            let addr = tokio::net::lookup_host((self.host.as_str(), self.port))
                .await
                .map_err(|source| SendError::Connect {
                    target: target.clone(),
                    source,
                })?
                .next()
                .ok_or_else(|| SendError::Connect {
                    target: target.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no address resolved"),
                })?;

            let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            let socket = UdpSocket::bind(local).await?;
            tracing::debug!(target_addr = %addr, "UDP sender socket bound");
            self.socket = Some((socket, addr));
        }

        self.socket
            .as_ref()
            .ok_or_else(|| SendError::Io(io::Error::from(io::ErrorKind::NotConnected)))
    }
}
