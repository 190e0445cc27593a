//! TCP transport: persistent, lazily connected socket

use std::io;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::error::SendError;
use crate::core::constants::TCP_WRITE_ATTEMPTS;

pub struct TcpSender {
    host: String,
    port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpSender {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            stream: None,
        }
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Write the payload, reconnecting between attempts.
    ///
    /// After the last failed attempt the socket is dropped so the next cycle
    /// starts from a fresh connection.
    pub async fn send(&mut self, payload: &[u8]) -> Result<u16, SendError> {
        self.connect(false).await?;

        let mut last_error = None;
        for attempt in 1..=TCP_WRITE_ATTEMPTS {
            match self.write(payload).await {
                Ok(()) => return Ok(0),
                Err(e) => {
                    tracing::debug!(
                        target_addr = %self.target(),
                        attempt,
                        error = %e,
                        "TCP write failed"
                    );
                    last_error = Some(e);
                    if attempt < TCP_WRITE_ATTEMPTS {
                        self.connect(true).await?;
                    }
                }
            }
        }

        self.stream = None;
        Err(last_error.unwrap_or_else(|| SendError::Config("no TCP write attempts".to_string())))
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), SendError> {
        let target = self.target();
        let timeout = self.timeout;
        let Some(stream) = self.stream.as_mut() else {
            return Err(SendError::Io(io::Error::from(io::ErrorKind::NotConnected)));
        };

        let write = async {
            stream.write_all(payload).await?;
            stream.flush().await
        };
        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result.map_err(SendError::Io),
            Err(_) => Err(SendError::Timeout {
                target,
                timeout_ms: timeout.as_millis(),
            }),
        }
    }

    async fn connect(&mut self, force: bool) -> Result<(), SendError> {
        if !force && self.stream.is_some() {
            return Ok(());
        }
        if let Some(mut old) = self.stream.take() {
            let _ = old.shutdown().await;
        }

        let target = self.target();
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let stream = match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(SendError::Connect { target, source }),
            Err(_) => {
                return Err(SendError::Connect {
                    target,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        tracing::debug!(target_addr = %target, "TCP sender connected");
        self.stream = Some(stream);
        Ok(())
    }
}
