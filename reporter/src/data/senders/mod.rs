//! Senders: buffered batches plus the transport that ships them
//!
//! Every sender owns a [`WriteBatch`] and a [`LineProtocolSerializer`]. The
//! transport is picked once from configuration:
//!
//! - `http` - POST to the InfluxDB `/write` endpoint
//! - `tcp` / `udp` - raw line protocol to a socket listener
//! - `logger` - line protocol written to the log
//! - `pubsub` - line protocol published to a Redis channel

mod error;
mod http;
mod log;
mod pubsub;
mod tcp;
mod udp;

pub use error::SendError;
pub use http::HttpSender;
pub use log::LogSender;
pub use pubsub::PubSubSender;
pub use tcp::TcpSender;
pub use udp::UdpSender;

use crate::core::config::{SenderConfig, SenderKind};
use crate::data::batch::WriteBatch;
use crate::data::line_protocol::LineProtocolSerializer;
use crate::data::point::{Point, Tags};

pub enum Transport {
    Http(HttpSender),
    Tcp(TcpSender),
    Udp(UdpSender),
    Log(LogSender),
    PubSub(PubSubSender),
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Http(_) => "http",
            Transport::Tcp(_) => "tcp",
            Transport::Udp(_) => "udp",
            Transport::Log(_) => "logger",
            Transport::PubSub(_) => "pubsub",
        }
    }
}

/// Batch buffer plus transport
pub struct InfluxSender {
    batch: WriteBatch,
    serializer: LineProtocolSerializer,
    group_measurement: Option<String>,
    transport: Transport,
}

impl InfluxSender {
    pub fn new(
        batch: WriteBatch,
        serializer: LineProtocolSerializer,
        group_measurement: Option<String>,
        transport: Transport,
    ) -> Self {
        Self {
            batch,
            serializer,
            group_measurement,
            transport,
        }
    }

    /// Build the sender described by `config`
    pub fn from_config(config: &SenderConfig) -> Result<Self, SendError> {
        let transport = match config.kind {
            SenderKind::Http => Transport::Http(HttpSender::new(config)?),
            SenderKind::Tcp => Transport::Tcp(TcpSender::new(
                config.host.clone(),
                config.port,
                config.read_timeout,
            )),
            SenderKind::Udp => Transport::Udp(UdpSender::new(
                config.host.clone(),
                config.port,
                config.read_timeout,
            )),
            SenderKind::Logger => Transport::Log(LogSender::new(config.database.clone())),
            SenderKind::PubSub => {
                Transport::PubSub(PubSubSender::new(&config.database, config.read_timeout)?)
            }
        };

        tracing::debug!(
            transport = transport.name(),
            database = %config.database,
            precision = %config.precision,
            grouped = config.group_measurement.is_some(),
            "Sender initialized"
        );

        Ok(Self::new(
            WriteBatch::new(config.database.clone(), config.precision),
            LineProtocolSerializer::new(config.prefix.clone()),
            config.group_measurement.clone(),
            transport,
        ))
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn batch(&self) -> &WriteBatch {
        &self.batch
    }

    pub fn flush(&mut self) {
        self.batch.flush();
    }

    pub fn has_series_data(&self) -> bool {
        !self.batch.is_empty()
    }

    pub fn append_point(&mut self, point: Point) -> bool {
        self.batch.append_point(point)
    }

    pub fn set_tags(&mut self, tags: Tags) {
        self.batch.set_tags(tags);
    }

    pub fn tags(&self) -> &Tags {
        self.batch.tags()
    }

    /// Line protocol for the current batch
    pub fn render(&self) -> String {
        match &self.group_measurement {
            Some(group) => self.serializer.serialize_grouped(&self.batch, group),
            None => self.serializer.serialize(&self.batch),
        }
    }

    /// Ship the current batch; returns the transport status (HTTP code or 0)
    pub async fn write_data(&mut self) -> Result<u16, SendError> {
        let body = self.render();
        match &mut self.transport {
            Transport::Http(sender) => sender.send(body).await,
            Transport::Tcp(sender) => sender.send(body.as_bytes()).await,
            Transport::Udp(sender) => sender.send(body.as_bytes()).await,
            Transport::Log(sender) => Ok(sender.send(&body)),
            Transport::PubSub(sender) => Ok(sender.send(body.into_bytes())),
        }
    }

    /// Wait for transport work still running after `write_data` returned
    pub async fn drain(&mut self) {
        if let Transport::PubSub(sender) = &mut self.transport {
            sender.drain().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::point::Fields;
    use crate::utils::time::TimeUnit;
    use tokio::io::AsyncReadExt;

    fn config(kind: SenderKind) -> SenderConfig {
        SenderConfig {
            kind,
            database: "metrics".to_string(),
            precision: TimeUnit::Milliseconds,
            ..SenderConfig::default()
        }
    }

    fn point(measurement: &str, value: i64, ts: i64) -> Point {
        Point::new(measurement, Fields::from([("value".to_string(), value.into())]))
            .with_timestamp(ts)
    }

    #[test]
    fn test_from_config_picks_transport() {
        assert_eq!(
            InfluxSender::from_config(&config(SenderKind::Http)).unwrap().transport_name(),
            "http"
        );
        assert_eq!(
            InfluxSender::from_config(&config(SenderKind::Tcp)).unwrap().transport_name(),
            "tcp"
        );
        assert_eq!(
            InfluxSender::from_config(&config(SenderKind::Udp)).unwrap().transport_name(),
            "udp"
        );
        assert_eq!(
            InfluxSender::from_config(&config(SenderKind::Logger)).unwrap().transport_name(),
            "logger"
        );
    }

    #[test]
    fn test_pubsub_requires_topic_destination() {
        let result = InfluxSender::from_config(&config(SenderKind::PubSub));
        assert!(matches!(result, Err(SendError::Config(_))));
    }

    #[test]
    fn test_buffer_contract() {
        let mut sender = InfluxSender::from_config(&config(SenderKind::Logger)).unwrap();
        assert!(!sender.has_series_data());
        assert!(sender.append_point(point("a", 1, 0)));
        assert!(!sender.append_point(point("a", 1, 0)));
        assert!(sender.has_series_data());
        sender.flush();
        assert!(!sender.has_series_data());

        sender.set_tags(Tags::from([("env".to_string(), "test".to_string())]));
        assert_eq!(sender.tags().get("env").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_render_uses_prefix_and_group() {
        let mut cfg = config(SenderKind::Logger);
        cfg.prefix = "app.".to_string();
        cfg.group_measurement = Some("all".to_string());
        let mut sender = InfluxSender::from_config(&cfg).unwrap();
        sender.append_point(point("jvm.heap", 5, 1_000));
        sender.append_point(point("jvm.threads", 2, 1_000));
        assert_eq!(sender.render(), "app.all heap.value=5,threads.value=2 1000\n");
    }

    #[tokio::test]
    async fn test_pubsub_write_returns_early_and_drain_waits() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut cfg = config(SenderKind::PubSub);
        cfg.database = format!("metrics@127.0.0.1:{port}");
        cfg.read_timeout = std::time::Duration::from_millis(200);
        let mut sender = InfluxSender::from_config(&cfg).unwrap();
        sender.append_point(point("cpu", 3, 2_000));
        assert_eq!(sender.write_data().await.unwrap(), 0);

        tokio::time::timeout(std::time::Duration::from_secs(5), sender.drain())
            .await
            .unwrap();
        match &sender.transport {
            Transport::PubSub(pubsub) => assert_eq!(pubsub.in_flight(), 0),
            _ => panic!("expected pubsub transport"),
        }
    }

    #[tokio::test]
    async fn test_write_data_over_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let mut cfg = config(SenderKind::Tcp);
        cfg.host = "127.0.0.1".to_string();
        cfg.port = port;
        let mut sender = InfluxSender::from_config(&cfg).unwrap();
        sender.append_point(point("cpu", 3, 2_000));
        assert_eq!(sender.write_data().await.unwrap(), 0);
        drop(sender);

        assert_eq!(server.await.unwrap(), "cpu value=3 2000\n");
    }
}
