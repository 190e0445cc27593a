//! Pub/sub transport over Redis channels
//!
//! The database setting has the form `<topic>@<broker>[,<broker>...]`. Each
//! flush is published to the channel named by the topic on the first broker
//! that accepts it. Publishing runs on a spawned task so a slow or dead broker
//! never holds up the report cycle; failures only reach the log. Publishes
//! still in flight are kept so shutdown can wait for them with [`PubSubSender::drain`].

use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::{Config, Pool, PoolConfig, Runtime, Timeouts};
use tokio::task::JoinHandle;

use super::error::SendError;

pub struct PubSubSender {
    topic: String,
    brokers: Arc<Vec<Broker>>,
    in_flight: Vec<JoinHandle<()>>,
}

struct Broker {
    display_url: String,
    pool: Pool,
}

impl PubSubSender {
    pub fn new(database: &str, timeout: Duration) -> Result<Self, SendError> {
        let (topic, hosts) = parse_destination(database)?;

        let brokers = hosts
            .iter()
            .map(|host| {
                let url = broker_url(host);
                let display_url = sanitize_redis_url(&url);
                let mut config = Config::from_url(url);
                config.pool = Some(PoolConfig {
                    max_size: 2,
                    timeouts: Timeouts {
                        wait: Some(timeout),
                        create: Some(timeout),
                        recycle: Some(timeout),
                    },
                    ..Default::default()
                });
                let pool = config.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
                    SendError::Config(format!("Failed to create Redis pool for {display_url}: {e}"))
                })?;
                Ok(Broker { display_url, pool })
            })
            .collect::<Result<Vec<_>, SendError>>()?;

        tracing::debug!(
            topic = %topic,
            brokers = brokers.len(),
            "Pub/sub sender ready"
        );

        Ok(Self {
            topic,
            brokers: Arc::new(brokers),
            in_flight: Vec::new(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publishes spawned but not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.iter().filter(|h| !h.is_finished()).count()
    }

    /// Queue the payload for publishing and return immediately
    pub fn send(&mut self, payload: Vec<u8>) -> u16 {
        let topic = self.topic.clone();
        let brokers = Arc::clone(&self.brokers);

        self.in_flight.retain(|h| !h.is_finished());
        let handle = tokio::spawn(async move {
            for broker in brokers.iter() {
                match publish(&broker.pool, &topic, &payload).await {
                    Ok(receivers) => {
                        tracing::debug!(
                            topic = %topic,
                            broker = %broker.display_url,
                            receivers,
                            bytes = payload.len(),
                            "Published metrics"
                        );
                        return;
                    }
                    Err(e) => {
                        tracing::debug!(
                            topic = %topic,
                            broker = %broker.display_url,
                            error = %e,
                            "Publish failed, trying next broker"
                        );
                    }
                }
            }
            tracing::warn!(
                topic = %topic,
                "Unable to publish metrics to any broker. Discarding data."
            );
        });
        self.in_flight.push(handle);
        0
    }

    /// Wait for every queued publish to finish
    pub async fn drain(&mut self) {
        let pending = std::mem::take(&mut self.in_flight);
        if pending.is_empty() {
            return;
        }
        tracing::debug!(count = pending.len(), topic = %self.topic, "Waiting for pending publishes");
        for result in futures::future::join_all(pending).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, topic = %self.topic, "Publish task ended abnormally");
            }
        }
    }
}

async fn publish(pool: &Pool, channel: &str, payload: &[u8]) -> Result<i64, SendError> {
    let mut conn = pool.get().await?;
    let receivers: i64 = deadpool_redis::redis::cmd("PUBLISH")
        .arg(channel)
        .arg(payload)
        .query_async(&mut conn)
        .await?;
    Ok(receivers)
}

/// Split `topic@host1,host2` into the topic and its broker list
fn parse_destination(database: &str) -> Result<(String, Vec<String>), SendError> {
    let invalid = || {
        SendError::Config(format!(
            "invalid database format: {}, expected: topic@host1,host2...",
            database
        ))
    };

    let (topic, hosts) = database.split_once('@').ok_or_else(invalid)?;
    let hosts: Vec<String> = hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect();
    if topic.is_empty() || hosts.is_empty() {
        return Err(invalid());
    }
    Ok((topic.to_string(), hosts))
}

fn broker_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("redis://{host}")
    }
}

/// Mask the password of a Redis URL for logging
fn sanitize_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':') {
            let abs_colon = scheme_end + colon_pos;
            return format!("{}***{}", &url[..abs_colon + 1], &url[at_pos..]);
        }
    }
    url.to_string()
}
