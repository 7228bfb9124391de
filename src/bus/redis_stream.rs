//! Redis Streams bus
//!
//! Each topic is a stream key. Publishing is `XADD` with a single `payload`
//! field. Subscribers read through one consumer group, so every message is
//! handled by one inventory instance. Entries stay in the group's pending
//! list until `XACK`; entries left pending longer than `claim_idle_ms` are
//! reclaimed with `XAUTOCLAIM` and delivered again.

use super::{BusMessage, EventPublisher, EventSubscriber};
use crate::config::{BusConfig, RedisConfig};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::streams::{StreamAutoClaimReply, StreamId, StreamReadReply};
use redis::AsyncCommands;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const PAYLOAD_FIELD: &str = "payload";

/// Headroom on top of `BLOCK` before the read connection gives up on a reply.
const READ_TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// Response timeout for the blocking read connection. The server may hand
/// out an entry at any point in the `BLOCK` window and the reply must still
/// be received, or the entry sits pending until it is reclaimed.
fn read_response_timeout(block_ms: u64) -> Duration {
    Duration::from_millis(block_ms) + READ_TIMEOUT_MARGIN
}

pub struct RedisStreamBus {
    /// Short commands (XADD, XACK, XAUTOCLAIM)
    conn: ConnectionManager,
    /// Blocking reads get their own connection so they never stall publishes
    read_conn: ConnectionManager,
    group: String,
    consumer: String,
    block_ms: u64,
    claim_idle: Duration,
    last_claim: Mutex<Option<Instant>>,
}

impl RedisStreamBus {
    pub async fn connect(redis: &RedisConfig, bus: &BusConfig) -> Result<Self> {
        let client = redis::Client::open(redis.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e)))?;
        let read_config = ConnectionManagerConfig::new()
            .set_response_timeout(Some(read_response_timeout(bus.block_ms)));
        let read_conn = ConnectionManager::new_with_config(client, read_config)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            conn,
            read_conn,
            group: bus.consumer_group.clone(),
            consumer: bus.consumer_name.clone(),
            block_ms: bus.block_ms,
            claim_idle: Duration::from_millis(bus.claim_idle_ms),
            last_claim: Mutex::new(None),
        })
    }

    /// Create the consumer group (and the stream) if it does not exist yet.
    ///
    /// The group starts at id `0` so entries published before the first
    /// subscriber came up are still delivered.
    pub async fn ensure_group(&self, topic: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let created: std::result::Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(topic)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => {
                tracing::info!(topic, group = %self.group, "Created stream consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Liveness check used by the readiness endpoint.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn claim_due(&self) -> bool {
        let mut last = self
            .last_claim
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let due = last.map_or(true, |at| at.elapsed() >= self.claim_idle);
        if due {
            *last = Some(Instant::now());
        }
        due
    }

    async fn claim_stale(&self, topic: &str, max: usize) -> Result<Vec<BusMessage>> {
        let mut conn = self.conn.clone();
        let reply: StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(topic)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(self.claim_idle.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(max)
            .query_async(&mut conn)
            .await?;

        let messages: Vec<BusMessage> = reply
            .claimed
            .into_iter()
            .map(|entry| to_message(topic, entry, true))
            .collect();

        if !messages.is_empty() {
            tracing::info!(topic, count = messages.len(), "Reclaimed stale pending entries");
        }
        Ok(messages)
    }

    async fn read_new(&self, topic: &str, max: usize) -> Result<Vec<BusMessage>> {
        let mut conn = self.read_conn.clone();
        let reply: std::result::Result<Option<StreamReadReply>, redis::RedisError> =
            redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.group)
                .arg(&self.consumer)
                .arg("COUNT")
                .arg(max)
                .arg("BLOCK")
                .arg(self.block_ms)
                .arg("STREAMS")
                .arg(topic)
                .arg(">")
                .query_async(&mut conn)
                .await;

        let reply = match reply {
            Ok(reply) => reply,
            // Only reachable once BLOCK has elapsed on the server, so nothing was handed out.
            Err(e) if e.is_timeout() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(reply
            .map(|r| {
                r.keys
                    .into_iter()
                    .flat_map(|key| key.ids)
                    .map(|entry| to_message(topic, entry, false))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Convert a stream entry into a bus message.
///
/// A missing or non-binary `payload` field becomes an empty payload; the
/// handler treats that as malformed and acknowledges it.
fn to_message(topic: &str, entry: StreamId, redelivered: bool) -> BusMessage {
    let payload: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_default();
    BusMessage {
        id: entry.id,
        topic: topic.to_string(),
        payload,
        redelivered,
    }
}

#[async_trait]
impl EventPublisher for RedisStreamBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        let id: String = conn.xadd(topic, "*", &[(PAYLOAD_FIELD, payload)]).await?;
        tracing::debug!(topic, id = %id, "Published stream entry");
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for RedisStreamBus {
    async fn fetch(&self, topic: &str, max: usize) -> Result<Vec<BusMessage>> {
        if self.claim_due() {
            let reclaimed = self.claim_stale(topic, max).await?;
            if !reclaimed.is_empty() {
                return Ok(reclaimed);
            }
        }
        self.read_new(topic, max).await
    }

    async fn ack(&self, message: &BusMessage) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .xack(&message.topic, &self.group, &[&message.id])
            .await?;
        Ok(())
    }

    async fn release(&self, message: &BusMessage) -> Result<()> {
        // Unacked entries stay pending; the next XAUTOCLAIM past the idle
        // threshold hands them out again.
        tracing::debug!(topic = %message.topic, id = %message.id, "Leaving entry pending for redelivery");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(id: &str, fields: Vec<(&str, redis::Value)>) -> StreamId {
        StreamId {
            id: id.to_string(),
            map: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
            ..Default::default()
        }
    }

    #[test]
    fn test_to_message_reads_payload_field() {
        let e = entry(
            "1700000000000-0",
            vec![(PAYLOAD_FIELD, redis::Value::BulkString(b"{\"a\":1}".to_vec()))],
        );
        let message = to_message("order.created", e, false);

        assert_eq!(message.id, "1700000000000-0");
        assert_eq!(message.topic, "order.created");
        assert_eq!(message.payload, b"{\"a\":1}");
        assert!(!message.redelivered);
    }

    #[test]
    fn test_to_message_missing_payload_is_empty() {
        let e = entry(
            "1-0",
            vec![("other", redis::Value::BulkString(b"x".to_vec()))],
        );
        let message = to_message("order.created", e, true);

        assert!(message.payload.is_empty());
        assert!(message.redelivered);
    }

    #[test]
    fn test_read_timeout_outlasts_block() {
        for block_ms in [0, 500, 5000, 60_000] {
            assert!(read_response_timeout(block_ms) > Duration::from_millis(block_ms));
        }
    }

    /// Split complete RESP command arrays off the front of `buf`.
    fn take_commands(buf: &mut Vec<u8>) -> Vec<Vec<String>> {
        fn line(buf: &[u8], at: usize) -> Option<(String, usize)> {
            let end = buf[at..].windows(2).position(|w| w == b"\r\n")? + at;
            Some((String::from_utf8_lossy(&buf[at..end]).into_owned(), end + 2))
        }
        fn command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
            let (head, mut at) = line(buf, 0)?;
            let count: usize = head.strip_prefix('*')?.parse().ok()?;
            let mut args = Vec::with_capacity(count);
            for _ in 0..count {
                let (len, next) = line(buf, at)?;
                let len: usize = len.strip_prefix('$')?.parse().ok()?;
                if buf.len() < next + len + 2 {
                    return None;
                }
                args.push(String::from_utf8_lossy(&buf[next..next + len]).into_owned());
                at = next + len + 2;
            }
            Some((args, at))
        }

        let mut commands = Vec::new();
        while let Some((args, used)) = command(buf) {
            buf.drain(..used);
            commands.push(args);
        }
        commands
    }

    /// Minimal RESP server that answers XREADGROUP with one entry after `reply_after`.
    async fn slow_stream_server(reply_after: Duration) -> u16 {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        for args in take_commands(&mut buf) {
                            let reply: &[u8] = match args[0].to_ascii_uppercase().as_str() {
                                "XREADGROUP" => {
                                    tokio::time::sleep(reply_after).await;
                                    b"*1\r\n*2\r\n$13\r\norder.created\r\n*1\r\n*2\r\n$3\r\n1-0\r\n*2\r\n$7\r\npayload\r\n$2\r\nhi\r\n"
                                }
                                "XAUTOCLAIM" => b"*3\r\n$3\r\n0-0\r\n*0\r\n*0\r\n",
                                _ => b"+OK\r\n",
                            };
                            if socket.write_all(reply).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn test_entry_delivered_late_in_block_window_is_received() {
        let port = slow_stream_server(Duration::from_millis(1500)).await;
        let redis = RedisConfig {
            url: format!("redis://127.0.0.1:{}", port),
        };
        let bus_config = BusConfig {
            block_ms: 5000,
            ..BusConfig::default()
        };
        let bus = RedisStreamBus::connect(&redis, &bus_config).await.unwrap();

        let messages = bus.fetch("order.created", 10).await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "1-0");
        assert_eq!(messages[0].payload, b"hi");
        assert!(!messages[0].redelivered);
    }
}
