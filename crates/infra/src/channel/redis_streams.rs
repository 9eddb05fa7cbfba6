//! Redis Streams-backed sale channel (durable, at-least-once delivery).
//!
//! Fan-out is modelled as one stream per queue: publishing XADDs the payload
//! to every queue's stream, binding a queue creates a consumer group on its
//! stream. An unacknowledged delivery stays in the consumer's pending entry
//! list and is re-read before new entries on the next `recv`, which is what
//! makes nack (and a crashed consumer) end in redelivery.
//!
//! The `redis` client is synchronous; every call runs on the blocking pool.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use stockline_events::{Acknowledge, ChannelError, Delivery, SaleEvent, SalePublisher, SaleQueue};

/// Entries are read in batches of one: each `recv` hands out exactly one
/// delivery, matching the in-memory queue's contract.
const READ_BLOCK_MS: u64 = 1000;

/// Consumer name within a queue's group.
///
/// Deliberately stable across restarts: a restarted process inherits the
/// crashed one's pending entry list and re-reads it before new entries.
/// Consumers of the same queue in different processes share the identity
/// and compete; the same pending entry can surface in more than one of
/// them, which is within the channel's at-least-once contract.
fn queue_consumer_name(queue: &str) -> String {
    format!("{queue}-consumer")
}

#[derive(Debug, thiserror::Error)]
pub enum RedisChannelError {
    #[error("redis connection error: {0}")]
    Connection(String),

    #[error("redis command error: {0}")]
    Command(String),

    #[error("unexpected reply shape: {0}")]
    Reply(String),
}

impl From<RedisChannelError> for ChannelError {
    fn from(value: RedisChannelError) -> Self {
        ChannelError::Transport(value.to_string())
    }
}

/// Sale topic over Redis Streams.
#[derive(Clone)]
pub struct RedisSaleChannel {
    client: Arc<redis::Client>,
    /// Streams to fan out to; one per bound queue name, kept even after the
    /// local queue handle is dropped (the broker retains the stream anyway).
    streams: Arc<Mutex<Vec<String>>>,
    key_prefix: String,
}

impl RedisSaleChannel {
    pub fn new(redis_url: impl AsRef<str>, key_prefix: impl Into<String>) -> Result<Self, RedisChannelError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisChannelError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            streams: Arc::new(Mutex::new(Vec::new())),
            key_prefix: key_prefix.into(),
        })
    }

    fn stream_key(&self, queue: &str) -> String {
        format!("{}:{}", self.key_prefix, queue)
    }

    /// Bind a named queue: create its consumer group (idempotent) and return
    /// a consumer handle.
    pub fn bind_queue(&self, name: impl Into<String>) -> Result<RedisSaleQueue, RedisChannelError> {
        let name = name.into();
        let stream = self.stream_key(&name);

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisChannelError::Connection(e.to_string()))?;

        // XGROUP CREATE with MKSTREAM creates the stream if missing; an
        // already-existing group is not an error for us.
        let _: Result<String, _> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&stream)
            .arg(&name)
            .arg("0")
            .arg("MKSTREAM")
            .query(&mut conn);

        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        if !streams.contains(&stream) {
            streams.push(stream.clone());
        }

        Ok(RedisSaleQueue {
            client: self.client.clone(),
            stream,
            group: name.clone(),
            consumer: queue_consumer_name(&name),
            name,
        })
    }

    fn publish_sync(&self, payload: &[u8]) -> Result<(), RedisChannelError> {
        let streams = {
            let guard = self.streams.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if streams.is_empty() {
            // Nothing bound; the message is seen by no one.
            return Ok(());
        }

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisChannelError::Connection(e.to_string()))?;

        for stream in &streams {
            let _: String = redis::cmd("XADD")
                .arg(stream)
                .arg("*")
                .arg("payload")
                .arg(payload)
                .query(&mut conn)
                .map_err(|e| RedisChannelError::Command(format!("XADD {stream} failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl SalePublisher for RedisSaleChannel {
    async fn publish(&self, event: &SaleEvent) -> Result<(), ChannelError> {
        let payload = event
            .encode()
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        let channel = self.clone();
        tokio::task::spawn_blocking(move || channel.publish_sync(&payload))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))??;
        Ok(())
    }
}

/// Consumer handle to one queue's stream.
#[derive(Clone)]
pub struct RedisSaleQueue {
    client: Arc<redis::Client>,
    stream: String,
    group: String,
    consumer: String,
    name: String,
}

impl RedisSaleQueue {
    /// One XREADGROUP pass: own pending entries first (`0`), then new
    /// entries (`>`, blocking briefly). Returns `None` when neither yields.
    fn read_one_sync(&self) -> Result<Option<(String, Vec<u8>)>, RedisChannelError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisChannelError::Connection(e.to_string()))?;

        for id in ["0", ">"] {
            let mut cmd = redis::cmd("XREADGROUP");
            cmd.arg("GROUP")
                .arg(&self.group)
                .arg(&self.consumer)
                .arg("COUNT")
                .arg(1usize);
            if id == ">" {
                cmd.arg("BLOCK").arg(READ_BLOCK_MS);
            }
            cmd.arg("STREAMS").arg(&self.stream).arg(id);

            let reply: redis::Value = cmd
                .query(&mut conn)
                .map_err(|e| RedisChannelError::Command(format!("XREADGROUP failed: {e}")))?;

            if let Some(entry) = first_entry(&reply)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

}

fn ack_sync(
    client: &redis::Client,
    stream: &str,
    group: &str,
    entry_id: &str,
) -> Result<(), RedisChannelError> {
    let mut conn = client
        .get_connection()
        .map_err(|e| RedisChannelError::Connection(e.to_string()))?;
    let _: u64 = redis::cmd("XACK")
        .arg(stream)
        .arg(group)
        .arg(entry_id)
        .query(&mut conn)
        .map_err(|e| RedisChannelError::Command(format!("XACK failed: {e}")))?;
    Ok(())
}

#[async_trait]
impl SaleQueue for RedisSaleQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&self) -> Result<Delivery, ChannelError> {
        loop {
            let queue = self.clone();
            let read = tokio::task::spawn_blocking(move || queue.read_one_sync())
                .await
                .map_err(|e| ChannelError::Transport(e.to_string()))??;

            if let Some((entry_id, payload)) = read {
                let acker = RedisAcker {
                    client: self.client.clone(),
                    stream: self.stream.clone(),
                    group: self.group.clone(),
                    entry_id,
                };
                return Ok(Delivery::new(payload, Box::new(acker)));
            }
        }
    }
}

/// Entry settlement: ack is XACK; nack leaves the entry pending, so the next
/// `recv` on this consumer picks it up again. Dropping without settling does
/// the same, which is the broker-side crash behavior.
struct RedisAcker {
    client: Arc<redis::Client>,
    stream: String,
    group: String,
    entry_id: String,
}

#[async_trait]
impl Acknowledge for RedisAcker {
    async fn ack(self: Box<Self>) -> Result<(), ChannelError> {
        let this = *self;
        tokio::task::spawn_blocking(move || {
            ack_sync(&this.client, &this.stream, &this.group, &this.entry_id)
        })
        .await
        .map_err(|e| ChannelError::Transport(e.to_string()))??;
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<(), ChannelError> {
        // Leave the entry in the pending entry list; it is re-read before new
        // entries on the next recv.
        Ok(())
    }
}

/// Pull the first `(entry_id, payload)` out of an XREADGROUP reply.
///
/// Reply shape: array of streams, each `[key, [[entry_id, [field, value,
/// ...]], ...]]`. A `Nil` reply means the read timed out with no entries.
fn first_entry(reply: &redis::Value) -> Result<Option<(String, Vec<u8>)>, RedisChannelError> {
    let streams = match reply {
        redis::Value::Nil => return Ok(None),
        redis::Value::Bulk(streams) => streams,
        other => return Err(RedisChannelError::Reply(format!("{other:?}"))),
    };

    for stream in streams {
        let redis::Value::Bulk(parts) = stream else {
            continue;
        };
        let Some(redis::Value::Bulk(entries)) = parts.get(1) else {
            continue;
        };
        for entry in entries {
            let redis::Value::Bulk(entry_parts) = entry else {
                continue;
            };
            let Some(redis::Value::Data(id)) = entry_parts.first() else {
                continue;
            };
            let Some(redis::Value::Bulk(fields)) = entry_parts.get(1) else {
                continue;
            };
            for pair in fields.chunks(2) {
                if let (redis::Value::Data(key), Some(redis::Value::Data(value))) =
                    (&pair[0], pair.get(1))
                {
                    if key.as_slice() == b"payload" {
                        return Ok(Some((
                            String::from_utf8_lossy(id).to_string(),
                            value.clone(),
                        )));
                    }
                }
            }
            warn!(stream = ?parts.first(), "stream entry without payload field");
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_name_is_stable_for_a_queue() {
        // Redelivery of a crashed process's pending entries depends on the
        // restarted process presenting the same consumer name.
        assert_eq!(
            queue_consumer_name("inventory.stock"),
            "inventory.stock-consumer"
        );
        assert_eq!(
            queue_consumer_name("inventory.stock"),
            queue_consumer_name("inventory.stock")
        );
    }
}
