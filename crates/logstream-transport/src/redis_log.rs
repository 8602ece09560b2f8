use std::time::Duration;

use bytes::Bytes;
use redis::streams::StreamReadReply;
use redis::{Client, Connection};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::locator::StreamLocator;
use crate::traits::{Entry, RecordId, RecordLog};

/// Extra socket read budget on top of the `XREAD BLOCK` wait.
const READ_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Record log backed by a Redis stream.
///
/// Appends use `XADD <stream> *`, reads use `XREAD BLOCK <ms> STREAMS
/// <stream> <after>`. One handle owns one blocking connection.
pub struct RedisLog {
    conn: Connection,
    stream: String,
    target: String,
}

impl RedisLog {
    /// Connect to the backend named by `locator`.
    pub fn connect(locator: &StreamLocator) -> Result<Self> {
        let target = locator.redacted_backend();
        let connect_err = |source| TransportError::Connect {
            target: target.clone(),
            source,
        };

        let client = Client::open(locator.backend_url()).map_err(connect_err)?;
        let conn = client
            .get_connection_with_timeout(locator.connect_timeout())
            .map_err(connect_err)?;
        conn.set_write_timeout(Some(locator.connect_timeout()))
            .map_err(connect_err)?;

        info!(backend = %target, stream = locator.stream(), "connected to redis");

        Ok(Self {
            conn,
            stream: locator.stream().to_string(),
            target,
        })
    }

    /// The stream key this handle appends to and reads from.
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl RecordLog for RedisLog {
    fn append(&mut self, fields: &[(&str, &[u8])]) -> Result<RecordId> {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream).arg("*");
        for (name, value) in fields {
            cmd.arg(*name).arg(*value);
        }

        let id: String = cmd.query(&mut self.conn).map_err(TransportError::Append)?;
        debug!(stream = %self.stream, %id, "xadd");
        Ok(RecordId::from(id))
    }

    fn read_after(&mut self, after: &RecordId, timeout: Duration) -> Result<Vec<Entry>> {
        // BLOCK 0 would wait forever.
        let block_ms = timeout.as_millis().clamp(1, u64::MAX as u128) as u64;
        self.conn
            .set_read_timeout(Some(timeout + READ_TIMEOUT_SLACK))
            .map_err(TransportError::Read)?;

        let reply: Option<StreamReadReply> = redis::cmd("XREAD")
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(after.as_str())
            .query(&mut self.conn)
            .map_err(TransportError::Read)?;

        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        let entries: Vec<Entry> = reply
            .keys
            .into_iter()
            .filter(|key| key.key == self.stream)
            .flat_map(|key| key.ids)
            .map(|stream_id| {
                let fields = stream_id
                    .map
                    .into_iter()
                    .filter_map(|(name, value)| {
                        match redis::from_redis_value::<Vec<u8>>(&value) {
                            Ok(bytes) => Some((name, Bytes::from(bytes))),
                            Err(err) => {
                                debug!(field = %name, error = %err, "skipping non-binary field");
                                None
                            }
                        }
                    })
                    .collect();
                Entry::new(stream_id.id, fields)
            })
            .collect();

        debug!(stream = %self.stream, after = %after, count = entries.len(), "xread");
        Ok(entries)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLog")
            .field("target", &self.target)
            .field("stream", &self.stream)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_refused_is_connect_error() {
        let locator =
            StreamLocator::parse("redis://127.0.0.1:1/0/stream?dial_timeout=500ms").unwrap();
        let err = RedisLog::connect(&locator).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.to_string().contains("127.0.0.1:1"));
    }

    #[test]
    fn roundtrip_against_live_redis() {
        let Ok(url) = std::env::var("LOGSTREAM_TEST_REDIS_URL") else {
            return;
        };
        let locator = StreamLocator::parse(&url).unwrap();
        let mut writer = RedisLog::connect(&locator).unwrap();
        let mut reader = RedisLog::connect(&locator).unwrap();

        let id = writer
            .append(&[("event_type", &b"log"[..]), ("bytes", &b"\x00\xffraw"[..])])
            .unwrap();

        let mut cursor = RecordId::beginning();
        loop {
            let entries = reader.read_after(&cursor, Duration::from_secs(1)).unwrap();
            assert!(!entries.is_empty(), "appended record should be readable");
            if let Some(found) = entries.iter().find(|entry| entry.id == id) {
                assert_eq!(found.field("bytes").map(|v| &v[..]), Some(&b"\x00\xffraw"[..]));
                break;
            }
            cursor = entries[entries.len() - 1].id.clone();
        }
    }
}
