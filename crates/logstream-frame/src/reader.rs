use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use logstream_transport::{Entry, RecordId, RecordLog};
use tracing::{debug, trace};

use crate::codec::{decode_entry, Event};
use crate::error::Result;

/// Default upper bound on one blocking range read.
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Consumer`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// How long one range read may block waiting for new records.
    pub block_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
        }
    }
}

/// Result of one [`Consumer::read_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the caller's buffer. Zero only for an
    /// empty buffer.
    Data(usize),
    /// Nothing new arrived within the block timeout; poll again.
    Idle,
    /// The terminal record was reached and every byte before it delivered.
    End,
}

/// Reconstructs a byte stream from a record log.
///
/// Handles partial reads internally: payloads larger than the caller's buffer
/// are held in an overflow buffer and handed out over subsequent calls, and
/// records fetched beyond what one call can hold wait in a backlog, so every
/// record is fetched from the backend once. The cursor only moves past a
/// record once its whole payload has been delivered.
pub struct Consumer<L> {
    log: L,
    config: ConsumerConfig,
    cursor: RecordId,
    /// Fetched records after `cursor` not yet decoded, in id order.
    backlog: VecDeque<Entry>,
    overflow: BytesMut,
    /// Id of the record whose remainder sits in `overflow`.
    pending: Option<RecordId>,
    ended: bool,
}

impl<L: RecordLog> Consumer<L> {
    /// Create a consumer that starts at the beginning of the stream.
    pub fn new(log: L) -> Self {
        Self::with_config(log, ConsumerConfig::default())
    }

    /// Create a consumer with explicit configuration.
    pub fn with_config(log: L, config: ConsumerConfig) -> Self {
        Self {
            log,
            config,
            cursor: RecordId::beginning(),
            backlog: VecDeque::new(),
            overflow: BytesMut::new(),
            pending: None,
            ended: false,
        }
    }

    /// Read the next chunk of the stream into `buf`.
    ///
    /// Blocks at most one block timeout on the backend. Protocol errors are
    /// fatal: retrying reports the same error again.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if buf.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }

        if !self.overflow.is_empty() {
            return Ok(ReadOutcome::Data(self.drain_overflow(buf)));
        }

        if self.ended {
            return Ok(ReadOutcome::End);
        }

        if self.backlog.is_empty() {
            let entries = self
                .log
                .read_after(&self.cursor, self.config.block_timeout)?;
            if entries.is_empty() {
                trace!(cursor = %self.cursor, "no records before block timeout");
                return Ok(ReadOutcome::Idle);
            }
            debug!(cursor = %self.cursor, count = entries.len(), "fetched records");
            self.backlog.extend(entries);
        }

        let mut filled = 0usize;
        while filled < buf.len() {
            let Some(entry) = self.backlog.pop_front() else {
                break;
            };

            let event = match decode_entry(&entry) {
                Ok(event) => event,
                Err(err) => {
                    // The bad record stays first in line; every retry hits it again.
                    self.backlog.push_front(entry);
                    if filled > 0 {
                        break;
                    }
                    return Err(err.into());
                }
            };

            let payload = match event {
                Event::Disconnect => {
                    debug!(id = %entry.id, "reached disconnect record");
                    self.ended = true;
                    self.backlog.clear();
                    break;
                }
                Event::Log(payload) => payload,
            };

            let room = buf.len() - filled;
            if payload.len() <= room {
                buf[filled..filled + payload.len()].copy_from_slice(&payload);
                filled += payload.len();
                self.cursor = entry.id;
                continue;
            }

            buf[filled..].copy_from_slice(&payload[..room]);
            filled += room;
            self.overflow.extend_from_slice(&payload[room..]);
            debug!(
                id = %entry.id,
                delivered = room,
                remaining = self.overflow.len(),
                "record split across reads"
            );
            self.pending = Some(entry.id);
            break;
        }

        if filled > 0 {
            return Ok(ReadOutcome::Data(filled));
        }
        if self.ended {
            return Ok(ReadOutcome::End);
        }
        Ok(ReadOutcome::Idle)
    }

    fn drain_overflow(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.overflow.len());
        buf[..n].copy_from_slice(&self.overflow[..n]);
        self.overflow.advance(n);

        if self.overflow.is_empty() {
            if let Some(id) = self.pending.take() {
                self.cursor = id;
            }
        }
        n
    }

    /// Id of the last record fully delivered to callers.
    pub fn cursor(&self) -> &RecordId {
        &self.cursor
    }

    /// Whether the terminal record has been observed and fully drained.
    pub fn is_finished(&self) -> bool {
        self.ended && self.overflow.is_empty()
    }

    /// Bytes of a split record fetched but not yet delivered.
    pub fn buffered(&self) -> usize {
        self.overflow.len()
    }

    /// Records fetched but not yet handed out.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Borrow the underlying log.
    pub fn get_ref(&self) -> &L {
        &self.log
    }

    /// Consume the reader and return the log.
    pub fn into_inner(self) -> L {
        self.log
    }

    /// Current consumer configuration.
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }
}

impl<L: RecordLog> Read for Consumer<L> {
    /// Blocks across idle polls; `Ok(0)` means end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.read_chunk(buf)? {
                ReadOutcome::Data(n) => return Ok(n),
                ReadOutcome::Idle => continue,
                ReadOutcome::End => return Ok(0),
            }
        }
    }
}

impl<L> std::fmt::Debug for Consumer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("cursor", &self.cursor)
            .field("backlog", &self.backlog.len())
            .field("buffered", &self.overflow.len())
            .field("ended", &self.ended)
            .finish()
    }
}
