use std::io::Write;

use logstream_transport::RecordLog;
use tracing::debug;

use crate::codec::{disconnect_fields, log_fields};
use crate::error::Result;

/// A sink that has an explicit end-of-stream step.
pub trait Close {
    /// Finish the stream. Further writes are not meaningful afterwards.
    fn close(&mut self) -> std::io::Result<()>;
}

/// Writes a byte stream into a record log, one `log` record per write.
pub struct Producer<L> {
    log: L,
    records: u64,
}

impl<L: RecordLog> Producer<L> {
    pub fn new(log: L) -> Self {
        Self { log, records: 0 }
    }

    /// Append `data` as one `log` record (blocking).
    ///
    /// Empty input is accepted without touching the backend. On error
    /// nothing was appended.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let id = self.log.append(&log_fields(data))?;
        self.records += 1;
        debug!(%id, len = data.len(), "appended log record");
        Ok(data.len())
    }

    /// Append the terminal `disconnect` record.
    ///
    /// Not guarded against repeated calls: each call appends one more
    /// terminal record, and consumers stop at the first.
    pub fn finish(&mut self) -> Result<()> {
        let id = self.log.append(&disconnect_fields())?;
        self.records += 1;
        debug!(%id, records = self.records, "appended disconnect record");
        Ok(())
    }

    /// Records appended through this producer, terminal records included.
    pub fn records_appended(&self) -> u64 {
        self.records
    }

    /// Borrow the underlying log.
    pub fn get_ref(&self) -> &L {
        &self.log
    }

    /// Consume the producer and return the log.
    pub fn into_inner(self) -> L {
        self.log
    }
}

impl<L: RecordLog> Write for Producer<L> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.send(buf).map_err(Into::into)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<L: RecordLog> Close for Producer<L> {
    fn close(&mut self) -> std::io::Result<()> {
        self.finish().map_err(Into::into)
    }
}

impl<L> std::fmt::Debug for Producer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("records", &self.records)
            .finish()
    }
}
