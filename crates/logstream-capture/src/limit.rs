use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use logstream_frame::Close;
use tracing::{debug, info};

/// Bytes per megabyte as used by size limits.
pub const MB: u64 = 1024 * 1024;

/// Caps the total number of bytes forwarded to a sink.
///
/// Bytes past the limit are dropped while every write still reports its full
/// length, so upstream copies never stall. The first write that crosses the
/// limit is followed by one warning block, written to the sink with a single
/// `write_all`.
///
/// Writes go through `&self`, so one writer can be shared between threads.
/// The counters and the sink sit behind the same lock, which keeps the
/// crossing check and the warning atomic.
pub struct SizeLimitedWriter<W> {
    limit: Option<u64>,
    state: Mutex<State<W>>,
}

struct State<W> {
    sink: W,
    consumed: u64,
    warned: bool,
}

impl<W> SizeLimitedWriter<W> {
    /// Wrap `sink`. `None` disables truncation.
    pub fn new(sink: W, limit: Option<u64>) -> Self {
        Self {
            limit,
            state: Mutex::new(State {
                sink,
                consumed: 0,
                warned: false,
            }),
        }
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Total bytes offered to the writer, dropped ones included.
    pub fn consumed(&self) -> u64 {
        self.lock().consumed
    }

    /// Bytes dropped so far.
    pub fn truncated(&self) -> u64 {
        let consumed = self.consumed();
        self.limit.map_or(0, |limit| consumed.saturating_sub(limit))
    }

    /// Whether the warning block has been written to the sink.
    pub fn warned(&self) -> bool {
        self.lock().warned
    }

    /// Consume the writer and return the sink. A pending warning is lost;
    /// call [`flush_warning`](Self::flush_warning) first.
    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .sink
    }

    fn lock(&self) -> MutexGuard<'_, State<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write> SizeLimitedWriter<W> {
    /// Forward the part of `buf` that fits under the limit.
    ///
    /// Returns `buf.len()` on success. On a sink error the bytes still count
    /// as consumed.
    pub fn write_shared(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        let before = state.consumed;
        state.consumed = before.saturating_add(buf.len() as u64);

        let Some(limit) = self.limit else {
            state.sink.write_all(buf)?;
            return Ok(buf.len());
        };

        let allowed = limit.saturating_sub(before).min(buf.len() as u64) as usize;
        if allowed > 0 {
            state.sink.write_all(&buf[..allowed])?;
        }
        if state.consumed > limit && !state.warned {
            emit_warning(&mut state, limit)?;
        }
        Ok(buf.len())
    }

    /// Write the warning block if the limit was crossed but the warning could
    /// not be delivered yet.
    pub fn flush_warning(&self) -> io::Result<()> {
        let mut state = self.lock();
        match self.limit {
            Some(limit) if state.consumed > limit && !state.warned => {
                emit_warning(&mut state, limit)
            }
            _ => Ok(()),
        }
    }

    fn flush_shared(&self) -> io::Result<()> {
        self.lock().sink.flush()
    }
}

impl<W: Write + Close> SizeLimitedWriter<W> {
    /// Deliver a pending warning, then close the sink.
    ///
    /// The sink is closed even when the warning cannot be written; the first
    /// error is returned.
    pub fn close_shared(&self) -> io::Result<()> {
        let warning = self.flush_warning();

        let mut state = self.lock();
        let closed = state.sink.close();
        let truncated = self
            .limit
            .map_or(0, |limit| state.consumed.saturating_sub(limit));
        if truncated > 0 {
            info!(consumed = state.consumed, truncated, "output exceeded size limit");
        } else {
            debug!(consumed = state.consumed, "size-limited writer closed");
        }

        warning.and(closed)
    }
}

/// The block written to the sink when output first exceeds the limit.
pub(crate) fn warning_message(limit: u64, truncated: u64) -> String {
    let megabytes = limit as f64 / MB as f64;
    format!(
        "\n---\nLogs exceeded limit of {megabytes:.1} MB, {truncated} bytes truncated so far.\n---\n"
    )
}

fn emit_warning<W: Write>(state: &mut State<W>, limit: u64) -> io::Result<()> {
    let truncated = state.consumed - limit;
    state
        .sink
        .write_all(warning_message(limit, truncated).as_bytes())?;
    state.warned = true;
    debug!(limit, truncated, "wrote size limit warning");
    Ok(())
}

impl<W: Write> Write for &SizeLimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_shared(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_shared()
    }
}

impl<W: Write> Write for SizeLimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_shared(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_shared()
    }
}

impl<W: Write + Close> Close for SizeLimitedWriter<W> {
    fn close(&mut self) -> io::Result<()> {
        self.close_shared()
    }
}

impl<W> std::fmt::Debug for SizeLimitedWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SizeLimitedWriter")
            .field("limit", &self.limit)
            .field("consumed", &state.consumed)
            .field("warned", &state.warned)
            .finish()
    }
}
