use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Entry, RecordId, RecordLog};

/// In-process record log.
///
/// Clones share the same stream, so one clone can back a producer while
/// another backs a consumer on a different thread. Ids have the form
/// `<seq>-0` with `seq` starting at 1, mirroring Redis stream ids.
#[derive(Clone, Default)]
pub struct MemoryLog {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    appended: Condvar,
}

#[derive(Default)]
struct State {
    entries: Vec<(u64, Entry)>,
    next_seq: u64,
    shut_down: bool,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record appended so far.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock()
            .entries
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wake every blocked reader; subsequent operations fail with
    /// [`TransportError::Shutdown`].
    pub fn shutdown(&self) {
        self.lock().shut_down = true;
        self.shared.appended.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn sequence_of(id: &RecordId) -> u64 {
    id.as_str()
        .split('-')
        .next()
        .and_then(|seq| seq.parse().ok())
        .unwrap_or(0)
}

impl RecordLog for MemoryLog {
    fn append(&mut self, fields: &[(&str, &[u8])]) -> Result<RecordId> {
        let mut state = self.lock();
        if state.shut_down {
            return Err(TransportError::Shutdown);
        }

        state.next_seq += 1;
        let seq = state.next_seq;
        let id = RecordId::from(format!("{seq}-0"));
        let fields = fields
            .iter()
            .map(|(name, value)| (name.to_string(), Bytes::copy_from_slice(value)))
            .collect();
        state.entries.push((seq, Entry::new(id.clone(), fields)));
        drop(state);

        self.shared.appended.notify_all();
        debug!(%id, "appended record to memory log");
        Ok(id)
    }

    fn read_after(&mut self, after: &RecordId, timeout: Duration) -> Result<Vec<Entry>> {
        let after = sequence_of(after);
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if state.shut_down {
                return Err(TransportError::Shutdown);
            }

            let start = state.entries.partition_point(|(seq, _)| *seq <= after);
            if start < state.entries.len() {
                return Ok(state.entries[start..]
                    .iter()
                    .map(|(_, entry)| entry.clone())
                    .collect());
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            state = self
                .shared
                .appended
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLog")
            .field("records", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_increasing_ids() {
        let mut log = MemoryLog::new();
        let first = log.append(&[("k", &b"a"[..])]).unwrap();
        let second = log.append(&[("k", &b"b"[..])]).unwrap();

        assert_eq!(first.as_str(), "1-0");
        assert_eq!(second.as_str(), "2-0");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn read_after_returns_strictly_later_records() {
        let mut log = MemoryLog::new();
        let first = log.append(&[("k", &b"a"[..])]).unwrap();
        log.append(&[("k", &b"b"[..])]).unwrap();

        let all = log
            .read_after(&RecordId::beginning(), Duration::from_millis(10))
            .unwrap();
        assert_eq!(all.len(), 2);

        let later = log.read_after(&first, Duration::from_millis(10)).unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].field("k").map(|v| &v[..]), Some(&b"b"[..]));
    }

    #[test]
    fn read_after_times_out_empty() {
        let mut log = MemoryLog::new();
        let started = Instant::now();
        let records = log
            .read_after(&RecordId::beginning(), Duration::from_millis(50))
            .unwrap();

        assert!(records.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn blocked_reader_wakes_on_append() {
        let log = MemoryLog::new();
        let mut reader = log.clone();

        let handle = std::thread::spawn(move || {
            reader
                .read_after(&RecordId::beginning(), Duration::from_secs(5))
                .unwrap()
        });

        std::thread::sleep(Duration::from_millis(20));
        let mut writer = log.clone();
        writer.append(&[("k", &b"late"[..])]).unwrap();

        let records = handle.join().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn shutdown_fails_pending_and_later_operations() {
        let mut log = MemoryLog::new();
        log.shutdown();

        assert!(matches!(
            log.append(&[("k", &b"x"[..])]),
            Err(TransportError::Shutdown)
        ));
        assert!(matches!(
            log.read_after(&RecordId::beginning(), Duration::from_millis(1)),
            Err(TransportError::Shutdown)
        ));
    }
}
