//! Private record encoding shared by [`crate::Producer`] and [`crate::Consumer`].
//!
//! Wire shape (one record per field map):
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ event_type   │ "log" | "disconnect"         │
//! │ bytes        │ raw payload (log only)       │
//! └──────────────┴──────────────────────────────┘
//! ```
//! There is no version field. Anything else is a protocol violation.

use bytes::Bytes;
use logstream_transport::Entry;

use crate::error::ProtocolError;

pub(crate) const EVENT_TYPE_FIELD: &str = "event_type";
pub(crate) const BYTES_FIELD: &str = "bytes";

const LOG_EVENT: &[u8] = b"log";
const DISCONNECT_EVENT: &[u8] = b"disconnect";

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Log(Bytes),
    Disconnect,
}

/// Fields of a `log` record carrying `payload`.
pub(crate) fn log_fields(payload: &[u8]) -> [(&'static str, &[u8]); 2] {
    [(EVENT_TYPE_FIELD, LOG_EVENT), (BYTES_FIELD, payload)]
}

/// Fields of the terminal `disconnect` record.
pub(crate) fn disconnect_fields() -> [(&'static str, &'static [u8]); 1] {
    [(EVENT_TYPE_FIELD, DISCONNECT_EVENT)]
}

/// Decode a stored record into an [`Event`].
pub(crate) fn decode_entry(entry: &Entry) -> Result<Event, ProtocolError> {
    let event_type = entry
        .field(EVENT_TYPE_FIELD)
        .ok_or_else(|| ProtocolError::MissingEventType {
            id: entry.id.clone(),
        })?;

    match event_type.as_ref() {
        DISCONNECT_EVENT => Ok(Event::Disconnect),
        LOG_EVENT => entry
            .field(BYTES_FIELD)
            .cloned()
            .map(Event::Log)
            .ok_or_else(|| ProtocolError::MissingPayload {
                id: entry.id.clone(),
            }),
        other => Err(ProtocolError::UnknownEventType {
            id: entry.id.clone(),
            event_type: String::from_utf8_lossy(other).into_owned(),
        }),
    }
}
