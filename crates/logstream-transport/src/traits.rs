use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Opaque, backend-assigned record id.
///
/// Ids increase monotonically within one stream. They are never parsed; the
/// only meaningful operation is handing one back to [`RecordLog::read_after`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// The token that sorts before every real record id.
    pub fn beginning() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record as stored in the log: an id plus raw field/value pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: RecordId,
    pub fields: Vec<(String, Bytes)>,
}

impl Entry {
    pub fn new(id: impl Into<RecordId>, fields: Vec<(String, Bytes)>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Value of the first field named `name`, if present.
    pub fn field(&self, name: &str) -> Option<&Bytes> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// An append-only, ordered log bound to a single stream.
///
/// Each handle is used by one producer or one consumer at a time; open a
/// second handle (or clone a [`crate::MemoryLog`]) for the other side.
pub trait RecordLog: Send {
    /// Append one record and return its backend-assigned id.
    ///
    /// On error nothing was appended.
    fn append(&mut self, fields: &[(&str, &[u8])]) -> Result<RecordId>;

    /// Return the records strictly after `after`, in id order.
    ///
    /// Blocks up to `timeout` while no such record exists. An empty vector
    /// means the wait timed out; it is not an error.
    fn read_after(&mut self, after: &RecordId, timeout: Duration) -> Result<Vec<Entry>>;

    /// Backend name for diagnostics.
    fn backend_name(&self) -> &'static str;
}

impl<L: RecordLog + ?Sized> RecordLog for Box<L> {
    fn append(&mut self, fields: &[(&str, &[u8])]) -> Result<RecordId> {
        (**self).append(fields)
    }

    fn read_after(&mut self, after: &RecordId, timeout: Duration) -> Result<Vec<Entry>> {
        (**self).read_after(after, timeout)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
