use logstream_transport::{RecordId, TransportError};

/// A record that violates the producer/consumer wire contract.
///
/// Fatal for the stream: the consumer never retries past it.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The record has no `event_type` field.
    #[error("record {id} has no event_type")]
    MissingEventType { id: RecordId },

    /// The record's `event_type` is neither `log` nor `disconnect`.
    #[error("record {id} has unexpected event_type {event_type:?}")]
    UnknownEventType { id: RecordId, event_type: String },

    /// A `log` record without its `bytes` field.
    #[error("malformed record {id}: log event without bytes")]
    MissingPayload { id: RecordId },
}

/// Errors that can occur while producing or consuming a stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Backend append/read failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed or unrecognized record.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Protocol(_) => std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            StreamError::Transport(_) => std::io::Error::other(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
