/// Errors that can occur in record log operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The stream locator could not be parsed.
    #[error("invalid stream locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// Failed to connect to the backend.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: redis::RedisError,
    },

    /// Appending a record failed. Nothing was appended.
    #[error("append failed: {0}")]
    Append(redis::RedisError),

    /// A range read failed.
    #[error("read failed: {0}")]
    Read(redis::RedisError),

    /// The log has been shut down.
    #[error("record log shut down")]
    Shutdown,
}

impl TransportError {
    pub(crate) fn invalid_locator(locator: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
