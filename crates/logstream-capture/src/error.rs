/// Errors that end a capture run.
///
/// Failures while copying one of the child's pipes are not fatal; they are
/// collected in [`crate::CaptureOutcome::capture_errors`] instead.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The command could not be started.
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    /// The spawned child had no handle for a piped stream.
    #[error("child process has no {0} pipe")]
    MissingPipe(&'static str),

    /// Waiting for the child to exit failed.
    #[error("failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),

    /// Closing the sink (end-of-stream) failed.
    #[error("failed to close stream: {0}")]
    Close(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
