use std::fmt;
use std::io;

use logstream_capture::CaptureError;
use logstream_frame::StreamError;
use logstream_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(FAILURE, format!("{context}: {err}"))
}

pub fn stream_error(context: &str, err: StreamError) -> CliError {
    match err {
        StreamError::Transport(err) => transport_error(context, err),
        StreamError::Protocol(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn capture_error(context: &str, err: CaptureError) -> CliError {
    CliError::new(FAILURE, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use logstream_frame::ProtocolError;
    use logstream_transport::RecordId;

    use super::*;

    #[test]
    fn protocol_errors_map_to_data_invalid() {
        let err = StreamError::Protocol(ProtocolError::MissingEventType {
            id: RecordId::from("1-0"),
        });
        let cli = stream_error("read failed", err);
        assert_eq!(cli.code, DATA_INVALID);
        assert!(cli.message.starts_with("read failed: "));
    }

    #[test]
    fn transport_errors_map_to_failure() {
        let cli = stream_error("read failed", StreamError::Transport(TransportError::Shutdown));
        assert_eq!(cli.code, FAILURE);
    }

    #[test]
    fn invalid_data_io_errors_keep_protocol_code() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "bad record");
        assert_eq!(io_error("append failed", err).code, DATA_INVALID);
        assert_eq!(io_error("append failed", io::Error::other("x")).code, FAILURE);
    }

    #[test]
    fn capture_errors_map_to_failure() {
        let cli = capture_error("run failed", CaptureError::MissingPipe("stdout"));
        assert_eq!(cli.code, FAILURE);
        assert_eq!(cli.message, "run failed: child process has no stdout pipe");
    }
}
