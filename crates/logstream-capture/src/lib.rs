//! Capture of a child process's output into a closable sink.
//!
//! [`SizeLimitedWriter`] caps the total bytes forwarded to a sink and emits a
//! single truncation warning; [`run_captured`] spawns a command and pumps its
//! stdout and stderr through one shared limiter, then closes the sink.

pub mod capture;
pub mod error;
pub mod limit;

pub use capture::{run_captured, CaptureConfig, CaptureOutcome, Echo, Source, DEFAULT_LIMIT};
pub use error::{CaptureError, Result};
pub use limit::{SizeLimitedWriter, MB};
