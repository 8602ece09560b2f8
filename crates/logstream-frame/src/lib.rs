//! Byte-stream framing over an append-only record log.
//!
//! This is the core value-add layer of logstream. A [`Producer`] turns every
//! write into one record; a [`Consumer`] reads the records back in order and
//! re-chunks their payloads into whatever buffer sizes the caller hands it:
//! - one `log` record per non-empty write, payload verbatim
//! - one `disconnect` record on close, marking end-of-stream
//!
//! No byte is lost, duplicated or reordered, whatever the read sizes.

mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use error::{ProtocolError, Result, StreamError};
pub use reader::{Consumer, ConsumerConfig, ReadOutcome, DEFAULT_BLOCK_TIMEOUT};
pub use writer::{Close, Producer};
