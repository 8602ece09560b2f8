//! Stream a byte stream through an append-only record log.
//!
//! A writer appends every write as one record and a terminal record on close;
//! any number of readers reconstruct the exact byte stream, in order, with
//! whatever buffer sizes they like. Redis streams are the production backend.
//!
//! # Crate Structure
//!
//! - [`transport`]: record log abstraction, Redis and in-memory backends,
//!   stream locators
//! - [`frame`]: producer/consumer byte-stream framing over a record log
//! - [`capture`]: child-process capture with a size limit (behind `capture`
//!   feature)

/// Re-export transport types.
pub mod transport {
    pub use logstream_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use logstream_frame::*;
}

/// Re-export capture types (requires `capture` feature).
#[cfg(feature = "capture")]
pub mod capture {
    pub use logstream_capture::*;
}
