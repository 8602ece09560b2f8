//! Append-only record log abstraction.
//!
//! Provides a unified interface over the ordered logs logstream relays
//! byte streams through:
//! - Redis streams (`XADD` / `XREAD BLOCK`)
//! - An in-process log (tests, local piping)
//!
//! This is the lowest layer of logstream. Everything else builds on top of
//! the [`RecordLog`] trait provided here.

pub mod error;
pub mod locator;
pub mod memory;
pub mod redis_log;
pub mod traits;

pub use error::{Result, TransportError};
pub use locator::{parse_duration, StreamLocator, DEFAULT_CONNECT_TIMEOUT};
pub use memory::MemoryLog;
pub use redis_log::RedisLog;
pub use traits::{Entry, RecordId, RecordLog};
