use std::io::{self, Read};

use logstream_frame::{Close, Producer};
use logstream_transport::RecordLog;
use tracing::debug;

use crate::cmd::{AppendArgs, GlobalArgs};
use crate::exit::{io_error, CliResult, SUCCESS};

pub fn run(_args: AppendArgs, global: &GlobalArgs) -> CliResult<i32> {
    let mut producer = Producer::new(global.connect()?);
    let stdin = io::stdin();
    append(&mut stdin.lock(), &mut producer)
}

/// Copy `input` into the stream, then end it.
///
/// The terminal record is appended even when the copy fails, so followers
/// do not wait forever.
pub(crate) fn append<R: Read, L: RecordLog>(
    input: &mut R,
    producer: &mut Producer<L>,
) -> CliResult<i32> {
    let copied = io::copy(input, producer);
    let closed = producer.close();

    let bytes = copied.map_err(|err| io_error("append failed", err))?;
    closed.map_err(|err| io_error("close failed", err))?;
    debug!(bytes, records = producer.records_appended(), "stream closed");
    Ok(SUCCESS)
}
