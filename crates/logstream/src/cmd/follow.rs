use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use logstream_frame::{Consumer, ConsumerConfig, ReadOutcome};
use logstream_transport::{parse_duration, RecordLog};
use tracing::debug;

use crate::cmd::{FollowArgs, GlobalArgs};
use crate::exit::{io_error, stream_error, CliError, CliResult, FAILURE, INTERRUPTED, SUCCESS};

const CHUNK_SIZE: usize = 8 * 1024;

pub fn run(args: FollowArgs, global: &GlobalArgs) -> CliResult<i32> {
    let block_timeout = parse_duration(&args.block_timeout)
        .map_err(|err| CliError::new(FAILURE, format!("invalid --block-timeout: {err}")))?;
    let log = global.connect()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut consumer = Consumer::with_config(log, ConsumerConfig { block_timeout });
    let stdout = io::stdout();
    follow(&mut consumer, &mut stdout.lock(), &running)
}

/// Copy the stream to `out` until end-of-stream or until `running` clears.
///
/// `running` is checked before every poll, so an interrupt takes effect
/// within one block timeout.
pub(crate) fn follow<L: RecordLog, W: Write>(
    consumer: &mut Consumer<L>,
    out: &mut W,
    running: &AtomicBool,
) -> CliResult<i32> {
    let mut buf = vec![0u8; CHUNK_SIZE];

    while running.load(Ordering::SeqCst) {
        match consumer
            .read_chunk(&mut buf)
            .map_err(|err| stream_error("read failed", err))?
        {
            ReadOutcome::Data(n) => {
                out.write_all(&buf[..n])
                    .and_then(|()| out.flush())
                    .map_err(|err| io_error("write to stdout failed", err))?;
            }
            ReadOutcome::Idle => debug!(cursor = %consumer.cursor(), "no new records"),
            ReadOutcome::End => return Ok(SUCCESS),
        }
    }

    debug!(cursor = %consumer.cursor(), "follow interrupted");
    Ok(INTERRUPTED)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(FAILURE, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use logstream_frame::{Close, Producer};
    use logstream_transport::{MemoryLog, RecordLog};

    use super::*;
    use crate::exit::DATA_INVALID;

    fn consumer(log: MemoryLog) -> Consumer<MemoryLog> {
        Consumer::with_config(
            log,
            ConsumerConfig {
                block_timeout: Duration::from_millis(10),
            },
        )
    }

    #[test]
    fn copies_stream_until_end() {
        let log = MemoryLog::new();
        let mut producer = Producer::new(log.clone());
        producer.write_all(b"Here's a ").unwrap();
        producer.write_all(b"string\n").unwrap();
        producer.close().unwrap();

        let mut out = Vec::new();
        let code = follow(&mut consumer(log), &mut out, &AtomicBool::new(true)).unwrap();

        assert_eq!(code, SUCCESS);
        assert_eq!(out, b"Here's a string\n");
    }

    #[test]
    fn cleared_flag_stops_at_next_poll() {
        let log = MemoryLog::new();
        let mut out = Vec::new();

        let code = follow(&mut consumer(log), &mut out, &AtomicBool::new(false)).unwrap();

        assert_eq!(code, INTERRUPTED);
        assert!(out.is_empty());
    }

    #[test]
    fn protocol_error_exits_with_data_invalid() {
        let mut log = MemoryLog::new();
        log.append(&[("event_type", &b"resize"[..])]).unwrap();

        let mut out = Vec::new();
        let err = follow(&mut consumer(log), &mut out, &AtomicBool::new(true)).unwrap_err();

        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn transport_error_exits_with_failure() {
        let log = MemoryLog::new();
        log.shutdown();

        let mut out = Vec::new();
        let err = follow(&mut consumer(log), &mut out, &AtomicBool::new(true)).unwrap_err();

        assert_eq!(err.code, FAILURE);
    }
}
