use std::process::Command;

use logstream_capture::{run_captured, CaptureConfig, CaptureOutcome, Echo};
use logstream_frame::Producer;
use tracing::{debug, warn};

use crate::cmd::{GlobalArgs, RunArgs};
use crate::exit::{capture_error, CliError, CliResult, FAILURE};

pub fn run(args: RunArgs, global: &GlobalArgs) -> CliResult<i32> {
    let producer = Producer::new(global.connect()?);
    let config = CaptureConfig::default()
        .with_limit_mbs(global.max_size_mbs)
        .with_echo(Echo::Inherit);

    let command = shell_command(&args.command);
    let outcome =
        run_captured(command, producer, &config).map_err(|err| capture_error("run failed", err))?;
    exit_code(&outcome)
}

/// Build the `sh -c` invocation for `argv`.
///
/// A single argument is taken as a complete shell line; several arguments
/// are quoted so each stays one word.
fn shell_command(argv: &[String]) -> Command {
    let script = match argv {
        [line] => line.clone(),
        words => shell_words::join(words),
    };
    debug!(%script, "running command");
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    command
}

/// The child's own code, unless output was lost from a successful run.
fn exit_code(outcome: &CaptureOutcome) -> CliResult<i32> {
    for (source, err) in outcome.capture_errors.iter().skip(1) {
        warn!(%source, error = %err, "additional capture error");
    }

    match outcome.capture_error() {
        Some(err) if outcome.status.success() => Err(CliError::new(
            FAILURE,
            format!("failed to stream command output: {err}"),
        )),
        _ => Ok(outcome.exit_code()),
    }
}
