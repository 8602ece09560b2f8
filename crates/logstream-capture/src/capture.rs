use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;

use logstream_frame::Close;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, Result};
use crate::limit::{SizeLimitedWriter, MB};

/// Default total output budget, shared by stdout and stderr.
pub const DEFAULT_LIMIT: u64 = 2 * MB;

/// One of the child's captured output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Stdout,
    Stderr,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether captured output is also mirrored to this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Echo {
    /// Child stdout to our stdout, child stderr to our stderr.
    #[default]
    Inherit,
    /// Only the sink sees the output.
    Discard,
}

/// Configuration for [`run_captured`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Total bytes forwarded to the sink across both streams. `None` disables
    /// truncation.
    pub limit: Option<u64>,
    pub echo: Echo,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LIMIT),
            echo: Echo::Inherit,
        }
    }
}

impl CaptureConfig {
    /// Set the limit in megabytes; `0` disables truncation.
    pub fn with_limit_mbs(mut self, megabytes: u64) -> Self {
        self.limit = (megabytes > 0).then(|| megabytes.saturating_mul(MB));
        self
    }

    pub fn with_echo(mut self, echo: Echo) -> Self {
        self.echo = echo;
        self
    }
}

/// How a captured command ended.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub status: ExitStatus,
    /// Failures while forwarding output, in arrival order.
    pub capture_errors: Vec<(Source, io::Error)>,
    /// Bytes produced by the child across both streams.
    pub consumed: u64,
    /// Bytes dropped by the size limit.
    pub truncated: u64,
}

impl CaptureOutcome {
    /// The child's exit code; `128 + signal` for a child killed by a signal.
    pub fn exit_code(&self) -> i32 {
        exit_code(self.status)
    }

    /// The first capture failure, if any.
    pub fn capture_error(&self) -> Option<&io::Error> {
        self.capture_errors.first().map(|(_, err)| err)
    }
}

/// Run `command`, forwarding its stdout and stderr into `sink`.
///
/// Both streams share one [`SizeLimitedWriter`] budget. The child's stdin is
/// `/dev/null`. Forwarding failures are appended to the stream and reported in the
/// outcome rather than aborting the run; a non-zero exit appends one status
/// line. The sink is closed before returning, also when waiting fails.
pub fn run_captured<W>(mut command: Command, sink: W, config: &CaptureConfig) -> Result<CaptureOutcome>
where
    W: Write + Close + Send,
{
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(CaptureError::Spawn)?;
    debug!(pid = child.id(), "spawned command");

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        (stdout, _) => {
            let missing = if stdout.is_none() { "stdout" } else { "stderr" };
            reap(&mut child);
            return Err(CaptureError::MissingPipe(missing));
        }
    };

    let limiter = SizeLimitedWriter::new(sink, config.limit);
    let mut capture_errors = Vec::new();

    thread::scope(|scope| {
        let (tx, rx) = mpsc::sync_channel::<(Source, io::Result<u64>)>(2);
        let limiter = &limiter;
        let echo = config.echo;

        let stdout_tx = tx.clone();
        scope.spawn(move || {
            let local = local_echo(echo, Source::Stdout);
            let result = pump(Source::Stdout, stdout, local, limiter);
            let _ = stdout_tx.send((Source::Stdout, result));
        });
        scope.spawn(move || {
            let local = local_echo(echo, Source::Stderr);
            let result = pump(Source::Stderr, stderr, local, limiter);
            let _ = tx.send((Source::Stderr, result));
        });

        for (source, result) in rx {
            match result {
                Ok(bytes) => debug!(%source, bytes, "capture finished"),
                Err(err) => {
                    warn!(%source, error = %err, "failed to forward command output");
                    capture_errors.push((source, err));
                }
            }
        }
    });

    let waited = child.wait();

    if let Err(err) = limiter.flush_warning() {
        warn!(error = %err, "failed to write size limit warning");
    }
    let consumed = limiter.consumed();
    let truncated = limiter.truncated();
    if truncated > 0 {
        info!(consumed, truncated, "command output exceeded size limit");
    }
    let mut sink = limiter.into_inner();

    for (_, err) in &capture_errors {
        let line = format!("\n---\nError when reading logs: {err}.\n---\n");
        if let Err(write_err) = sink.write_all(line.as_bytes()) {
            warn!(error = %write_err, "failed to append capture error");
        }
    }

    let status = match waited {
        Ok(status) => status,
        Err(err) => {
            if let Err(close_err) = sink.close() {
                warn!(error = %close_err, "failed to close stream");
            }
            return Err(CaptureError::Wait(err));
        }
    };
    debug!(%status, "command exited");

    if let Some(line) = exit_line(status) {
        if let Err(err) = sink.write_all(line.as_bytes()) {
            warn!(error = %err, "failed to append exit status");
        }
    }

    sink.close().map_err(CaptureError::Close)?;

    Ok(CaptureOutcome {
        status,
        capture_errors,
        consumed,
        truncated,
    })
}

fn local_echo(echo: Echo, source: Source) -> Option<Box<dyn Write>> {
    match (echo, source) {
        (Echo::Discard, _) => None,
        (Echo::Inherit, Source::Stdout) => Some(Box::new(io::stdout())),
        (Echo::Inherit, Source::Stderr) => Some(Box::new(io::stderr())),
    }
}

/// Copy one pipe into local echo and the shared limiter until EOF.
///
/// The first limiter error stops forwarding but not the local echo; the pipe
/// is read to the end either way, so the child never blocks on a full pipe.
fn pump<R: Read, W: Write>(
    source: Source,
    mut pipe: R,
    local: Option<Box<dyn Write>>,
    limiter: &SizeLimitedWriter<W>,
) -> io::Result<u64> {
    let mut tee = Tee {
        source,
        local,
        limiter,
        sink_error: None,
    };

    match io::copy(&mut pipe, &mut tee) {
        Ok(bytes) => match tee.sink_error {
            Some(err) => Err(err),
            None => Ok(bytes),
        },
        Err(err) => {
            let drained = io::copy(&mut pipe, &mut io::sink()).unwrap_or(0);
            debug!(%source, drained, "drained pipe after read error");
            Err(tee.sink_error.unwrap_or(err))
        }
    }
}

/// Mirrors writes to local echo (best effort) and the limiter.
///
/// Never fails: echo errors disable the echo, limiter errors are kept in
/// `sink_error` and disable forwarding.
struct Tee<'a, W> {
    source: Source,
    local: Option<Box<dyn Write>>,
    limiter: &'a SizeLimitedWriter<W>,
    sink_error: Option<io::Error>,
}

impl<W: Write> Write for Tee<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(local) = self.local.as_mut() {
            if let Err(err) = local.write_all(buf).and_then(|()| local.flush()) {
                warn!(source = %self.source, error = %err, "local echo failed; disabling it");
                self.local = None;
            }
        }

        if self.sink_error.is_none() {
            if let Err(err) = self.limiter.write_shared(buf) {
                debug!(source = %self.source, error = %err, "forwarding stopped");
                self.sink_error = Some(err);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.sink_error.is_some() {
            return Ok(());
        }
        let mut limiter = self.limiter;
        limiter.flush()
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(error = %err, "failed to kill child");
    }
    if let Err(err) = child.wait() {
        debug!(error = %err, "failed to reap child");
    }
}

fn exit_line(status: ExitStatus) -> Option<String> {
    if status.success() {
        return None;
    }
    let line = match (status.code(), exit_signal(status)) {
        (Some(code), _) => format!("\n---\nCommand exited with status {code}.\n---\n"),
        (None, Some(signal)) => format!("\n---\nCommand terminated by signal {signal}.\n---\n"),
        (None, None) => "\n---\nCommand terminated abnormally.\n---\n".to_string(),
    };
    Some(line)
}

fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), exit_signal(status)) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
