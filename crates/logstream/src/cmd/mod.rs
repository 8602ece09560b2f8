use clap::{Args, Subcommand};

use logstream_transport::{RedisLog, StreamLocator};
use tracing::debug;

use crate::exit::{transport_error, CliError, CliResult, FAILURE};

pub mod append;
pub mod follow;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the stream to stdout until its end-of-stream record.
    Follow(FollowArgs),
    /// Copy stdin into the stream, then end it.
    Append(AppendArgs),
    /// Run a command and stream its stdout and stderr.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, global: &GlobalArgs) -> CliResult<i32> {
    match command {
        Command::Follow(args) => follow::run(args, global),
        Command::Append(args) => append::run(args, global),
        Command::Run(args) => run::run(args, global),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Stream locator: redis://[user[:password]@]host[:port]/<db>/<stream-id>[?dial_timeout=30s].
    #[arg(long, value_name = "LOCATOR", env = "LOGSTREAM_URL", global = true)]
    pub url: Option<String>,

    /// Max total output captured by `run`, in MB. 0 disables the limit.
    #[arg(
        long,
        value_name = "MB",
        env = "LOGSTREAM_MAX_SIZE_MBS",
        default_value_t = 2,
        global = true
    )]
    pub max_size_mbs: u64,
}

impl GlobalArgs {
    /// Parse `--url`; missing or malformed locators are setup failures.
    pub fn locator(&self) -> CliResult<StreamLocator> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| CliError::new(FAILURE, "missing stream locator: pass --url or set LOGSTREAM_URL"))?;
        StreamLocator::parse(url).map_err(|err| transport_error("invalid --url", err))
    }

    /// Connect to the stream named by `--url`.
    pub fn connect(&self) -> CliResult<RedisLog> {
        let locator = self.locator()?;
        debug!(locator = %locator, "connecting");
        RedisLog::connect(&locator).map_err(|err| transport_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct FollowArgs {
    /// Upper bound on one blocking read (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub block_timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct AppendArgs {}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command and arguments; run through `sh -c`.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(url: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            url: url.map(str::to_string),
            max_size_mbs: 2,
        }
    }

    #[test]
    fn missing_url_is_setup_failure() {
        let err = global(None).locator().unwrap_err();
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("--url"));
    }

    #[test]
    fn malformed_url_is_setup_failure() {
        let err = global(Some("redis://localhost/0/a/b")).locator().unwrap_err();
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("invalid --url: "));
    }

    #[test]
    fn valid_url_parses() {
        let locator = global(Some("redis://localhost:6379/3/job")).locator().unwrap();
        assert_eq!(locator.db(), 3);
        assert_eq!(locator.stream(), "job");
    }
}
