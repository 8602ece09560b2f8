mod cmd;
mod exit;
mod logging;

use clap::Parser;

use crate::cmd::{Command, GlobalArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "logstream",
    version,
    about = "Stream process output through a Redis stream"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "LOGSTREAM_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "LOGSTREAM_LOG_LEVEL",
        default_value = "warn",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match cmd::run(cli.command, &cli.global) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "logstream",
            "--url",
            "redis://localhost:6379/0/job-1",
            "run",
            "echo",
            "--not-a-logstream-flag",
            "hi there",
        ])
        .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.command, ["echo", "--not-a-logstream-flag", "hi there"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(
            cli.global.url.as_deref(),
            Some("redis://localhost:6379/0/job-1")
        );
    }

    #[test]
    fn run_requires_a_command() {
        let err = Cli::try_parse_from(["logstream", "run"]).expect_err("empty run should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "logstream",
            "follow",
            "--url",
            "redis://localhost/jobs",
            "--block-timeout",
            "250ms",
            "--log-level",
            "debug",
        ])
        .expect("follow args should parse");

        assert!(matches!(cli.command, Command::Follow(_)));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn max_size_defaults_to_two_megabytes() {
        let cli = Cli::try_parse_from(["logstream", "version"]).expect("version should parse");
        assert_eq!(cli.global.max_size_mbs, 2);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let err = Cli::try_parse_from(["logstream", "--log-format", "xml", "version"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
