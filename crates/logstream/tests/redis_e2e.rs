//! End-to-end tests against a live Redis.
//!
//! Set `LOGSTREAM_TEST_REDIS_URL` to a backend plus db, e.g.
//! `redis://127.0.0.1:6379/0`; every test uses its own stream key.
#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn redis_url() -> Option<String> {
    std::env::var("LOGSTREAM_TEST_REDIS_URL").ok()
}

fn stream_url(base: &str, tag: &str) -> String {
    format!(
        "{}/logstream-e2e-{tag}-{}-{}",
        base.trim_end_matches('/'),
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    )
}

fn logstream(url: &str) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_logstream"));
    command
        .env_remove("LOGSTREAM_MAX_SIZE_MBS")
        .env_remove("LOGSTREAM_DEBUG")
        .args(["--url", url]);
    command
}

fn follow(url: &str) -> Output {
    logstream(url)
        .args(["follow", "--block-timeout", "500ms"])
        .output()
        .expect("follow should run")
}

#[test]
fn run_then_follow_reproduces_output_and_exit_status() {
    let Some(base) = redis_url() else {
        eprintln!("LOGSTREAM_TEST_REDIS_URL not set; skipping");
        return;
    };
    let url = stream_url(&base, "exit");

    let run = logstream(&url)
        .args(["run", "echo out; exit 7"])
        .output()
        .expect("run should start");
    assert_eq!(run.status.code(), Some(7));
    assert_eq!(run.stdout, b"out\n", "child stdout is echoed locally");

    let followed = follow(&url);
    assert!(followed.status.success());
    assert_eq!(
        String::from_utf8_lossy(&followed.stdout),
        "out\n\n---\nCommand exited with status 7.\n---\n"
    );
}

#[test]
fn append_then_follow_roundtrips_binary() {
    let Some(base) = redis_url() else {
        eprintln!("LOGSTREAM_TEST_REDIS_URL not set; skipping");
        return;
    };
    let url = stream_url(&base, "append");
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let mut child = logstream(&url)
        .arg("append")
        .stdin(Stdio::piped())
        .spawn()
        .expect("append should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(&payload)
        .expect("payload should be written");
    assert!(child.wait().expect("append should exit").success());

    let followed = follow(&url);
    assert!(followed.status.success());
    assert_eq!(followed.stdout, payload);
}

#[test]
fn run_truncates_at_size_limit() {
    let Some(base) = redis_url() else {
        eprintln!("LOGSTREAM_TEST_REDIS_URL not set; skipping");
        return;
    };
    let url = stream_url(&base, "limit");

    let run = logstream(&url)
        .args(["--max-size-mbs", "1", "run", "head -c 1500000 /dev/zero | tr '\\0' a"])
        .stdout(Stdio::null())
        .output()
        .expect("run should start");
    assert!(run.status.success());

    let followed = follow(&url);
    let text = String::from_utf8_lossy(&followed.stdout);
    let kept = text.bytes().take_while(|b| *b == b'a').count();
    assert_eq!(kept, 1024 * 1024);
    assert_eq!(text.matches("Logs exceeded limit of 1.0 MB").count(), 1);
}
