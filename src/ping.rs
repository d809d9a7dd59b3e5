use std::process::Stdio;
use std::time::Duration;

use log::debug;
use tokio::process::Command;

const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// OS family for the ping invocation, resolved once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetOs {
    Windows,
    Posix,
}

impl TargetOs {
    pub fn current() -> Self {
        if cfg!(windows) {
            TargetOs::Windows
        } else {
            TargetOs::Posix
        }
    }
}

/// Windows ping counts in milliseconds, everything else in seconds.
pub fn ping_args(os: TargetOs, host: &str) -> Vec<String> {
    let mut args: Vec<String> = match os {
        TargetOs::Windows => vec![
            "-n".to_string(),
            "1".to_string(),
            "-w".to_string(),
            PING_TIMEOUT.as_millis().to_string(),
        ],
        TargetOs::Posix => vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            PING_TIMEOUT.as_secs().to_string(),
        ],
    };
    args.push(host.to_string());
    args
}

/// Runs `program` with stdout/stderr discarded and reports whether it exited
/// with code 0. A spawn failure counts as a non-zero exit.
pub async fn run_silenced(program: &str, args: &[String]) -> bool {
    let status = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) => status.success(),
        Err(err) => {
            debug!("Failed to run {program}: {err}");
            false
        }
    }
}

/// Pings `host` once. Reachable means exit code 0; any failure, timeout, or
/// missing ping binary reads as unreachable.
pub async fn probe(os: TargetOs, host: &str) -> bool {
    run_silenced("ping", &ping_args(os, host)).await
}
