/// Child processes with a hard time limit

use crate::error::{LucienError, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Captured output of a finished child
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// `what` names the process in errors ("git push", "shell command").
#[instrument(skip(cmd), fields(timeout_secs = timeout.as_secs()))]
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    what: &str,
) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LucienError::Process(format!("{}: program not found", what))
        } else {
            LucienError::Process(format!("{}: failed to start: {}", what, e))
        }
    })?;

    // Dropping the future on timeout kills the child
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            warn!("child process timed out");
            return Err(LucienError::Timeout {
                what: what.to_string(),
                secs: timeout.as_secs(),
            });
        }
    };

    debug!(status = %output.status, "child process finished");
    Ok(ProcessOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Command that runs `line` through the platform shell.
pub fn shell_command(line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(line);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output() {
        let out = run_with_timeout(shell_command("echo hi; echo oops >&2"), Duration::from_secs(5), "test")
            .await
            .unwrap();

        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_times_out() {
        let result =
            run_with_timeout(shell_command("sleep 5"), Duration::from_millis(200), "sleeper").await;

        match result {
            Err(LucienError::Timeout { what, .. }) => assert_eq!(what, "sleeper"),
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = run_with_timeout(
            Command::new("definitely-not-a-real-binary-xyz"),
            Duration::from_secs(1),
            "ghost",
        )
        .await;

        assert!(matches!(result, Err(LucienError::Process(_))));
    }
}
