use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{SafetyError, SafetyResult};

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external programs on behalf of the trash and elevation probes.
///
/// Programs are spawned directly, never through a shell.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> SafetyResult<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> SafetyResult<ProcessOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|err| SafetyError::io("spawning", program, err))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|err| SafetyError::io("waiting for", program, err))?,
            Err(_) => {
                debug!(program, ?timeout, "Subprocess timed out and was killed");
                return Err(SafetyError::Timeout {
                    what: format!("subprocess '{program}'"),
                    millis: timeout.as_millis(),
                });
            }
        };

        let result = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program, exit_code = ?result.exit_code, "Subprocess finished");
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let runner = TokioProcessRunner;
        let output = runner
            .run(
                "sh",
                &["-c".to_string(), "echo hi; exit 3".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "hi");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn times_out_long_running_programs() {
        let runner = TokioProcessRunner;
        let err = runner
            .run("sleep", &["5".to_string()], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let runner = TokioProcessRunner;
        let err = runner
            .run(
                "vtguard-definitely-not-installed",
                &[],
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NotFound);
    }
}
