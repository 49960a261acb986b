use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use vtguard_commons::{ErrorKind, ProcessRunner};

use crate::operation::FileOperation;

/// A request for temporarily heightened privileges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationRequest {
    pub operation: FileOperation,
    pub path: PathBuf,
    pub reason: String,
    /// Suggested way to avoid elevation, shown alongside the question.
    pub alternative: Option<String>,
}

impl ElevationRequest {
    pub fn new(operation: FileOperation, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            reason: reason.into(),
            alternative: None,
        }
    }

    pub fn with_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternative = Some(alternative.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ElevationDecision {
    Granted,
    Declined,
    Blocked,
    Unavailable { reason: String },
}

impl ElevationDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ElevationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => f.write_str("elevation granted"),
            Self::Declined => f.write_str("elevation declined by user"),
            Self::Blocked => f.write_str("elevation blocked by policy"),
            Self::Unavailable { reason } => write!(f, "elevation unavailable: {reason}"),
        }
    }
}

/// Non-interactive command proving elevation would succeed right now.
///
/// `sudo -n true` fails instead of prompting when no cached credentials exist;
/// `net session` only succeeds from an elevated Windows shell.
pub fn probe_command() -> (&'static str, Vec<String>) {
    if cfg!(windows) {
        ("net", vec!["session".to_string()])
    } else {
        ("sudo", vec!["-n".to_string(), "true".to_string()])
    }
}

/// Run the platform probe. The user's own command is never executed here.
pub async fn run_probe(runner: &dyn ProcessRunner, timeout: Duration) -> ElevationDecision {
    let (program, args) = probe_command();
    match runner.run(program, &args, timeout).await {
        Ok(output) if output.success() => {
            info!(program, "Elevation probe succeeded");
            ElevationDecision::Granted
        }
        Ok(output) => {
            let detail = output.stderr.trim();
            debug!(program, exit_code = ?output.exit_code, detail, "Elevation probe failed");
            if detail.is_empty() {
                ElevationDecision::unavailable(format!(
                    "'{program}' exited with status {}",
                    output
                        .exit_code
                        .map_or_else(|| "unknown".to_string(), |code| code.to_string())
                ))
            } else {
                ElevationDecision::unavailable(format!("'{program}' refused: {detail}"))
            }
        }
        Err(error) if error.kind() == ErrorKind::Timeout => {
            ElevationDecision::unavailable(format!("'{program}' probe timed out"))
        }
        Err(error) => ElevationDecision::unavailable(error.to_string()),
    }
}
