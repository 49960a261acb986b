//! Desktop trash integration through platform helper programs.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};
use vtguard_commons::ProcessRunner;

/// How to hand a path to the desktop trash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeTrash {
    /// `gio trash <path>`
    Gio,
    /// `trash-put <path>` from trash-cli
    TrashCli,
    /// `kioclient5 move <path> trash:/`
    Kio,
    /// Finder via AppleScript
    Finder,
    /// `Microsoft.VisualBasic.FileIO.FileSystem` recycle bin calls
    RecycleBin,
    /// An explicit program invoked as `program [args..] <path>`
    Custom { program: String, args: Vec<String> },
}

impl NativeTrash {
    /// First helper available on `PATH` for this platform.
    pub fn detect() -> Option<Self> {
        let present = |program: &str| which::which(program).is_ok();
        let found = if cfg!(target_os = "macos") {
            present("osascript").then_some(Self::Finder)
        } else if cfg!(windows) {
            present("powershell").then_some(Self::RecycleBin)
        } else if present("gio") {
            Some(Self::Gio)
        } else if present("trash-put") {
            Some(Self::TrashCli)
        } else if present("kioclient5") {
            Some(Self::Kio)
        } else {
            None
        };
        debug!(backend = ?found, "Native trash backend");
        found
    }

    pub fn command_for(&self, path: &Path, is_dir: bool) -> (String, Vec<String>) {
        let target = path.to_string_lossy().into_owned();
        match self {
            Self::Gio => ("gio".into(), vec!["trash".into(), target]),
            Self::TrashCli => ("trash-put".into(), vec![target]),
            Self::Kio => (
                "kioclient5".into(),
                vec!["move".into(), target, "trash:/".into()],
            ),
            Self::Finder => {
                let escaped = target.replace('\\', "\\\\").replace('"', "\\\"");
                (
                    "osascript".into(),
                    vec![
                        "-e".into(),
                        format!("tell application \"Finder\" to delete POSIX file \"{escaped}\""),
                    ],
                )
            }
            Self::RecycleBin => {
                let escaped = target.replace('\'', "''");
                let call = if is_dir { "DeleteDirectory" } else { "DeleteFile" };
                (
                    "powershell".into(),
                    vec![
                        "-NoProfile".into(),
                        "-NonInteractive".into(),
                        "-Command".into(),
                        format!(
                            "Add-Type -AssemblyName Microsoft.VisualBasic; \
                             [Microsoft.VisualBasic.FileIO.FileSystem]::{call}('{escaped}', 'OnlyErrorDialogs', 'SendToRecycleBin')"
                        ),
                    ],
                )
            }
            Self::Custom { program, args } => {
                let mut full = args.clone();
                full.push(target);
                (program.clone(), full)
            }
        }
    }

    /// Try to trash `path`. `false` means the caller should fall back.
    pub async fn trash(
        &self,
        runner: &dyn ProcessRunner,
        path: &Path,
        is_dir: bool,
        timeout: Duration,
    ) -> bool {
        let (program, args) = self.command_for(path, is_dir);
        match runner.run(&program, &args, timeout).await {
            Ok(output) if output.success() => {
                debug!(program = %program, path = %path.display(), "Moved to native trash");
                true
            }
            Ok(output) => {
                warn!(
                    program = %program,
                    path = %path.display(),
                    exit_code = ?output.exit_code,
                    stderr = output.stderr.trim(),
                    "Native trash command failed; falling back to custom trash"
                );
                false
            }
            Err(error) => {
                warn!(program = %program, path = %path.display(), %error, "Native trash unavailable; falling back to custom trash");
                false
            }
        }
    }
}
