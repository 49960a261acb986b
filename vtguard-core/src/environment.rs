use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the host environment can do for the safety layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentCapabilities {
    pub native_trash_available: bool,
    pub elevation_available: bool,
    pub interactive_session: bool,
}

impl EnvironmentCapabilities {
    /// Probe `PATH` for trash and elevation helpers and check whether both
    /// stdin and stdout are terminals.
    pub fn detect() -> Self {
        let capabilities = Self {
            native_trash_available: native_trash_tool_present(),
            elevation_available: elevation_tool_present(),
            interactive_session: std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
        };
        debug!(?capabilities, "Detected environment capabilities");
        capabilities
    }

    /// No native trash, no elevation, no terminal.
    pub fn headless() -> Self {
        Self {
            native_trash_available: false,
            elevation_available: false,
            interactive_session: false,
        }
    }

    /// Interactive terminal without native trash or elevation helpers.
    pub fn interactive() -> Self {
        Self {
            interactive_session: true,
            ..Self::headless()
        }
    }

    pub fn with_elevation(mut self, available: bool) -> Self {
        self.elevation_available = available;
        self
    }

    pub fn with_native_trash(mut self, available: bool) -> Self {
        self.native_trash_available = available;
        self
    }
}

fn on_path(program: &str) -> bool {
    which::which(program).is_ok()
}

fn native_trash_tool_present() -> bool {
    if cfg!(target_os = "macos") {
        on_path("osascript")
    } else if cfg!(windows) {
        on_path("powershell")
    } else {
        ["gio", "trash-put", "kioclient5"]
            .into_iter()
            .any(on_path)
    }
}

fn elevation_tool_present() -> bool {
    if cfg!(windows) {
        on_path("net")
    } else {
        on_path("sudo")
    }
}
