/// Config file discovery
pub mod files {
    pub const CONFIG_FILE_NAME: &str = "vtguard.toml";
    pub const CONFIG_DIR_NAME: &str = ".vtguard";
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/vtguard/vtguard.toml";
    pub const CONFIG_PATH_ENV_VAR: &str = "VTGUARD_CONFIG_PATH";
    pub const WORKSPACE_ENV_VAR: &str = "VTGUARD_WORKSPACE";
}

/// Default storage locations; `~` is expanded at use time
pub mod storage {
    pub const DEFAULT_HISTORY_DIR: &str = "~/.vtguard/history";
    pub const DEFAULT_TRASH_DIR: &str = "~/.vtguard/trash";
    pub const DEFAULT_BACKUP_DIR: &str = "~/.vtguard/backups";
}

/// Default limits
pub mod limits {
    pub const DEFAULT_MAX_HISTORY_SIZE: usize = 100;
    pub const DEFAULT_PERMISSION_CACHE_TTL_SECONDS: u64 = 60;
    pub const DEFAULT_PROCESS_TIMEOUT_MS: u64 = 5_000;
    pub const DEFAULT_MAX_BACKUP_SIZE_BYTES: u64 = 100 * 1024 * 1024;
    pub const DEFAULT_TRASH_RETENTION_DAYS: u64 = 30;
    pub const DEFAULT_BACKUP_RETENTION_DAYS: u64 = 30;
    pub const DEFAULT_MAX_REPROMPTS: u32 = 3;
    pub const DEFAULT_LARGE_TOTAL_WARNING_BYTES: u64 = 100 * 1024 * 1024;
    pub const DEFAULT_MANY_FILES_WARNING_THRESHOLD: u64 = 100;
    pub const DEFAULT_DRY_RUN_LISTING_LIMIT: usize = 200;
}

/// Operation names accepted in `policy.blocked_operations`
pub const KNOWN_OPERATIONS: &[&str] = &[
    "read", "list", "stat", "create", "write", "copy", "move", "delete", "mkdir", "rmdir",
    "chmod", "chown", "execute",
];

/// Path prefixes owned by the operating system.
pub const DEFAULT_SYSTEM_PATHS: &[&str] = &[
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/lib",
    "/lib64",
    "/proc",
    "/root",
    "/sbin",
    "/sys",
    "/usr",
    "/var/db",
    "/var/lib",
    "/var/log",
    "/var/spool",
    "/System",
    "/Library",
    "/private/etc",
    "/private/var/db",
    "C:/Windows",
    "C:/Program Files",
    "C:/Program Files (x86)",
    "C:/ProgramData",
];

/// Paths holding credentials or other secrets.
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    "~/.ssh/*",
    "~/.gnupg/*",
    "~/.aws/*",
    "~/.azure/*",
    "~/.kube/*",
    "~/.docker/config.json",
    "~/.config/gcloud/*",
    "~/.netrc",
    "~/.npmrc",
    "~/.pypirc",
    "~/.git-credentials",
    "*/.ssh/*",
    "*/.gnupg/*",
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
    "id_rsa",
    "id_ed25519",
];

/// Configuration and build files whose loss breaks a project.
pub const DEFAULT_IMPORTANT_FILE_PATTERNS: &[&str] = &[
    "*/.git/*",
    ".gitignore",
    ".gitmodules",
    ".editorconfig",
    "*/.vscode/*",
    "*/.idea/*",
    "Cargo.toml",
    "Cargo.lock",
    "package.json",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "pyproject.toml",
    "requirements.txt",
    "go.mod",
    "go.sum",
    "Makefile",
    "Dockerfile",
    "docker-compose.yml",
    "*.toml",
    "*.yaml",
    "*.yml",
    "*.ini",
    "*.conf",
    "*.cfg",
    ".*rc",
];

/// Files that always get a backup before being touched.
pub const DEFAULT_ALWAYS_BACKUP_PATTERNS: &[&str] = &[
    ".env",
    ".env.*",
    "*.sqlite",
    "*.db",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
];

/// Paths the confirmation layer never asks about.
pub const DEFAULT_SKIP_PATTERNS: &[&str] = &["*/node_modules/*", "*/target/debug/*", "*/.cache/*"];
