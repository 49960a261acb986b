//! Shared building blocks for the vtguard crates: the error taxonomy, path
//! helpers, glob patterns, atomic JSON journals, filesystem utilities and the
//! subprocess runner used for native trash and elevation probes.
//!
//! Nothing in here knows about policies or prompts; those live in
//! `vtguard-core`.

pub mod errors;
pub mod fs;
pub mod journal;
pub mod paths;
pub mod pattern;
pub mod process;

pub use errors::{ErrorKind, SafetyError, SafetyResult};
pub use fs::FileState;
pub use journal::{JOURNAL_FILE_NAME, Journal};
pub use paths::{
    absolutize, alternative_restore_path, expand_home, has_path_prefix, normalize_path,
    resolve_existing_ancestor, resolve_path,
};
pub use pattern::{PathPattern, any_match, compile_patterns, glob_to_regex};
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
