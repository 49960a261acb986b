//! Safety layer for destructive file operations.
//!
//! The crate is organised bottom-up:
//!
//! - [`history`]: linear undo/redo ledger with pre-state capture
//! - [`trash`]: reversible deletion through the desktop or a private trash
//! - [`backup`]: checksummed, optionally compressed backups
//! - [`policy`] and [`permissions`]: static classification, effective
//!   access checks and elevation requests
//! - [`confirmation`]: risk preview and the interactive approval dialog
//!
//! [`SafetySession`] wires all of them together from a
//! [`vtguard_config::SafetyConfig`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use vtguard_commons::TokioProcessRunner;
//! use vtguard_config::SafetyConfig;
//! use vtguard_core::{DeleteOptions, DialoguerPrompter, EnvironmentCapabilities, SafetySession};
//!
//! # async fn run() -> vtguard_commons::SafetyResult<()> {
//! let session = SafetySession::initialize(
//!     SafetyConfig::default(),
//!     EnvironmentCapabilities::detect(),
//!     Arc::new(DialoguerPrompter::new()),
//!     Arc::new(TokioProcessRunner),
//! )?;
//! let report = session
//!     .guarded_delete(&["build.log".into()], &DeleteOptions::default())
//!     .await;
//! println!("deleted {}", report.deleted());
//! session.shutdown().await
//! # }
//! ```

pub mod backup;
pub mod confirmation;
pub mod environment;
pub mod history;
pub mod operation;
pub mod permissions;
pub mod policy;
pub mod prompt;
pub mod retention;
pub mod session;
pub mod trash;

pub use backup::{
    BackupManager, BackupOptions, BackupOutcome, BackupRecord, DiskUsage, RestoreOptions,
};
pub use confirmation::{
    Alternative, ConfirmationOptions, ConfirmationOutcome, ConfirmationService, OperationPreview,
    RiskFactor, RiskLevel, alternatives_for,
};
pub use environment::EnvironmentCapabilities;
pub use history::{
    LedgerFailure, LedgerOutcome, LedgerResult, OperationKind, OperationLedger, OperationRecord,
};
pub use operation::{FileOperation, PathKind, RequiredAccess};
pub use permissions::{
    CacheStats, ElevationDecision, ElevationRequest, PermissionInfo, PermissionService,
};
pub use policy::{PolicyDecision, SecurityPolicy};
pub use prompt::{DialoguerPrompter, Prompter, ScriptedAnswer, ScriptedPrompter, confirm};
pub use retention::CleanupReport;
pub use session::{DeleteOptions, DeleteReport, DeletedItem, SafetySession};
pub use trash::{NativeTrash, TrashEntry, TrashManager, TrashOutcome};
