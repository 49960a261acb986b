//! One interactive session's worth of safety services, wired explicitly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vtguard_commons::{ProcessRunner, SafetyResult, absolutize};
use vtguard_config::SafetyConfig;

use crate::backup::{BackupManager, BackupOptions, BackupOutcome};
use crate::confirmation::{ConfirmationOptions, ConfirmationOutcome, ConfirmationService};
use crate::environment::EnvironmentCapabilities;
use crate::history::{OperationKind, OperationLedger};
use crate::operation::FileOperation;
use crate::permissions::PermissionService;
use crate::policy::SecurityPolicy;
use crate::prompt::Prompter;
use crate::trash::TrashManager;

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Back up every path before it goes to the trash.
    pub backup: bool,
    pub confirmation: ConfirmationOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletedItem {
    pub path: PathBuf,
    pub trash_id: Option<String>,
    pub native_trash: bool,
    pub backup_id: Option<String>,
    pub history_id: Option<String>,
    /// Set when this path was left in place.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub confirmation: ConfirmationOutcome,
    pub items: Vec<DeletedItem>,
}

impl DeleteReport {
    pub fn deleted(&self) -> usize {
        self.items.iter().filter(|item| item.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.deleted()
    }
}

pub struct SafetySession {
    config: SafetyConfig,
    environment: EnvironmentCapabilities,
    policy: Arc<SecurityPolicy>,
    permissions: Arc<PermissionService>,
    confirmation: ConfirmationService,
    prompter: Arc<dyn Prompter>,
    ledger: Arc<Mutex<OperationLedger>>,
    trash: Arc<Mutex<TrashManager>>,
    backups: Arc<Mutex<BackupManager>>,
}

impl SafetySession {
    /// Build every service from `config` and load the on-disk journals.
    pub fn initialize(
        config: SafetyConfig,
        environment: EnvironmentCapabilities,
        prompter: Arc<dyn Prompter>,
        runner: Arc<dyn ProcessRunner>,
    ) -> SafetyResult<Self> {
        let policy = Arc::new(SecurityPolicy::from_config(&config.policy)?);
        let permissions = Arc::new(
            PermissionService::new(
                Arc::clone(&policy),
                &config.permissions,
                environment,
                Arc::clone(&prompter),
                Arc::clone(&runner),
            )
            .with_prompt_timeout(config.confirmation.prompt_timeout()),
        );

        let ledger = OperationLedger::from_config(&config);
        ledger.initialize()?;

        let mut trash = TrashManager::from_config(&config, &environment, runner);
        trash.initialize()?;

        let mut backups = BackupManager::from_config(&config)?;
        backups.initialize()?;
        let backups = Arc::new(Mutex::new(backups));

        let confirmation =
            ConfirmationService::new(
                &config,
                Arc::clone(&permissions),
                Arc::clone(&prompter),
                environment,
            )?
            .with_backups(Arc::clone(&backups));

        info!(
            interactive = environment.interactive_session,
            native_trash = trash.native_backend().is_some(),
            "Safety session initialized"
        );

        Ok(Self {
            config,
            environment,
            policy,
            permissions,
            confirmation,
            prompter,
            ledger: Arc::new(Mutex::new(ledger)),
            trash: Arc::new(Mutex::new(trash)),
            backups,
        })
    }

    /// Clear the ledger and its snapshots. Trash and backup journals are
    /// already persisted after every mutation.
    pub async fn shutdown(&self) -> SafetyResult<()> {
        self.ledger.lock().await.shutdown()?;
        self.permissions.clear_cache();
        self.confirmation.clear_remembered();
        debug!("Safety session shut down");
        Ok(())
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn environment(&self) -> EnvironmentCapabilities {
        self.environment
    }

    pub fn policy(&self) -> &Arc<SecurityPolicy> {
        &self.policy
    }

    pub fn permissions(&self) -> &Arc<PermissionService> {
        &self.permissions
    }

    pub fn confirmation(&self) -> &ConfirmationService {
        &self.confirmation
    }

    /// The prompter every service in this session asks through.
    pub fn prompter(&self) -> &Arc<dyn Prompter> {
        &self.prompter
    }

    pub fn ledger(&self) -> &Arc<Mutex<OperationLedger>> {
        &self.ledger
    }

    pub fn trash(&self) -> &Arc<Mutex<TrashManager>> {
        &self.trash
    }

    pub fn backups(&self) -> &Arc<Mutex<BackupManager>> {
        &self.backups
    }

    /// Confirm, optionally back up, move to the trash and record each path.
    ///
    /// Nothing is touched unless the batch is confirmed. A path whose backup
    /// or trash move fails stays where it is and is reported individually.
    pub async fn guarded_delete(&self, paths: &[PathBuf], options: &DeleteOptions) -> DeleteReport {
        let paths: Vec<PathBuf> = paths.iter().map(|path| absolutize(path)).collect();
        let confirmation = self
            .confirmation
            .confirm_batch_operation(FileOperation::Delete, &paths, &options.confirmation)
            .await;
        if !confirmation.confirmed {
            info!(reason = ?confirmation.reason, "Delete not confirmed");
            return DeleteReport {
                confirmation,
                items: Vec::new(),
            };
        }

        let mut items = Vec::with_capacity(paths.len());
        for path in &paths {
            let mut item = DeletedItem {
                path: path.clone(),
                backup_id: confirmation
                    .backups
                    .iter()
                    .find(|record| &record.original_path == path)
                    .map(|record| record.id.clone()),
                ..DeletedItem::default()
            };

            if item.backup_id.is_none()
                && let Err(message) = self.backup_before_delete(path, options.backup, &mut item).await
            {
                warn!(path = %path.display(), error = %message, "Skipping delete; backup failed");
                item.error = Some(message);
                items.push(item);
                continue;
            }

            let moved = self.trash.lock().await.move_to_trash(path).await;
            match moved {
                Ok(outcome) => {
                    item.trash_id = outcome.trash_id;
                    item.native_trash = outcome.native;
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "Move to trash failed");
                    item.error = Some(error.to_string());
                    items.push(item);
                    continue;
                }
            }

            let description = match &item.trash_id {
                Some(id) => format!("delete {} (trash id {id})", path.display()),
                None => format!("delete {} (native trash)", path.display()),
            };
            match self
                .ledger
                .lock()
                .await
                .record(OperationKind::Delete, path, None, Some(&description))
            {
                Ok(outcome) => item.history_id = Some(outcome.record.id),
                Err(failure) => warn!(path = %path.display(), %failure, "Failed to record delete"),
            }
            items.push(item);
        }

        let report = DeleteReport {
            confirmation,
            items,
        };
        info!(deleted = report.deleted(), failed = report.failed(), "Guarded delete finished");
        report
    }

    async fn backup_before_delete(
        &self,
        path: &Path,
        requested: bool,
        item: &mut DeletedItem,
    ) -> Result<(), String> {
        let mut backups = self.backups.lock().await;
        let always = backups.should_always_backup(path);
        if !requested && !always {
            return Ok(());
        }
        let options = BackupOptions {
            force: requested,
            compress: None,
        };
        match backups.create_backup(path, FileOperation::Delete.as_str(), options) {
            Ok(BackupOutcome::Created { record }) => {
                item.backup_id = Some(record.id);
                Ok(())
            }
            Ok(BackupOutcome::Skipped) => Ok(()),
            Ok(BackupOutcome::TooLarge { size, limit }) if requested => Err(format!(
                "backup refused: {size} bytes exceeds the {limit} byte limit"
            )),
            Ok(BackupOutcome::TooLarge { size, .. }) => {
                debug!(path = %path.display(), size, "Too large for an automatic backup");
                Ok(())
            }
            Err(error) => Err(format!("backup failed: {error}")),
        }
    }
}
