//! Risk-gated confirmation for destructive batches.
//!
//! [`ConfirmationService::confirm_batch_operation`] is the gate every
//! destructive operation passes through. It consults the skip list, answers
//! remembered for this session, the security policy and the permission
//! service before building a preview and asking the user. Anything that
//! cannot be confirmed is declined with a reason; a timeout is a denial.

mod alternatives;
mod preview;
mod risk;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use vtguard_commons::{
    FileState, PathPattern, SafetyResult, absolutize, any_match, compile_patterns,
};
use vtguard_config::{ConfirmationConfig, SafetyConfig};

pub use alternatives::{Alternative, alternatives_for};
pub use preview::{OperationPreview, PreviewLimits, dry_run_listing, format_bytes};
pub use risk::{RiskFactor, RiskLevel, assess_path};

use self::preview::{display_paths, is_missing};
use crate::backup::{BackupManager, BackupOptions, BackupOutcome, BackupRecord};
use crate::environment::EnvironmentCapabilities;
use crate::operation::FileOperation;
use crate::permissions::{ElevationRequest, PermissionService};
use crate::policy::{PolicyDecision, SecurityPolicy};
use crate::prompt::{Prompter, confirm};

/// Per-call knobs for [`ConfirmationService::confirm_batch_operation`].
#[derive(Debug, Clone, Default)]
pub struct ConfirmationOptions {
    /// Shown in the main question instead of the generic wording.
    pub description: Option<String>,
    /// Overrides the configured prompt timeout.
    pub prompt_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfirmationOutcome {
    pub confirmed: bool,
    /// The user asked for backups and they were taken.
    pub create_backup: bool,
    pub backups: Vec<BackupRecord>,
    /// Id of the safer alternative the user picked instead.
    pub alternative: Option<String>,
    pub reason: Option<String>,
    pub preview: Option<OperationPreview>,
}

impl ConfirmationOutcome {
    fn approved(reason: Option<&str>) -> Self {
        Self {
            confirmed: true,
            reason: reason.map(str::to_string),
            ..Self::default()
        }
    }

    fn declined(reason: impl Into<String>) -> Self {
        Self {
            confirmed: false,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    fn with_preview(mut self, preview: OperationPreview) -> Self {
        self.preview = Some(preview);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogChoice {
    Approve,
    ApproveWithBackup,
    Deny,
    DryRun,
    ShowAlternatives,
}

impl DialogChoice {
    const ALL: [Self; 5] = [
        Self::Approve,
        Self::ApproveWithBackup,
        Self::Deny,
        Self::DryRun,
        Self::ShowAlternatives,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::ApproveWithBackup => "Approve with backup",
            Self::Deny => "Deny",
            Self::DryRun => "Dry run",
            Self::ShowAlternatives => "Show alternatives",
        }
    }
}

/// How the main dialog ended.
struct DialogEnd {
    outcome: ConfirmationOutcome,
    timed_out: bool,
}

impl DialogEnd {
    fn timed_out(outcome: ConfirmationOutcome) -> Self {
        Self {
            outcome,
            timed_out: true,
        }
    }
}

impl From<ConfirmationOutcome> for DialogEnd {
    fn from(outcome: ConfirmationOutcome) -> Self {
        Self {
            outcome,
            timed_out: false,
        }
    }
}

pub struct ConfirmationService {
    policy: Arc<SecurityPolicy>,
    permissions: Arc<PermissionService>,
    backups: Option<Arc<AsyncMutex<BackupManager>>>,
    prompter: Arc<dyn Prompter>,
    environment: EnvironmentCapabilities,
    config: ConfirmationConfig,
    skip_patterns: Mutex<Vec<PathPattern>>,
    always_backup: Vec<PathPattern>,
    remembered: Mutex<HashMap<(FileOperation, PathBuf), bool>>,
}

impl ConfirmationService {
    pub fn new(
        config: &SafetyConfig,
        permissions: Arc<PermissionService>,
        prompter: Arc<dyn Prompter>,
        environment: EnvironmentCapabilities,
    ) -> SafetyResult<Self> {
        Ok(Self {
            policy: Arc::clone(permissions.policy()),
            permissions,
            backups: None,
            prompter,
            environment,
            config: config.confirmation.clone(),
            skip_patterns: Mutex::new(compile_patterns(&config.confirmation.skip_patterns)?),
            always_backup: compile_patterns(&config.backup.always_backup_patterns)?,
            remembered: Mutex::new(HashMap::new()),
        })
    }

    /// Enable "Approve with backup".
    pub fn with_backups(mut self, backups: Arc<AsyncMutex<BackupManager>>) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn add_skip_pattern(&self, pattern: &str) -> SafetyResult<()> {
        let compiled = PathPattern::new(pattern)?;
        self.skip_patterns.lock().push(compiled);
        Ok(())
    }

    pub fn clear_remembered(&self) {
        self.remembered.lock().clear();
    }

    pub fn build_preview(&self, operation: FileOperation, paths: &[PathBuf]) -> OperationPreview {
        let paths: Vec<PathBuf> = paths.iter().map(|path| absolutize(path)).collect();
        OperationPreview::build(
            operation,
            &paths,
            &self.policy,
            &self.always_backup,
            PreviewLimits {
                large_total_bytes: self.config.large_total_warning_bytes,
                many_files: self.config.many_files_warning_threshold,
            },
        )
    }

    pub async fn confirm_batch_operation(
        &self,
        operation: FileOperation,
        paths: &[PathBuf],
        options: &ConfirmationOptions,
    ) -> ConfirmationOutcome {
        let paths: Vec<PathBuf> = paths.iter().map(|path| absolutize(path)).collect();
        if paths.is_empty() {
            return ConfirmationOutcome::approved(Some("no paths to confirm"));
        }
        let timeout = options.prompt_timeout.or(self.config.prompt_timeout());

        if self.all_skipped(&paths) {
            debug!(%operation, count = paths.len(), "All paths match skip patterns");
            return ConfirmationOutcome::approved(Some("all paths match skip patterns"));
        }

        if let Some(answer) = self.remembered_answer(operation, &paths) {
            debug!(%operation, answer, "Using remembered answer");
            return if answer {
                ConfirmationOutcome::approved(Some("remembered approval"))
            } else {
                ConfirmationOutcome::declined("remembered denial")
            };
        }

        let mut decisions = Vec::with_capacity(paths.len());
        for path in &paths {
            let decision = self.policy.classify(operation, path);
            if !decision.allowed {
                warn!(%operation, path = %path.display(), "Blocked by policy");
                let reason = decision
                    .reason
                    .unwrap_or_else(|| format!("operation '{operation}' is blocked by policy"));
                return ConfirmationOutcome::declined(reason);
            }
            decisions.push(decision);
        }
        if decisions.iter().all(PolicyDecision::is_unremarkable) && !self.any_risk(&paths) {
            debug!(%operation, count = paths.len(), "No confirmation needed");
            return ConfirmationOutcome::approved(None);
        }

        if let Some(declined) = self.ensure_elevation(operation, &paths, &decisions).await {
            return declined;
        }

        let preview = self.build_preview(operation, &paths);

        if !self.environment.interactive_session {
            info!(%operation, "Declining: confirmation needed in a non-interactive session");
            return ConfirmationOutcome::declined(
                "confirmation is required but the session is not interactive",
            )
            .with_preview(preview);
        }

        self.prompter
            .show(&preview.render(self.prompter.supports_color()));

        if let Some(declined) = self.confirm_risky_paths(&preview, timeout).await {
            return declined.with_preview(preview);
        }

        let DialogEnd { outcome, timed_out } =
            self.run_dialog(operation, &paths, options, timeout).await;

        // A timed-out prompt may still be reading the terminal.
        if self.config.offer_remember
            && !timed_out
            && outcome.alternative.is_none()
            && confirm(
                self.prompter.as_ref(),
                "Remember this choice for the rest of the session?",
                timeout,
            )
            .await
        {
            self.remember(operation, &paths, outcome.confirmed);
        }

        info!(
            %operation,
            confirmed = outcome.confirmed,
            backups = outcome.backups.len(),
            "Confirmation finished"
        );
        outcome.with_preview(preview)
    }

    fn all_skipped(&self, paths: &[PathBuf]) -> bool {
        let patterns = self.skip_patterns.lock();
        !patterns.is_empty() && paths.iter().all(|path| any_match(&patterns, path))
    }

    fn remembered_answer(&self, operation: FileOperation, paths: &[PathBuf]) -> Option<bool> {
        let remembered = self.remembered.lock();
        let mut all_approved = true;
        for path in paths {
            let answer = remembered.get(&(operation, path.clone()))?;
            all_approved &= *answer;
        }
        Some(all_approved)
    }

    fn remember(&self, operation: FileOperation, paths: &[PathBuf], answer: bool) {
        let mut remembered = self.remembered.lock();
        for path in paths {
            remembered.insert((operation, path.clone()), answer);
        }
    }

    fn any_risk(&self, paths: &[PathBuf]) -> bool {
        paths.iter().any(|path| {
            let state = FileState::capture(path).ok();
            assess_path(&self.policy, &self.always_backup, path, state.as_ref()).is_some()
        })
    }

    async fn ensure_elevation(
        &self,
        operation: FileOperation,
        paths: &[PathBuf],
        decisions: &[PolicyDecision],
    ) -> Option<ConfirmationOutcome> {
        let checks = self.permissions.check_many(paths, operation).await;
        for ((path, info), decision) in checks.iter().zip(decisions) {
            if !(decision.needs_elevation || info.needs_elevation) {
                continue;
            }
            let reason = decision
                .reason
                .clone()
                .unwrap_or_else(|| "the current user lacks the required access".to_string());
            let mut request = ElevationRequest::new(operation, path.clone(), reason);
            if let Some(first) = alternatives_for(operation).first() {
                request = request.with_alternative(first.description);
            }

            let elevation = self.permissions.request_elevation(&request).await;
            if !elevation.is_granted() {
                warn!(%operation, path = %path.display(), %elevation, "Elevation not granted");
                return Some(ConfirmationOutcome::declined(format!(
                    "{}: {elevation}",
                    path.display()
                )));
            }
        }
        None
    }

    async fn confirm_risky_paths(
        &self,
        preview: &OperationPreview,
        timeout: Option<Duration>,
    ) -> Option<ConfirmationOutcome> {
        for risk in preview.risks_at(RiskLevel::Critical) {
            let required = risk.path.display().to_string();
            let prompt = format!(
                "{required} is critical ({}). Type the full path to continue",
                risk.message
            );
            if !self
                .prompter
                .ask_typed_confirmation(&prompt, &required, timeout)
                .await
            {
                warn!(path = %required, "Typed confirmation did not match");
                return Some(ConfirmationOutcome::declined(format!(
                    "typed confirmation for {required} did not match"
                )));
            }
        }

        if preview.max_risk() == RiskLevel::High {
            let question = format!(
                "{} touches high-risk paths. Continue?",
                preview.operation
            );
            if !confirm(self.prompter.as_ref(), &question, timeout).await {
                return Some(ConfirmationOutcome::declined(
                    "high-risk operation was not confirmed",
                ));
            }
        }
        None
    }

    async fn run_dialog(
        &self,
        operation: FileOperation,
        paths: &[PathBuf],
        options: &ConfirmationOptions,
        timeout: Option<Duration>,
    ) -> DialogEnd {
        let choices: Vec<String> = DialogChoice::ALL
            .iter()
            .map(|choice| choice.label().to_string())
            .collect();
        let target = display_paths(paths);
        let question = match &options.description {
            Some(description) => format!("{description} ({operation} {target})"),
            None => format!("Proceed with {operation} on {target}?"),
        };

        loop {
            let answer = self.prompter.ask(&question, &choices, timeout).await;
            let Some(choice) = answer.and_then(|index| DialogChoice::ALL.get(index).copied()) else {
                debug!(%operation, "Main confirmation timed out");
                return DialogEnd::timed_out(ConfirmationOutcome::declined(
                    "no answer before the confirmation timed out",
                ));
            };
            match choice {
                DialogChoice::Approve => {
                    return ConfirmationOutcome::approved(Some("approved by user")).into();
                }
                DialogChoice::ApproveWithBackup => {
                    return self.approve_with_backup(operation, paths).await.into();
                }
                DialogChoice::Deny => return ConfirmationOutcome::declined("denied by user").into(),
                DialogChoice::DryRun => {
                    let listing =
                        dry_run_listing(operation, paths, self.config.dry_run_listing_limit);
                    self.prompter.show(&listing);
                }
                DialogChoice::ShowAlternatives => {
                    if let Some(outcome) = self.choose_alternative(operation, timeout).await {
                        return outcome.into();
                    }
                }
            }
        }
    }

    /// `None` sends the user back to the main dialog.
    async fn choose_alternative(
        &self,
        operation: FileOperation,
        timeout: Option<Duration>,
    ) -> Option<ConfirmationOutcome> {
        let alternatives = alternatives_for(operation);
        let mut choices: Vec<String> = alternatives
            .iter()
            .map(|alternative| alternative.description.to_string())
            .collect();
        choices.push("Back".to_string());

        let mut reprompts: u32 = 0;
        loop {
            match self
                .prompter
                .ask("Safer alternatives", &choices, timeout)
                .await
            {
                Some(index) => {
                    let chosen = alternatives.get(index)?;
                    info!(%operation, alternative = chosen.id, "User picked an alternative");
                    return Some(ConfirmationOutcome {
                        confirmed: false,
                        alternative: Some(chosen.id.to_string()),
                        reason: Some(format!("user chose an alternative: {}", chosen.description)),
                        ..ConfirmationOutcome::default()
                    });
                }
                None if reprompts < self.config.max_reprompts => reprompts += 1,
                None => {
                    debug!(%operation, reprompts, "Alternatives menu timed out; returning to main dialog");
                    return None;
                }
            }
        }
    }

    async fn approve_with_backup(
        &self,
        operation: FileOperation,
        paths: &[PathBuf],
    ) -> ConfirmationOutcome {
        let Some(backups) = &self.backups else {
            return ConfirmationOutcome::declined("backups are not available in this session");
        };

        let mut manager = backups.lock().await;
        let mut records = Vec::new();
        for path in paths.iter().filter(|path| !is_missing(path)) {
            match manager.create_backup(path, operation.as_str(), BackupOptions::forced()) {
                Ok(BackupOutcome::Created { record }) => records.push(record),
                Ok(BackupOutcome::TooLarge { size, limit }) => {
                    return ConfirmationOutcome::declined(format!(
                        "backup of {} refused: {} exceeds the {} limit",
                        path.display(),
                        format_bytes(size),
                        format_bytes(limit)
                    ));
                }
                Ok(BackupOutcome::Skipped) => {
                    return ConfirmationOutcome::declined(format!(
                        "backup of {} was skipped",
                        path.display()
                    ));
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "Backup before operation failed");
                    return ConfirmationOutcome::declined(format!(
                        "backup of {} failed: {error}",
                        path.display()
                    ));
                }
            }
        }

        ConfirmationOutcome {
            confirmed: true,
            create_backup: true,
            backups: records,
            reason: Some("approved with backup".to_string()),
            ..ConfirmationOutcome::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;
    use vtguard_commons::{ProcessOutput, ProcessRunner};

    use crate::prompt::{ScriptedAnswer, ScriptedPrompter};

    struct ExitWith(i32);

    #[async_trait]
    impl ProcessRunner for ExitWith {
        async fn run(
            &self,
            _program: &str,
            _args: &[String],
            _timeout: Duration,
        ) -> SafetyResult<ProcessOutput> {
            Ok(ProcessOutput {
                exit_code: Some(self.0),
                ..ProcessOutput::default()
            })
        }
    }

    struct Harness {
        tmp: TempDir,
        prompter: Arc<ScriptedPrompter>,
        backups: Arc<AsyncMutex<BackupManager>>,
        service: ConfirmationService,
    }

    impl Harness {
        fn file(&self, name: &str, content: &[u8]) -> PathBuf {
            let dir = self.tmp.path().join("work");
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    fn harness(
        answers: Vec<ScriptedAnswer>,
        environment: EnvironmentCapabilities,
        adjust: impl FnOnce(&mut SafetyConfig, &std::path::Path),
    ) -> Harness {
        let tmp = TempDir::new().unwrap();
        let mut config = SafetyConfig::default().with_storage_root(tmp.path().join("store"));
        config.policy.use_default_tables = false;
        config.backup.always_backup_patterns.clear();
        adjust(&mut config, tmp.path());

        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let policy = Arc::new(SecurityPolicy::from_config(&config.policy).unwrap());
        let permissions = Arc::new(PermissionService::new(
            policy,
            &config.permissions,
            environment,
            prompter.clone(),
            Arc::new(ExitWith(0)),
        ));
        let mut manager = BackupManager::from_config(&config).unwrap();
        manager.initialize().unwrap();
        let backups = Arc::new(AsyncMutex::new(manager));
        let service = ConfirmationService::new(&config, permissions, prompter.clone(), environment)
            .unwrap()
            .with_backups(backups.clone());

        Harness {
            tmp,
            prompter,
            backups,
            service,
        }
    }

    fn label(text: &str) -> ScriptedAnswer {
        ScriptedAnswer::Label(text.to_string())
    }

    #[tokio::test]
    async fn safe_operations_pass_without_prompting() {
        let h = harness(vec![], EnvironmentCapabilities::interactive(), |_, _| {});
        let file = h.file("notes.txt", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Read, &[file], &ConfirmationOptions::default())
            .await;
        assert!(outcome.confirmed);
        assert!(outcome.reason.is_none());
        assert!(h.prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn skip_patterns_short_circuit() {
        let h = harness(vec![], EnvironmentCapabilities::interactive(), |_, _| {});
        let file = h.file("generated.bin", b"x");
        h.service.add_skip_pattern("*/work/*").unwrap();
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(outcome.confirmed);
        assert_eq!(outcome.reason.as_deref(), Some("all paths match skip patterns"));
        assert!(h.prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn blocked_operations_are_declined() {
        let h = harness(vec![], EnvironmentCapabilities::interactive(), |config, _| {
            config.policy.blocked_operations.insert("delete".to_string());
        });
        let file = h.file("a.txt", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert!(outcome.reason.unwrap().contains("blocked by policy"));
    }

    #[tokio::test]
    async fn headless_sessions_fail_safe() {
        let h = harness(vec![], EnvironmentCapabilities::headless(), |_, _| {});
        let file = h.file("a.txt", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert!(outcome.reason.unwrap().contains("not interactive"));
        assert_eq!(outcome.preview.unwrap().affected_files, 1);
    }

    #[tokio::test]
    async fn approve_and_deny() {
        let h = harness(
            vec![label("Approve"), label("Deny")],
            EnvironmentCapabilities::interactive(),
            |_, _| {},
        );
        let file = h.file("a.txt", b"x");
        let paths = [file];
        let approved = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(approved.confirmed);
        assert!(!approved.create_backup);

        let denied = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(!denied.confirmed);
        assert_eq!(denied.reason.as_deref(), Some("denied by user"));
        assert_eq!(h.prompter.shown().len(), 2);
    }

    #[tokio::test]
    async fn approve_with_backup_creates_backups() {
        let h = harness(
            vec![label("Approve with backup")],
            EnvironmentCapabilities::interactive(),
            |_, _| {},
        );
        let file = h.file("data.txt", b"precious");
        let outcome = h
            .service
            .confirm_batch_operation(
                FileOperation::Write,
                &[file.clone()],
                &ConfirmationOptions::default(),
            )
            .await;
        assert!(outcome.confirmed);
        assert!(outcome.create_backup);
        assert_eq!(outcome.backups.len(), 1);
        assert_eq!(outcome.backups[0].original_path, file);
        assert_eq!(h.backups.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_reenters_dialog() {
        let h = harness(
            vec![label("Dry run"), label("Deny")],
            EnvironmentCapabilities::interactive(),
            |_, _| {},
        );
        let file = h.file("a.txt", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert_eq!(h.prompter.asked().len(), 2);
        assert!(h.prompter.shown().iter().any(|text| text.starts_with("Dry run: delete")));
    }

    #[tokio::test]
    async fn alternatives_can_be_chosen() {
        let h = harness(
            vec![label("Show alternatives"), ScriptedAnswer::Choice(0)],
            EnvironmentCapabilities::interactive(),
            |_, _| {},
        );
        let file = h.file("a.txt", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert_eq!(outcome.alternative.as_deref(), Some("trash"));
    }

    #[tokio::test]
    async fn alternatives_menu_reprompts_then_returns() {
        let h = harness(
            vec![
                label("Show alternatives"),
                ScriptedAnswer::Timeout,
                ScriptedAnswer::Timeout,
                label("Approve"),
            ],
            EnvironmentCapabilities::interactive(),
            |config, _| config.confirmation.max_reprompts = 1,
        );
        let file = h.file("a.txt", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(
                FileOperation::Delete,
                &[file.clone()],
                &ConfirmationOptions::default(),
            )
            .await;
        assert!(outcome.confirmed);
        let main = format!("Proceed with delete on {}?", file.display());
        assert_eq!(
            h.prompter.asked(),
            vec![
                main.clone(),
                "Safer alternatives".to_string(),
                "Safer alternatives".to_string(),
                main,
            ]
        );
    }

    #[tokio::test]
    async fn high_risk_needs_dedicated_confirmation() {
        let h = harness(
            vec![ScriptedAnswer::Timeout],
            EnvironmentCapabilities::interactive(),
            |config, _| {
                config.policy.additional_important_patterns = vec!["*.toml".to_string()];
            },
        );
        let manifest = h.file("Cargo.toml", b"[package]");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[manifest], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert_eq!(outcome.preview.unwrap().max_risk(), RiskLevel::High);
        assert_eq!(h.prompter.asked().len(), 1);
    }

    #[tokio::test]
    async fn critical_paths_require_the_exact_path() {
        let h = harness(
            vec![ScriptedAnswer::Choice(0), ScriptedAnswer::Typed("/wrong".into())],
            EnvironmentCapabilities::interactive().with_elevation(true),
            |config, root| {
                config.policy.additional_system_paths =
                    vec![root.join("work").display().to_string()];
            },
        );
        let file = h.file("kernel.img", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert!(outcome.reason.unwrap().contains("did not match"));
        assert_eq!(outcome.preview.unwrap().max_risk(), RiskLevel::Critical);
    }

    #[tokio::test]
    async fn elevation_refusal_declines() {
        let h = harness(
            vec![ScriptedAnswer::Choice(1)],
            EnvironmentCapabilities::interactive().with_elevation(true),
            |config, root| {
                config.policy.additional_system_paths =
                    vec![root.join("work").display().to_string()];
            },
        );
        let file = h.file("kernel.img", b"x");
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &[file], &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert!(outcome.reason.unwrap().contains("declined"));
        assert!(outcome.preview.is_none());
    }

    #[tokio::test]
    async fn remembered_answers_skip_the_dialog() {
        let h = harness(
            vec![label("Approve"), ScriptedAnswer::Choice(0)],
            EnvironmentCapabilities::interactive(),
            |config, _| config.confirmation.offer_remember = true,
        );
        let file = h.file("a.txt", b"x");
        let paths = [file];
        let first = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(first.confirmed);
        assert_eq!(h.prompter.asked().len(), 2);

        let second = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(second.confirmed);
        assert_eq!(second.reason.as_deref(), Some("remembered approval"));
        assert_eq!(h.prompter.asked().len(), 2);

        h.service.clear_remembered();
        let third = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(!third.confirmed);
    }

    #[tokio::test]
    async fn no_follow_up_questions_after_a_timeout() {
        let h = harness(
            vec![ScriptedAnswer::Timeout, ScriptedAnswer::Choice(0)],
            EnvironmentCapabilities::interactive(),
            |config, _| config.confirmation.offer_remember = true,
        );
        let file = h.file("a.txt", b"x");
        let paths = [file];
        let outcome = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(!outcome.confirmed);
        assert_eq!(h.prompter.asked().len(), 1);
        assert_eq!(h.prompter.remaining(), 1);

        // Nothing was remembered, so the next call asks again.
        let second = h
            .service
            .confirm_batch_operation(FileOperation::Delete, &paths, &ConfirmationOptions::default())
            .await;
        assert!(second.confirmed);
        let asked = h.prompter.asked();
        assert_eq!(asked.len(), 3);
        assert!(asked[2].starts_with("Remember"));
    }
}
