use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vtguard_commons::{ProcessOutput, ProcessRunner, SafetyResult};
use vtguard_config::SafetyConfig;
use vtguard_core::{
    DeleteOptions, DeleteReport, EnvironmentCapabilities, RiskLevel, SafetySession,
    ScriptedAnswer, ScriptedPrompter,
};

/// Stands in for `sudo -n true` succeeding.
struct ProbeSucceeds;

#[async_trait]
impl ProcessRunner for ProbeSucceeds {
    async fn run(
        &self,
        _program: &str,
        _args: &[String],
        _timeout: Duration,
    ) -> SafetyResult<ProcessOutput> {
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..ProcessOutput::default()
        })
    }
}

struct Outcome {
    report: DeleteReport,
    file_still_there: bool,
    asked: Vec<String>,
}

/// Delete a file under a directory configured as a system path. `answers`
/// receives the file's path so scripts can type it back.
async fn delete_critical_file(answers: impl FnOnce(&str) -> Vec<ScriptedAnswer>) -> Outcome {
    let tmp = TempDir::new().unwrap();
    let protected = tmp.path().join("protected");
    fs::create_dir_all(&protected).unwrap();
    let file = protected.join("firmware.bin");
    fs::write(&file, b"blob").unwrap();

    let mut config = SafetyConfig::default().with_storage_root(tmp.path().join("store"));
    config.policy.use_default_tables = false;
    config.policy.additional_system_paths = vec![protected.display().to_string()];
    config.trash.use_native_trash = false;

    let prompter = Arc::new(ScriptedPrompter::new(answers(&file.display().to_string())));
    let session = SafetySession::initialize(
        config,
        EnvironmentCapabilities::interactive().with_elevation(true),
        prompter.clone(),
        Arc::new(ProbeSucceeds),
    )
    .unwrap();

    let report = session
        .guarded_delete(&[file.clone()], &DeleteOptions::default())
        .await;
    Outcome {
        report,
        file_still_there: file.exists(),
        asked: prompter.asked(),
    }
}

#[tokio::test]
async fn typing_the_exact_critical_path_approves() {
    let outcome = delete_critical_file(|path| {
        vec![
            ScriptedAnswer::Label("Yes".into()),
            ScriptedAnswer::Typed(path.to_string()),
            ScriptedAnswer::Label("Approve".into()),
        ]
    })
    .await;

    assert!(outcome.report.confirmation.confirmed);
    let preview = outcome.report.confirmation.preview.as_ref().unwrap();
    assert_eq!(preview.max_risk(), RiskLevel::Critical);
    assert_eq!(outcome.report.deleted(), 1);
    assert!(!outcome.file_still_there);
    assert_eq!(outcome.asked.len(), 3);
    assert!(outcome.asked[1].contains("Type the full path"));
}

#[tokio::test]
async fn any_other_text_denies_the_critical_path() {
    for typed in ["firmware.bin", "", "/protected/firmware.bin"] {
        let outcome = delete_critical_file(|_| {
            vec![
                ScriptedAnswer::Label("Yes".into()),
                ScriptedAnswer::Typed(typed.to_string()),
                ScriptedAnswer::Label("Approve".into()),
            ]
        })
        .await;

        assert!(!outcome.report.confirmation.confirmed, "typed {typed:?}");
        assert!(outcome.report.items.is_empty());
        assert!(outcome.file_still_there);
        assert_eq!(outcome.asked.len(), 2);
    }
}

#[tokio::test]
async fn timing_out_at_the_typed_prompt_denies() {
    let outcome = delete_critical_file(|_| {
        vec![ScriptedAnswer::Label("Yes".into()), ScriptedAnswer::Timeout]
    })
    .await;
    assert!(!outcome.report.confirmation.confirmed);
    assert!(outcome.file_still_there);
}

#[cfg(unix)]
#[tokio::test]
async fn a_symlink_into_a_system_path_still_requires_typing() {
    let tmp = TempDir::new().unwrap();
    let system = tmp.path().join("sys");
    fs::create_dir_all(&system).unwrap();
    fs::write(system.join("hosts"), b"127.0.0.1 localhost").unwrap();
    let link = tmp.path().join("link");
    std::os::unix::fs::symlink(&system, &link).unwrap();
    let through_link = link.join("hosts");

    let mut config = SafetyConfig::default().with_storage_root(tmp.path().join("store"));
    config.policy.use_default_tables = false;
    config.policy.additional_system_paths = vec![system.display().to_string()];
    config.trash.use_native_trash = false;

    let prompter = Arc::new(ScriptedPrompter::new(vec![
        ScriptedAnswer::Label("Yes".into()),
        ScriptedAnswer::Label("Approve".into()),
    ]));
    let session = SafetySession::initialize(
        config,
        EnvironmentCapabilities::interactive().with_elevation(true),
        prompter.clone(),
        Arc::new(ProbeSucceeds),
    )
    .unwrap();

    let report = session
        .guarded_delete(&[through_link.clone()], &DeleteOptions::default())
        .await;

    let preview = report.confirmation.preview.as_ref().unwrap();
    assert_eq!(preview.max_risk(), RiskLevel::Critical);
    assert!(!report.confirmation.confirmed);
    assert!(report.items.is_empty());
    assert!(system.join("hosts").exists());
    let asked = prompter.asked();
    assert!(asked[1].contains("Type the full path"), "{asked:?}");
    assert!(asked[1].starts_with(&through_link.display().to_string()));
}
