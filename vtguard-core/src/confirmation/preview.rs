use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anstyle::{AnsiColor, Color, Effects, Style};
use serde::Serialize;
use vtguard_commons::fs::{count_entries, path_size};
use vtguard_commons::{FileState, PathPattern};
use walkdir::WalkDir;

use super::risk::{RiskFactor, RiskLevel, assess_path};
use crate::operation::FileOperation;
use crate::policy::SecurityPolicy;

/// What a batch operation would touch and how risky it looks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationPreview {
    pub operation: FileOperation,
    pub paths: Vec<PathBuf>,
    pub total_items: u64,
    pub affected_files: u64,
    pub affected_directories: u64,
    pub total_size: u64,
    pub warnings: Vec<String>,
    pub risks: Vec<RiskFactor>,
}

/// Thresholds that turn into preview warnings.
#[derive(Debug, Clone, Copy)]
pub struct PreviewLimits {
    pub large_total_bytes: u64,
    pub many_files: u64,
}

impl OperationPreview {
    pub fn build(
        operation: FileOperation,
        paths: &[PathBuf],
        policy: &SecurityPolicy,
        always_backup: &[PathPattern],
        limits: PreviewLimits,
    ) -> Self {
        let mut preview = Self {
            operation,
            paths: paths.to_vec(),
            total_items: 0,
            affected_files: 0,
            affected_directories: 0,
            total_size: 0,
            warnings: Vec::new(),
            risks: Vec::new(),
        };

        for path in paths {
            let state = FileState::capture(path).ok();
            match &state {
                None => preview
                    .warnings
                    .push(format!("{} does not exist", path.display())),
                Some(state) if state.is_dir => {
                    let (files, dirs) = count_entries(path);
                    preview.affected_files += files;
                    preview.affected_directories += dirs;
                    preview.total_size += path_size(path).unwrap_or(0);
                }
                Some(state) => {
                    preview.affected_files += 1;
                    preview.total_size += state.size;
                }
            }
            if let Some(risk) = assess_path(policy, always_backup, path, state.as_ref()) {
                preview.risks.push(risk);
            }
        }

        preview.total_items = preview.affected_files + preview.affected_directories;
        if preview.total_size > limits.large_total_bytes {
            preview.warnings.push(format!(
                "large operation: {} in total",
                format_bytes(preview.total_size)
            ));
        }
        if preview.affected_files > limits.many_files {
            preview
                .warnings
                .push(format!("many files affected: {}", preview.affected_files));
        }
        preview
    }

    pub fn max_risk(&self) -> RiskLevel {
        self.risks
            .iter()
            .map(|risk| risk.level)
            .max()
            .unwrap_or(RiskLevel::Low)
    }

    pub fn risks_at(&self, level: RiskLevel) -> impl Iterator<Item = &RiskFactor> {
        self.risks.iter().filter(move |risk| risk.level == level)
    }

    /// Human-readable summary, styled with ANSI colors when `color` is set.
    pub fn render(&self, color: bool) -> String {
        let paint = |text: &str, style: Style| {
            if color {
                styled(text, style)
            } else {
                text.to_string()
            }
        };
        let heading = Style::new().effects(Effects::BOLD);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}",
            paint(&format!("Operation: {}", self.operation), heading)
        );
        let _ = writeln!(
            out,
            "  {} item(s): {} file(s), {} director(ies), {}",
            self.total_items,
            self.affected_files,
            self.affected_directories,
            format_bytes(self.total_size)
        );
        for path in &self.paths {
            let _ = writeln!(out, "  - {}", path.display());
        }
        if !self.risks.is_empty() {
            let _ = writeln!(out, "{}", paint("Risks:", heading));
            for risk in &self.risks {
                let label = format!("[{}]", risk.level.as_str().to_uppercase());
                let _ = writeln!(
                    out,
                    "  {} {}: {}",
                    paint(&label, risk_style(risk.level)),
                    risk.path.display(),
                    risk.message
                );
            }
        }
        if !self.warnings.is_empty() {
            let warn = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
            let _ = writeln!(out, "{}", paint("Warnings:", heading));
            for warning in &self.warnings {
                let _ = writeln!(out, "  {}", paint(warning, warn));
            }
        }
        out
    }
}

fn styled(text: &str, style: Style) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn risk_style(level: RiskLevel) -> Style {
    let color = match level {
        RiskLevel::Low => AnsiColor::Green,
        RiskLevel::Medium => AnsiColor::Yellow,
        RiskLevel::High => AnsiColor::Red,
        RiskLevel::Critical => AnsiColor::Magenta,
    };
    let style = Style::new().fg_color(Some(Color::Ansi(color)));
    if level >= RiskLevel::High {
        style.effects(Effects::BOLD)
    } else {
        style
    }
}

/// Recursive listing of what `operation` would touch, capped at `limit` lines.
pub fn dry_run_listing(operation: FileOperation, paths: &[PathBuf], limit: usize) -> String {
    let mut lines = Vec::new();
    let mut hidden: usize = 0;
    for path in paths {
        if path.symlink_metadata().is_err() {
            lines.push(format!("skip {} (missing)", path.display()));
            continue;
        }
        for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
            if lines.len() >= limit {
                hidden += 1;
                continue;
            }
            let marker = if entry.file_type().is_dir() { "/" } else { "" };
            lines.push(format!("{operation} {}{marker}", entry.path().display()));
        }
    }

    let mut out = format!("Dry run: {operation}\n");
    for line in &lines {
        let _ = writeln!(out, "  {line}");
    }
    if hidden > 0 {
        let _ = writeln!(out, "  ... and {hidden} more");
    }
    out
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub(super) fn display_paths(paths: &[PathBuf]) -> String {
    match paths {
        [single] => single.display().to_string(),
        _ => format!("{} paths", paths.len()),
    }
}

pub(super) fn is_missing(path: &Path) -> bool {
    path.symlink_metadata().is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vtguard_config::PolicyConfig;

    fn limits() -> PreviewLimits {
        PreviewLimits {
            large_total_bytes: 10,
            many_files: 2,
        }
    }

    #[test]
    fn counts_sizes_and_warnings() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("dir");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a"), b"123456").unwrap();
        fs::write(dir.join("nested/b"), b"123456").unwrap();
        let file = tmp.path().join("c.txt");
        fs::write(&file, b"x").unwrap();
        let missing = tmp.path().join("gone");

        let policy = SecurityPolicy::from_config(&PolicyConfig {
            use_default_tables: false,
            ..PolicyConfig::default()
        })
        .unwrap();
        let preview = OperationPreview::build(
            FileOperation::Delete,
            &[dir, file, missing],
            &policy,
            &[],
            limits(),
        );

        assert_eq!(preview.affected_files, 3);
        assert_eq!(preview.affected_directories, 2);
        assert_eq!(preview.total_items, 5);
        assert_eq!(preview.total_size, 13);
        assert_eq!(preview.warnings.len(), 3);
        assert!(preview.warnings[0].ends_with("gone does not exist"));
        assert_eq!(preview.max_risk(), RiskLevel::Low);

        let plain = preview.render(false);
        assert!(plain.contains("Operation: delete"));
        assert!(!plain.contains('\u{1b}'));
        assert!(preview.render(true).contains('\u{1b}'));
    }

    #[test]
    fn dry_run_is_truncated() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("many");
        fs::create_dir_all(&dir).unwrap();
        for index in 0..5 {
            fs::write(dir.join(format!("f{index}")), b"").unwrap();
        }
        let listing = dry_run_listing(FileOperation::Rmdir, &[dir], 3);
        assert!(listing.starts_with("Dry run: rmdir"));
        assert!(listing.contains("... and 3 more"));
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(100 * 1024 * 1024), "100.0 MiB");
    }
}
