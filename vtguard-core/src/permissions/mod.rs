//! Filesystem permission queries and privilege elevation.

mod cache;
mod elevation;

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};
use vtguard_commons::{ProcessRunner, resolve_path};
use vtguard_config::PermissionsConfig;

pub use cache::{CacheStats, PermissionCache};
pub use elevation::{ElevationDecision, ElevationRequest, probe_command, run_probe};

use crate::environment::EnvironmentCapabilities;
use crate::operation::{FileOperation, RequiredAccess};
use crate::policy::SecurityPolicy;
use crate::prompt::{Prompter, confirm};

/// Effective access the current process has to a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionInfo {
    pub exists: bool,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub owner: Option<u32>,
    pub group: Option<u32>,
    pub mode: Option<u32>,
    pub needs_elevation: bool,
}

impl PermissionInfo {
    /// Nothing granted; used whenever the path cannot be inspected.
    pub fn restricted() -> Self {
        Self {
            exists: false,
            readable: false,
            writable: false,
            executable: false,
            owner: None,
            group: None,
            mode: None,
            needs_elevation: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Access {
    read: bool,
    write: bool,
    execute: bool,
    owner: bool,
    root: bool,
}

impl Access {
    fn grants(self, required: RequiredAccess) -> bool {
        match required {
            RequiredAccess::None => true,
            RequiredAccess::Read => self.read,
            RequiredAccess::Write => self.write,
            RequiredAccess::Execute => self.execute,
            RequiredAccess::Owner => self.owner || self.root,
            RequiredAccess::Root => self.root,
        }
    }
}

#[cfg(unix)]
fn effective_access(_path: &Path, metadata: &Metadata) -> Access {
    use nix::unistd::{getegid, geteuid};
    use std::os::unix::fs::MetadataExt;

    let mode = metadata.mode();
    let euid = geteuid().as_raw();
    if euid == 0 {
        return Access {
            read: true,
            write: true,
            execute: mode & 0o111 != 0,
            owner: metadata.uid() == 0,
            root: true,
        };
    }

    let is_owner = metadata.uid() == euid;
    let (read_bit, write_bit, exec_bit) = if is_owner {
        (0o400, 0o200, 0o100)
    } else if metadata.gid() == getegid().as_raw() || in_supplementary_group(metadata.gid()) {
        (0o040, 0o020, 0o010)
    } else {
        (0o004, 0o002, 0o001)
    };

    Access {
        read: mode & read_bit != 0,
        write: mode & write_bit != 0,
        execute: mode & exec_bit != 0,
        owner: is_owner,
        root: false,
    }
}

#[cfg(target_os = "linux")]
fn in_supplementary_group(gid: u32) -> bool {
    nix::unistd::getgroups()
        .map(|groups| groups.iter().any(|group| group.as_raw() == gid))
        .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn in_supplementary_group(_gid: u32) -> bool {
    false
}

#[cfg(not(unix))]
fn effective_access(path: &Path, metadata: &Metadata) -> Access {
    const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com", "ps1"];
    let executable = metadata.is_dir()
        || path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXECUTABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    Access {
        read: true,
        write: !metadata.permissions().readonly(),
        execute: executable,
        owner: true,
        root: false,
    }
}

#[cfg(unix)]
fn ownership(metadata: &Metadata) -> (Option<u32>, Option<u32>, Option<u32>) {
    use std::os::unix::fs::MetadataExt;
    (
        Some(metadata.uid()),
        Some(metadata.gid()),
        Some(metadata.mode() & 0o7777),
    )
}

#[cfg(not(unix))]
fn ownership(metadata: &Metadata) -> (Option<u32>, Option<u32>, Option<u32>) {
    (None, None, Some(vtguard_commons::fs::permission_bits(metadata)))
}

async fn directory_writable(dir: &Path) -> bool {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) => effective_access(dir, &metadata).write,
        Err(_) => false,
    }
}

async fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        if let Ok(metadata) = tokio::fs::metadata(ancestor).await
            && metadata.is_dir()
        {
            return Some(ancestor.to_path_buf());
        }
    }
    None
}

/// Answers "may this process do X to Y" and brokers elevation requests.
pub struct PermissionService {
    policy: Arc<SecurityPolicy>,
    cache: Mutex<PermissionCache>,
    prompter: Arc<dyn Prompter>,
    runner: Arc<dyn ProcessRunner>,
    environment: EnvironmentCapabilities,
    process_timeout: Duration,
    prompt_timeout: Option<Duration>,
    allow_elevation: bool,
}

impl PermissionService {
    pub fn new(
        policy: Arc<SecurityPolicy>,
        config: &PermissionsConfig,
        environment: EnvironmentCapabilities,
        prompter: Arc<dyn Prompter>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            policy,
            cache: Mutex::new(PermissionCache::with_ttl(Duration::from_secs(
                config.cache_ttl_seconds,
            ))),
            prompter,
            runner,
            environment,
            process_timeout: Duration::from_millis(config.process_timeout_ms),
            prompt_timeout: None,
            allow_elevation: config.allow_elevation,
        }
    }

    pub fn with_prompt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &Arc<SecurityPolicy> {
        &self.policy
    }

    /// Look up (or compute and cache) the access `operation` needs on `path`.
    ///
    /// Never fails: anything that cannot be inspected is reported as fully
    /// restricted and needing elevation.
    pub async fn check_permissions(&self, path: &Path, operation: FileOperation) -> PermissionInfo {
        let resolved = resolve_path(path);
        if let Some(info) = self.cache.lock().get(&resolved, operation) {
            return info;
        }

        let info = self.inspect(&resolved, operation).await;
        self.cache.lock().put(&resolved, operation, info.clone());
        info
    }

    /// Check independent paths concurrently, preserving input order.
    pub async fn check_many(
        &self,
        paths: &[PathBuf],
        operation: FileOperation,
    ) -> Vec<(PathBuf, PermissionInfo)> {
        let checks = paths.iter().map(|path| async move {
            let info = self.check_permissions(path, operation).await;
            (path.clone(), info)
        });
        join_all(checks).await
    }

    async fn inspect(&self, path: &Path, operation: FileOperation) -> PermissionInfo {
        let system = self.policy.is_system_path(path);

        match tokio::fs::metadata(path).await {
            Ok(metadata) => {
                let access = effective_access(path, &metadata);
                let granted = access.grants(operation.required_access());
                let parent_ok = if operation.requires_parent_write() {
                    match path.parent() {
                        Some(parent) if !parent.as_os_str().is_empty() => {
                            directory_writable(parent).await
                        }
                        _ => false,
                    }
                } else {
                    true
                };
                let (owner, group, mode) = ownership(&metadata);
                debug!(
                    path = %path.display(),
                    %operation,
                    granted,
                    parent_ok,
                    system,
                    "Inspected permissions"
                );
                PermissionInfo {
                    exists: true,
                    readable: access.read,
                    writable: access.write,
                    executable: access.execute,
                    owner,
                    group,
                    mode,
                    needs_elevation: system || !granted || !parent_ok,
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                let Some(ancestor) = nearest_existing_ancestor(path).await else {
                    return PermissionInfo::restricted();
                };
                let writable = directory_writable(&ancestor).await;
                debug!(
                    path = %path.display(),
                    ancestor = %ancestor.display(),
                    writable,
                    "Path missing; checked nearest existing ancestor"
                );
                PermissionInfo {
                    exists: false,
                    readable: false,
                    writable,
                    executable: false,
                    owner: None,
                    group: None,
                    mode: None,
                    needs_elevation: system || !writable,
                }
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "Failed to stat path; treating as restricted");
                PermissionInfo::restricted()
            }
        }
    }

    /// Decide whether an elevated operation may proceed.
    ///
    /// Destructive operations need a positive answer from the user first; the
    /// platform probe only runs when the environment offers elevation.
    pub async fn request_elevation(&self, request: &ElevationRequest) -> ElevationDecision {
        if self.policy.is_blocked(request.operation) {
            warn!(operation = %request.operation, path = %request.path.display(), "Elevation blocked by policy");
            return ElevationDecision::Blocked;
        }

        if self.policy.is_destructive(request.operation) {
            let mut question = format!(
                "Elevated privileges are needed to {} {} ({})",
                request.operation,
                request.path.display(),
                request.reason
            );
            if let Some(alternative) = &request.alternative {
                question.push_str(&format!(". Alternative: {alternative}"));
            }
            question.push_str(". Request elevation?");

            if !confirm(self.prompter.as_ref(), &question, self.prompt_timeout).await {
                debug!(path = %request.path.display(), "Elevation declined");
                return ElevationDecision::Declined;
            }
        }

        if !self.allow_elevation {
            return ElevationDecision::unavailable("elevation is disabled by configuration");
        }
        if !self.environment.elevation_available {
            return ElevationDecision::unavailable(
                "no elevation mechanism is available in this environment",
            );
        }

        run_probe(self.runner.as_ref(), self.process_timeout).await
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn prune_expired(&self) -> usize {
        self.cache.lock().cleanup_expired()
    }
}
