//! TTL cache for permission lookups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use super::PermissionInfo;
use crate::operation::FileOperation;

#[derive(Debug, Clone)]
struct CacheEntry {
    info: PermissionInfo,
    timestamp: Instant,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub ttl_seconds: u64,
}

/// Permission lookups keyed by resolved path and operation.
///
/// Entries only go away through TTL expiry or an explicit clear; the cache is
/// not told about filesystem changes.
#[derive(Debug)]
pub struct PermissionCache {
    entries: HashMap<(PathBuf, FileOperation), CacheEntry>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, path: &Path, operation: FileOperation) -> Option<PermissionInfo> {
        let entry = self.entries.get(&(path.to_path_buf(), operation))?;
        if entry.timestamp.elapsed() < self.ttl {
            debug!(
                path = %path.display(),
                %operation,
                "Permission cache hit ({}ms old)",
                entry.timestamp.elapsed().as_millis()
            );
            Some(entry.info.clone())
        } else {
            None
        }
    }

    pub fn put(&mut self, path: &Path, operation: FileOperation, info: PermissionInfo) {
        if self.ttl.is_zero() {
            return;
        }
        debug!(
            path = %path.display(),
            %operation,
            needs_elevation = info.needs_elevation,
            "Cached permission info"
        );
        self.entries.insert(
            (path.to_path_buf(), operation),
            CacheEntry {
                info,
                timestamp: Instant::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.timestamp.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.timestamp.elapsed() >= self.ttl)
            .count();
        CacheStats {
            total: self.entries.len(),
            expired,
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        debug!("Permission cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn info() -> PermissionInfo {
        PermissionInfo::restricted()
    }

    #[test]
    fn stores_per_path_and_operation() {
        let mut cache = PermissionCache::with_ttl(Duration::from_secs(60));
        cache.put(Path::new("/a"), FileOperation::Delete, info());
        assert!(cache.get(Path::new("/a"), FileOperation::Delete).is_some());
        assert!(cache.get(Path::new("/a"), FileOperation::Read).is_none());
        assert!(cache.get(Path::new("/b"), FileOperation::Delete).is_none());
    }

    #[test]
    fn entries_expire() {
        let mut cache = PermissionCache::with_ttl(Duration::from_millis(50));
        cache.put(Path::new("/a"), FileOperation::Write, info());
        thread::sleep(Duration::from_millis(80));
        assert!(cache.get(Path::new("/a"), FileOperation::Write).is_none());
        assert_eq!(cache.stats().expired, 1);
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.stats().total, 0);
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let mut cache = PermissionCache::with_ttl(Duration::ZERO);
        cache.put(Path::new("/a"), FileOperation::Write, info());
        assert_eq!(cache.stats().total, 0);
    }
}
