//! ShieldFlow Cache - content-addressed memoization of scan results
//!
//! One record per key, where a key is the SHA-256 of
//! (category, target, backend). Records embed their own write timestamp, so
//! freshness never depends on filesystem metadata; an expired or corrupt
//! record reads as a miss and is deleted on the spot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shieldflow_core::{Error, Result, ScanCategory, ScanResult, ScanTarget};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default validity window for cached results
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    result: ScanResult,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: u64,
}

/// On-disk scan result cache
pub struct ScanCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ScanCache {
    /// Open (creating if needed) a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Cache(format!("failed to create cache dir: {e}")))?;
        Ok(Self { dir, ttl })
    }

    /// Deterministic key for a (category, target, backend) triple
    pub fn key(category: ScanCategory, target: &ScanTarget, backend: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(category.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(target.display().as_bytes());
        hasher.update(b":");
        hasher.update(backend.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read a cached result, or absent.
    ///
    /// A corrupt or expired entry is deleted and reported as a miss; a
    /// freshness that cannot be verified (timestamp in the future) counts
    /// as expired.
    pub fn get(
        &self,
        category: ScanCategory,
        target: &ScanTarget,
        backend: &str,
    ) -> Option<ScanResult> {
        let path = self.entry_path(&Self::key(category, target, backend));
        let raw = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "removing corrupt cache entry");
                remove_entry(&path);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.cached_at);
        let fresh = age >= chrono::Duration::zero()
            && age.to_std().map(|a| a < self.ttl).unwrap_or(false);
        if !fresh {
            debug!(backend, category = %category, "cache entry expired");
            remove_entry(&path);
            return None;
        }

        debug!(backend, category = %category, "cache hit");
        Some(entry.result)
    }

    /// Persist a result, replacing any prior entry for the same key.
    ///
    /// Write failures are logged, never fatal: scanning proceeds without
    /// caching. The entry is written to a sibling temp file and renamed in,
    /// so a concurrent read never observes a partial record.
    pub fn put(&self, result: &ScanResult) {
        let key = Self::key(result.category, &result.target, &result.backend);
        let path = self.entry_path(&key);
        let entry = CacheEntry {
            cached_at: Utc::now(),
            result: result.clone(),
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize cache entry");
                return;
            }
        };

        let tmp = self.dir.join(format!("{key}.tmp"));
        if let Err(e) = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, &path)) {
            warn!(error = %e, "failed to write cache entry");
        }
    }

    /// Remove every entry regardless of TTL; used for forced re-scans
    pub fn invalidate_all(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to read cache dir");
                return;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                remove_entry(&path);
            }
        }
        debug!("cache invalidated");
    }

    /// Entry counts and on-disk size
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total_entries: 0,
            valid_entries: 0,
            expired_entries: 0,
            total_size_bytes: 0,
        };
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return stats;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            stats.total_entries += 1;
            if let Ok(meta) = entry.metadata() {
                stats.total_size_bytes += meta.len();
            }
            let valid = fs::read_to_string(&path)
                .ok()
                .and_then(|raw| serde_json::from_str::<CacheEntry>(&raw).ok())
                .map(|e| {
                    let age = Utc::now().signed_duration_since(e.cached_at);
                    age >= chrono::Duration::zero()
                        && age.to_std().map(|a| a < self.ttl).unwrap_or(false)
                })
                .unwrap_or(false);
            if valid {
                stats.valid_entries += 1;
            } else {
                stats.expired_entries += 1;
            }
        }
        stats
    }
}

fn remove_entry(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to delete cache entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shieldflow_core::Vulnerability;
    use tempfile::TempDir;

    fn sample_result() -> ScanResult {
        ScanResult::completed(
            "semgrep",
            ScanTarget::path("/srv/app"),
            ScanCategory::Sast,
            vec![Vulnerability::builder("r1", "semgrep")
                .title("finding")
                .build()],
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_key_is_deterministic() {
        let target = ScanTarget::path("/srv/app");
        let a = ScanCache::key(ScanCategory::Sast, &target, "semgrep");
        let b = ScanCache::key(ScanCategory::Sast, &target, "semgrep");
        assert_eq!(a, b);
        let c = ScanCache::key(ScanCategory::Sca, &target, "semgrep");
        assert_ne!(a, c);
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = ScanCache::new(dir.path(), DEFAULT_TTL).unwrap();
        let result = sample_result();

        assert!(cache
            .get(ScanCategory::Sast, &result.target, "semgrep")
            .is_none());

        cache.put(&result);
        let hit = cache
            .get(ScanCategory::Sast, &result.target, "semgrep")
            .unwrap();
        assert_eq!(hit.backend, "semgrep");
        assert_eq!(hit.vulnerabilities.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let dir = TempDir::new().unwrap();
        let cache = ScanCache::new(dir.path(), Duration::from_secs(3600)).unwrap();
        let result = sample_result();

        // simulate the clock: write an entry stamped two hours in the past
        let key = ScanCache::key(ScanCategory::Sast, &result.target, "semgrep");
        let entry = CacheEntry {
            cached_at: Utc::now() - chrono::Duration::seconds(7200),
            result: result.clone(),
        };
        let path = cache.entry_path(&key);
        fs::write(&path, serde_json::to_vec(&entry).unwrap()).unwrap();

        assert!(cache
            .get(ScanCategory::Sast, &result.target, "semgrep")
            .is_none());
        assert!(!path.exists(), "expired entry should be deleted on read");
    }

    #[test]
    fn test_future_timestamp_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ScanCache::new(dir.path(), DEFAULT_TTL).unwrap();
        let result = sample_result();

        let key = ScanCache::key(ScanCategory::Sast, &result.target, "semgrep");
        let entry = CacheEntry {
            cached_at: Utc::now() + chrono::Duration::seconds(600),
            result: result.clone(),
        };
        fs::write(cache.entry_path(&key), serde_json::to_vec(&entry).unwrap()).unwrap();

        assert!(cache
            .get(ScanCategory::Sast, &result.target, "semgrep")
            .is_none());
    }

    #[test]
    fn test_corrupt_entry_self_heals() {
        let dir = TempDir::new().unwrap();
        let cache = ScanCache::new(dir.path(), DEFAULT_TTL).unwrap();
        let target = ScanTarget::path("/srv/app");

        let key = ScanCache::key(ScanCategory::Iac, &target, "checkov");
        let path = cache.entry_path(&key);
        fs::write(&path, b"{ truncated").unwrap();

        assert!(cache.get(ScanCategory::Iac, &target, "checkov").is_none());
        assert!(!path.exists(), "corrupt entry should be deleted on read");
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = ScanCache::new(dir.path(), DEFAULT_TTL).unwrap();
        let first = sample_result();
        cache.put(&first);

        let second = ScanResult::completed(
            "semgrep",
            first.target.clone(),
            ScanCategory::Sast,
            Vec::new(),
            Duration::from_secs(1),
        );
        cache.put(&second);

        let hit = cache
            .get(ScanCategory::Sast, &first.target, "semgrep")
            .unwrap();
        assert!(hit.vulnerabilities.is_empty());
    }

    #[test]
    fn test_invalidate_all_and_stats() {
        let dir = TempDir::new().unwrap();
        let cache = ScanCache::new(dir.path(), DEFAULT_TTL).unwrap();
        cache.put(&sample_result());

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.valid_entries, 1);
        assert!(stats.total_size_bytes > 0);

        cache.invalidate_all();
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 0);
        assert!(cache
            .get(ScanCategory::Sast, &ScanTarget::path("/srv/app"), "semgrep")
            .is_none());
    }
}
