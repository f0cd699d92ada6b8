//! Backend adapter contract - the interface all scanning backends implement

use async_trait::async_trait;
use shieldflow_core::{Result, ScanCategory, ScanResult, ScanTarget, Vulnerability};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Design default: a backend may block for at most five minutes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Options shared by the built-in backends
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Paths excluded from scanning
    pub exclude_paths: Vec<String>,

    /// Execution timeout applied at the adapter boundary
    pub timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            exclude_paths: vec![
                String::from(".git"),
                String::from(".venv"),
                String::from("node_modules"),
                String::from("target"),
                String::from("__pycache__"),
            ],
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The trait that all scanning backends must implement.
///
/// `execute` is the orchestration boundary and is total: whatever happens
/// inside `run` - launch failure, crash, timeout, unparseable output - comes
/// back as a `ScanResult` annotated with `status = failed`, never as an
/// error crossing this boundary.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name (e.g. "semgrep")
    fn name(&self) -> &str;

    /// Category this backend serves
    fn category(&self) -> ScanCategory;

    /// File suffixes this backend applies to. Empty means no restriction.
    fn supported_suffixes(&self) -> &[&str] {
        &[]
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Fallible inner scan: launch the tool, wait, parse its output.
    async fn run(&self, target: &ScanTarget) -> Result<Vec<Vulnerability>>;

    /// Whether this backend applies to the target
    fn supports(&self, target: &ScanTarget) -> bool {
        target_matches_suffixes(target, self.supported_suffixes())
    }

    /// Execute against the target. Total function; see trait docs.
    async fn execute(&self, target: &ScanTarget) -> ScanResult {
        let started = Instant::now();
        debug!(backend = self.name(), target = %target, "executing backend");

        match tokio::time::timeout(self.timeout(), self.run(target)).await {
            Ok(Ok(vulnerabilities)) => ScanResult::completed(
                self.name(),
                target.clone(),
                self.category(),
                vulnerabilities,
                started.elapsed(),
            ),
            Ok(Err(err)) => {
                warn!(backend = self.name(), error = %err, "backend execution failed");
                ScanResult::failed(
                    self.name(),
                    target.clone(),
                    self.category(),
                    err.to_string(),
                    started.elapsed(),
                )
            }
            Err(_) => {
                let err = shieldflow_core::Error::BackendTimeout {
                    backend: self.name().to_string(),
                    seconds: self.timeout().as_secs(),
                };
                warn!(backend = self.name(), "{err}");
                ScanResult::failed(
                    self.name(),
                    target.clone(),
                    self.category(),
                    err.to_string(),
                    started.elapsed(),
                )
            }
        }
    }
}

/// Suffix-based applicability used by backends and scanner plugins alike.
///
/// No declared suffixes means no restriction. A directory target matches if
/// any file beneath it matches. Image targets have no files to match, so a
/// suffix-restricted backend never applies to them.
pub fn target_matches_suffixes(target: &ScanTarget, suffixes: &[&str]) -> bool {
    if suffixes.is_empty() {
        return true;
    }
    let path = match target {
        ScanTarget::Path(p) => p,
        ScanTarget::Image(_) => return false,
    };
    if path.is_file() {
        return matches_suffix(path, suffixes);
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| matches_suffix(entry.path(), suffixes))
}

fn matches_suffix(path: &Path, suffixes: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            suffixes
                .iter()
                .any(|s| s.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shieldflow_core::Error;
    use tempfile::TempDir;

    struct SleepyBackend;

    #[async_trait]
    impl Backend for SleepyBackend {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn category(&self) -> ScanCategory {
            ScanCategory::Custom
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn run(&self, _target: &ScanTarget) -> Result<Vec<Vulnerability>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    struct BrokenBackend;

    #[async_trait]
    impl Backend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        fn category(&self) -> ScanCategory {
            ScanCategory::Custom
        }

        async fn run(&self, _target: &ScanTarget) -> Result<Vec<Vulnerability>> {
            Err(Error::backend("broken", "tool exploded"))
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_result() {
        let result = SleepyBackend.execute(&ScanTarget::path(".")).await;
        assert!(result.is_failed());
        assert!(result.error_message().unwrap().contains("timed out"));
        assert!(result.scan_duration < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_execute_never_raises() {
        let result = BrokenBackend.execute(&ScanTarget::path(".")).await;
        assert!(result.is_failed());
        assert!(result.vulnerabilities.is_empty());
        assert!(result.error_message().unwrap().contains("tool exploded"));
    }

    #[test]
    fn test_suffix_matching() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.tf"), "resource {}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let target = ScanTarget::path(dir.path());
        assert!(target_matches_suffixes(&target, &[".tf"]));
        assert!(target_matches_suffixes(&target, &["txt"]));
        assert!(!target_matches_suffixes(&target, &[".py"]));
        // no restriction applies to everything
        assert!(target_matches_suffixes(&target, &[]));

        let file = ScanTarget::path(dir.path().join("main.tf"));
        assert!(target_matches_suffixes(&file, &[".tf"]));
        assert!(!target_matches_suffixes(&file, &[".yml"]));

        // suffix-restricted backends never apply to image targets
        let image = ScanTarget::image("alpine:3.20");
        assert!(!target_matches_suffixes(&image, &[".tf"]));
        assert!(target_matches_suffixes(&image, &[]));
    }
}
