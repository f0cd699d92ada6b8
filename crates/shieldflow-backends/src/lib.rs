//! ShieldFlow Backends - adapters over external scanning tools
//!
//! Each adapter wraps one detector as a subprocess: launch, wait with a
//! bounded timeout, parse its structured output into `Vulnerability`
//! records. The raw wire format is adapter-private; only `ScanResult`
//! crosses the orchestration boundary.

pub mod adapter;
pub mod checkov;
pub mod exec;
pub mod normalize;
pub mod pip_audit;
pub mod semgrep;
pub mod trivy;
pub mod trufflehog;

pub use adapter::{target_matches_suffixes, Backend, BackendOptions, DEFAULT_TIMEOUT};
pub use checkov::CheckovBackend;
pub use pip_audit::PipAuditBackend;
pub use semgrep::SemgrepBackend;
pub use trivy::TrivyBackend;
pub use trufflehog::TrufflehogBackend;

use std::sync::Arc;

/// Resolve a built-in backend by its tool name
pub fn builtin(tool: &str, options: &BackendOptions) -> Option<Arc<dyn Backend>> {
    match tool {
        "semgrep" => Some(Arc::new(SemgrepBackend::new(options.clone()))),
        "pip-audit" => Some(Arc::new(PipAuditBackend::new(options.clone()))),
        "trufflehog" => Some(Arc::new(TrufflehogBackend::new(options.clone()))),
        "checkov" => Some(Arc::new(CheckovBackend::new(options.clone()))),
        "trivy" => Some(Arc::new(TrivyBackend::new(options.clone()))),
        _ => None,
    }
}
