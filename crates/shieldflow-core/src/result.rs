//! Scan results and the aggregate report

use crate::severity::{ScanCategory, Severity};
use crate::target::ScanTarget;
use crate::vulnerability::Vulnerability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

pub const META_STATUS: &str = "status";
pub const META_ERROR: &str = "error";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_NO_ISSUES: &str = "no_issues_found";

/// Outcome of running one backend once against one target.
///
/// A failed execution carries `metadata.status = "failed"` and an empty
/// vulnerability list; the two signals are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Name of the backend that produced this result
    pub backend: String,

    /// What was scanned
    pub target: ScanTarget,

    /// Scan category this run belongs to
    pub category: ScanCategory,

    /// Normalized findings, in backend output order
    pub vulnerabilities: Vec<Vulnerability>,

    /// Wall-clock execution time
    #[serde(with = "duration_secs")]
    pub scan_duration: Duration,

    /// Completion time
    pub timestamp: DateTime<Utc>,

    /// Free-form annotations (`status`, `error`, ...)
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ScanResult {
    /// Result of a completed execution. An empty finding list is annotated
    /// with `status = no_issues_found`.
    pub fn completed(
        backend: impl Into<String>,
        target: ScanTarget,
        category: ScanCategory,
        vulnerabilities: Vec<Vulnerability>,
        scan_duration: Duration,
    ) -> Self {
        let mut metadata = HashMap::new();
        if vulnerabilities.is_empty() {
            metadata.insert(META_STATUS.to_string(), Value::from(STATUS_NO_ISSUES));
        }
        Self {
            backend: backend.into(),
            target,
            category,
            vulnerabilities,
            scan_duration,
            timestamp: Utc::now(),
            metadata,
        }
    }

    /// Result of a failed execution: zero findings, failure annotations, and
    /// the wall time elapsed up to the failure.
    pub fn failed(
        backend: impl Into<String>,
        target: ScanTarget,
        category: ScanCategory,
        error: impl Into<String>,
        scan_duration: Duration,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(META_STATUS.to_string(), Value::from(STATUS_FAILED));
        metadata.insert(META_ERROR.to_string(), Value::from(error.into()));
        Self {
            backend: backend.into(),
            target,
            category,
            vulnerabilities: Vec::new(),
            scan_duration,
            timestamp: Utc::now(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn status(&self) -> Option<&str> {
        self.metadata.get(META_STATUS).and_then(Value::as_str)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.metadata.get(META_ERROR).and_then(Value::as_str)
    }

    pub fn is_failed(&self) -> bool {
        self.status() == Some(STATUS_FAILED)
    }

    /// Count of findings per severity; every severity level is present.
    /// Computed on demand, never stored.
    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> =
            Severity::all().into_iter().map(|s| (s, 0)).collect();
        for vuln in &self.vulnerabilities {
            *counts.entry(vuln.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_high_severity(&self) -> bool {
        self.vulnerabilities
            .iter()
            .any(|v| v.severity.is_high_or_critical())
    }

    /// Canonical export form consumed by report and integration sinks.
    /// This shape is a stable contract.
    pub fn to_structured(&self) -> Value {
        json!({
            "tool": self.backend,
            "target": self.target.display(),
            "scan_type": self.category.as_str(),
            "vulnerabilities": self.vulnerabilities,
            "scan_duration": self.scan_duration.as_secs_f64(),
            "timestamp": self.timestamp.to_rfc3339(),
            "metadata": self.metadata,
            "summary": {
                "total": self.vulnerabilities.len(),
                "by_severity": self.count_by_severity(),
                "has_high_severity": self.has_high_severity(),
            },
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Aggregate of one orchestration pass over every enabled category
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: BTreeMap<ScanCategory, ScanResult>,
}

impl ScanReport {
    pub fn new(results: BTreeMap<ScanCategory, ScanResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn total_vulnerabilities(&self) -> usize {
        self.results.values().map(|r| r.vulnerabilities.len()).sum()
    }

    pub fn has_high_severity(&self) -> bool {
        self.results.values().any(ScanResult::has_high_severity)
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> =
            Severity::all().into_iter().map(|s| (s, 0)).collect();
        for result in self.results.values() {
            for vuln in &result.vulnerabilities {
                *counts.entry(vuln.severity).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of results that carry a failed status
    pub fn failed_count(&self) -> usize {
        self.results.values().filter(|r| r.is_failed()).count()
    }

    pub fn to_structured(&self) -> Value {
        let results: BTreeMap<&str, Value> = self
            .results
            .iter()
            .map(|(category, result)| (category.as_str(), result.to_structured()))
            .collect();
        json!({
            "report_id": self.id,
            "generated_at": self.generated_at.to_rfc3339(),
            "results": results,
            "summary": {
                "total": self.total_vulnerabilities(),
                "by_severity": self.count_by_severity(),
                "has_high_severity": self.has_high_severity(),
                "failed_scans": self.failed_count(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vuln(severity: Severity) -> Vulnerability {
        Vulnerability::builder("v1", "mock")
            .title("finding")
            .severity(severity)
            .build()
    }

    #[test]
    fn test_failed_result_has_no_findings() {
        let result = ScanResult::failed(
            "semgrep",
            ScanTarget::path("/tmp/app"),
            ScanCategory::Sast,
            "binary not found",
            Duration::from_millis(12),
        );
        assert!(result.is_failed());
        assert!(result.vulnerabilities.is_empty());
        assert_eq!(result.error_message(), Some("binary not found"));
    }

    #[test]
    fn test_empty_completed_result_is_annotated() {
        let result = ScanResult::completed(
            "trivy",
            ScanTarget::image("alpine:3.20"),
            ScanCategory::Container,
            Vec::new(),
            Duration::from_secs(3),
        );
        assert!(!result.is_failed());
        assert_eq!(result.status(), Some(STATUS_NO_ISSUES));
    }

    #[test]
    fn test_count_by_severity_covers_all_levels() {
        let result = ScanResult::completed(
            "mock",
            ScanTarget::path("."),
            ScanCategory::Sast,
            vec![sample_vuln(Severity::High), sample_vuln(Severity::High)],
            Duration::from_secs(1),
        );
        let counts = result.count_by_severity();
        assert_eq!(counts[&Severity::High], 2);
        assert_eq!(counts[&Severity::Critical], 0);
        assert_eq!(counts.len(), 5);
        assert!(result.has_high_severity());
    }

    #[test]
    fn test_structured_export_shape() {
        let result = ScanResult::completed(
            "mock",
            ScanTarget::path("."),
            ScanCategory::Secrets,
            vec![sample_vuln(Severity::Critical)],
            Duration::from_millis(1500),
        );
        let doc = result.to_structured();
        assert_eq!(doc["tool"], "mock");
        assert_eq!(doc["scan_type"], "secrets");
        assert_eq!(doc["summary"]["total"], 1);
        assert_eq!(doc["summary"]["has_high_severity"], true);
        assert_eq!(doc["summary"]["by_severity"]["critical"], 1);
        assert!(doc["scan_duration"].as_f64().unwrap() > 1.0);
    }

    #[test]
    fn test_result_round_trips_through_json() {
        let result = ScanResult::completed(
            "mock",
            ScanTarget::path("/srv/app"),
            ScanCategory::Iac,
            vec![sample_vuln(Severity::Medium)],
            Duration::from_secs(2),
        );
        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: ScanResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.backend, "mock");
        assert_eq!(decoded.vulnerabilities.len(), 1);
        assert_eq!(decoded.scan_duration, Duration::from_secs(2));
    }

    #[test]
    fn test_report_summary() {
        let mut results = BTreeMap::new();
        results.insert(
            ScanCategory::Sast,
            ScanResult::completed(
                "semgrep",
                ScanTarget::path("."),
                ScanCategory::Sast,
                vec![sample_vuln(Severity::High)],
                Duration::from_secs(1),
            ),
        );
        results.insert(
            ScanCategory::Sca,
            ScanResult::failed(
                "pip-audit",
                ScanTarget::path("."),
                ScanCategory::Sca,
                "boom",
                Duration::from_secs(1),
            ),
        );
        let report = ScanReport::new(results);
        assert_eq!(report.total_vulnerabilities(), 1);
        assert!(report.has_high_severity());
        assert_eq!(report.failed_count(), 1);
        let doc = report.to_structured();
        assert_eq!(doc["summary"]["failed_scans"], 1);
        assert!(doc["results"]["sast"].is_object());
    }
}
