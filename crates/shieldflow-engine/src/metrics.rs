//! Process-lifetime metrics over completed scans

use chrono::{DateTime, Utc};
use serde::Serialize;
use shieldflow_core::{ScanCategory, ScanResult, Severity};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct MetricsInner {
    scans_completed: u64,
    vulnerabilities_found: u64,
    by_severity: BTreeMap<Severity, u64>,
    categories: BTreeMap<ScanCategory, u64>,
    backends: BTreeMap<String, u64>,
    durations: Vec<Duration>,
    last_updated: Option<DateTime<Utc>>,
}

/// Cumulative counters over completed orchestration calls.
///
/// All counters for one recording move under a single lock, so a reader
/// never observes a partially updated snapshot.
#[derive(Default)]
pub struct MetricsCollector {
    inner: Mutex<MetricsInner>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one orchestration call's results
    pub fn record<'a, I>(&self, results: I)
    where
        I: IntoIterator<Item = &'a ScanResult>,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.scans_completed += 1;
        inner.last_updated = Some(Utc::now());
        for result in results {
            *inner.categories.entry(result.category).or_insert(0) += 1;
            *inner.backends.entry(result.backend.clone()).or_insert(0) += 1;
            inner.vulnerabilities_found += result.vulnerabilities.len() as u64;
            for vuln in &result.vulnerabilities {
                *inner.by_severity.entry(vuln.severity).or_insert(0) += 1;
            }
            inner.durations.push(result.scan_duration);
        }
    }

    /// Point-in-time snapshot. Rates and averages are derived here from the
    /// raw counters rather than maintained incrementally.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();

        let mut by_severity: BTreeMap<Severity, u64> =
            Severity::all().into_iter().map(|s| (s, 0)).collect();
        for (severity, count) in &inner.by_severity {
            by_severity.insert(*severity, *count);
        }

        let total_scan_time: f64 = inner.durations.iter().map(Duration::as_secs_f64).sum();
        let average_scan_duration = if inner.durations.is_empty() {
            0.0
        } else {
            total_scan_time / inner.durations.len() as f64
        };
        let average_vulnerabilities_per_scan = if inner.scans_completed == 0 {
            0.0
        } else {
            inner.vulnerabilities_found as f64 / inner.scans_completed as f64
        };

        MetricsSnapshot {
            scans_completed: inner.scans_completed,
            vulnerabilities_found: inner.vulnerabilities_found,
            by_severity,
            categories: inner.categories.clone(),
            backends: inner.backends.clone(),
            total_scan_time_secs: total_scan_time,
            average_scan_duration_secs: average_scan_duration,
            average_vulnerabilities_per_scan,
            last_updated: inner.last_updated,
        }
    }
}

/// Derived view of the raw counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub scans_completed: u64,
    pub vulnerabilities_found: u64,
    pub by_severity: BTreeMap<Severity, u64>,
    pub categories: BTreeMap<ScanCategory, u64>,
    pub backends: BTreeMap<String, u64>,
    pub total_scan_time_secs: f64,
    pub average_scan_duration_secs: f64,
    pub average_vulnerabilities_per_scan: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shieldflow_core::{ScanTarget, Vulnerability};

    fn result_with(severity: Severity, duration: Duration) -> ScanResult {
        ScanResult::completed(
            "mock",
            ScanTarget::path("."),
            ScanCategory::Sast,
            vec![Vulnerability::builder("v", "mock")
                .severity(severity)
                .build()],
            duration,
        )
    }

    #[test]
    fn test_record_and_snapshot() {
        let metrics = MetricsCollector::new();
        metrics.record([
            &result_with(Severity::High, Duration::from_secs(2)),
            &result_with(Severity::Low, Duration::from_secs(4)),
        ]);

        let snap = metrics.snapshot();
        assert_eq!(snap.scans_completed, 1);
        assert_eq!(snap.vulnerabilities_found, 2);
        assert_eq!(snap.by_severity[&Severity::High], 1);
        assert_eq!(snap.by_severity[&Severity::Critical], 0);
        assert_eq!(snap.categories[&ScanCategory::Sast], 2);
        assert_eq!(snap.backends["mock"], 2);
        assert!((snap.average_scan_duration_secs - 3.0).abs() < 1e-9);
        assert!((snap.average_vulnerabilities_per_scan - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_has_zero_rates() {
        let snap = MetricsCollector::new().snapshot();
        assert_eq!(snap.scans_completed, 0);
        assert_eq!(snap.average_scan_duration_secs, 0.0);
        assert_eq!(snap.average_vulnerabilities_per_scan, 0.0);
        assert_eq!(snap.by_severity.len(), 5);
    }
}
