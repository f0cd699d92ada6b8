//! Plugin contracts - capability-typed extension points
//!
//! A plugin implements exactly one of three roles. The role is fixed by the
//! `PluginHandle` variant it is registered under, classified once at
//! registration time and never re-derived.

use async_trait::async_trait;
use serde_json::Value;
use shieldflow_backends::target_matches_suffixes;
use shieldflow_core::{Result, ScanCategory, ScanReport, ScanResult, ScanTarget};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lifecycle and identity shared by every plugin role
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn description(&self) -> &str {
        ""
    }

    /// One-time setup with this plugin's configuration sub-document.
    /// A plugin that is not configured may reject initialization; it is
    /// then skipped, not removed.
    async fn initialize(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    /// Teardown. Failures are logged by the registry, never propagated.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

/// A plugin that produces scan results for a target
#[async_trait]
pub trait ScannerPlugin: Plugin {
    fn category(&self) -> ScanCategory {
        ScanCategory::Custom
    }

    /// File suffixes this scanner applies to. Empty means no restriction.
    fn supported_suffixes(&self) -> &[&str] {
        &[]
    }

    fn supports(&self, target: &ScanTarget) -> bool {
        target_matches_suffixes(target, self.supported_suffixes())
    }

    async fn scan(&self, target: &ScanTarget) -> Result<ScanResult>;
}

/// A plugin that renders aggregate results to an output artifact
#[async_trait]
pub trait ReportPlugin: Plugin {
    fn output_format(&self) -> &str {
        "json"
    }

    async fn write_report(&self, report: &ScanReport, output: &Path) -> Result<PathBuf>;
}

/// A plugin that pushes aggregate results to an external system
#[async_trait]
pub trait IntegrationPlugin: Plugin {
    async fn publish(&self, report: &ScanReport) -> Result<()>;
}

/// Capability role of a registered plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginRole {
    Scanner,
    Report,
    Integration,
}

impl PluginRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginRole::Scanner => "scanner",
            PluginRole::Report => "report",
            PluginRole::Integration => "integration",
        }
    }
}

impl std::fmt::Display for PluginRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tagged plugin handle; the variant is the role declaration
#[derive(Clone)]
pub enum PluginHandle {
    Scanner(Arc<dyn ScannerPlugin>),
    Report(Arc<dyn ReportPlugin>),
    Integration(Arc<dyn IntegrationPlugin>),
}

impl PluginHandle {
    pub fn role(&self) -> PluginRole {
        match self {
            PluginHandle::Scanner(_) => PluginRole::Scanner,
            PluginHandle::Report(_) => PluginRole::Report,
            PluginHandle::Integration(_) => PluginRole::Integration,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PluginHandle::Scanner(p) => p.name(),
            PluginHandle::Report(p) => p.name(),
            PluginHandle::Integration(p) => p.name(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            PluginHandle::Scanner(p) => p.version(),
            PluginHandle::Report(p) => p.version(),
            PluginHandle::Integration(p) => p.version(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PluginHandle::Scanner(p) => p.description(),
            PluginHandle::Report(p) => p.description(),
            PluginHandle::Integration(p) => p.description(),
        }
    }

    pub async fn initialize(&self, config: &Value) -> Result<()> {
        match self {
            PluginHandle::Scanner(p) => p.initialize(config).await,
            PluginHandle::Report(p) => p.initialize(config).await,
            PluginHandle::Integration(p) => p.initialize(config).await,
        }
    }

    pub async fn cleanup(&self) -> Result<()> {
        match self {
            PluginHandle::Scanner(p) => p.cleanup().await,
            PluginHandle::Report(p) => p.cleanup().await,
            PluginHandle::Integration(p) => p.cleanup().await,
        }
    }
}
