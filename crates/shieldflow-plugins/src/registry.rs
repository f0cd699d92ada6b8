//! Plugin registry - named, versioned, role-classified extension instances

use crate::plugin::{PluginHandle, PluginRole, ScannerPlugin};
use serde::Serialize;
use serde_json::Value;
use shieldflow_core::{Error, Result, ScanTarget};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

struct PluginRecord {
    handle: PluginHandle,
    /// Classified once at registration, never re-derived
    role: PluginRole,
    initialized: bool,
}

/// Summary of one registered plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub role: String,
    pub initialized: bool,
}

/// Catalogue of plugin instances.
///
/// Registration and unregistration are single-writer operations; execution
/// paths only read. The registry is an explicit instance owned by whoever
/// constructs the engine, never ambient global state.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginRecord>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin. Fails only on a malformed identity; an existing
    /// name is replaced (with a warning) so hot-reload stays possible.
    pub fn register(&mut self, handle: PluginHandle) -> Result<()> {
        let name = handle.name().to_string();
        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::plugin(name, "malformed plugin name"));
        }

        if self.plugins.contains_key(&name) {
            warn!(plugin = %name, "plugin already registered, replacing");
        }

        let role = handle.role();
        info!(plugin = %name, version = handle.version(), role = %role, "registered plugin");
        self.plugins.insert(
            name,
            PluginRecord {
                handle,
                role,
                initialized: false,
            },
        );
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        if self.plugins.remove(name).is_some() {
            info!(plugin = %name, "unregistered plugin");
            true
        } else {
            warn!(plugin = %name, "plugin not found");
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<&PluginHandle> {
        self.plugins.get(name).map(|r| &r.handle)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn list(&self) -> Vec<PluginInfo> {
        let mut infos: Vec<PluginInfo> = self
            .plugins
            .values()
            .map(|r| PluginInfo {
                name: r.handle.name().to_string(),
                version: r.handle.version().to_string(),
                description: r.handle.description().to_string(),
                role: r.role.as_str().to_string(),
                initialized: r.initialized,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Initialize every registered plugin with its named sub-section of
    /// `config`. A plugin that fails to initialize is skipped (kept
    /// registered but excluded from execution) until re-initialized.
    /// Returns the number of successfully initialized plugins.
    pub async fn initialize_all(&mut self, config: &HashMap<String, Value>) -> usize {
        let mut initialized = 0usize;
        for (name, record) in self.plugins.iter_mut() {
            let sub = config.get(name).cloned().unwrap_or(Value::Null);
            match record.handle.initialize(&sub).await {
                Ok(()) => {
                    record.initialized = true;
                    initialized += 1;
                    info!(plugin = %name, "initialized plugin");
                }
                Err(e) => {
                    record.initialized = false;
                    warn!(plugin = %name, error = %e, "plugin failed to initialize, skipping");
                }
            }
        }
        info!(
            initialized,
            total = self.plugins.len(),
            "plugin initialization complete"
        );
        initialized
    }

    /// Scanner plugins applicable to `target`: initialized, selected by name
    /// when a list is given, and passing their own `supports` check. The
    /// engine owns concurrency and failure isolation on top of this.
    pub fn applicable_scanners(
        &self,
        target: &ScanTarget,
        names: Option<&[String]>,
    ) -> Vec<Arc<dyn ScannerPlugin>> {
        self.plugins
            .values()
            .filter(|r| r.initialized && r.role == PluginRole::Scanner)
            .filter(|r| names.map_or(true, |ns| ns.iter().any(|n| n == r.handle.name())))
            .filter_map(|r| match &r.handle {
                PluginHandle::Scanner(p) => Some(p.clone()),
                _ => None,
            })
            .filter(|p| p.supports(target))
            .collect()
    }

    /// Initialized report sinks
    pub fn report_sinks(&self) -> Vec<Arc<dyn crate::plugin::ReportPlugin>> {
        self.plugins
            .values()
            .filter(|r| r.initialized)
            .filter_map(|r| match &r.handle {
                PluginHandle::Report(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Initialized integration sinks
    pub fn integration_sinks(&self) -> Vec<Arc<dyn crate::plugin::IntegrationPlugin>> {
        self.plugins
            .values()
            .filter(|r| r.initialized)
            .filter_map(|r| match &r.handle {
                PluginHandle::Integration(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Tear down every plugin concurrently. Teardown failures are logged,
    /// never propagated; shutdown always completes.
    pub async fn cleanup_all(&self) {
        let mut tasks = JoinSet::new();
        for record in self.plugins.values() {
            let handle = record.handle.clone();
            tasks.spawn(async move {
                let name = handle.name().to_string();
                (name, handle.cleanup().await)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Err(e))) => warn!(plugin = %name, error = %e, "plugin teardown failed"),
                Ok((_, Ok(()))) => {}
                Err(e) => warn!(error = %e, "plugin teardown task panicked"),
            }
        }
        info!("plugin cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Plugin;
    use async_trait::async_trait;
    use shieldflow_core::{ScanCategory, ScanResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestScanner {
        name: &'static str,
        init_fails: bool,
        cleanups: Arc<AtomicUsize>,
    }

    impl TestScanner {
        fn handle(name: &'static str, init_fails: bool, cleanups: Arc<AtomicUsize>) -> PluginHandle {
            PluginHandle::Scanner(Arc::new(Self {
                name,
                init_fails,
                cleanups,
            }))
        }
    }

    #[async_trait]
    impl Plugin for TestScanner {
        fn name(&self) -> &str {
            self.name
        }

        async fn initialize(&self, _config: &Value) -> shieldflow_core::Result<()> {
            if self.init_fails {
                Err(Error::plugin(self.name, "not configured"))
            } else {
                Ok(())
            }
        }

        async fn cleanup(&self) -> shieldflow_core::Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            if self.init_fails {
                Err(Error::plugin(self.name, "teardown failed"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ScannerPlugin for TestScanner {
        async fn scan(&self, target: &ScanTarget) -> shieldflow_core::Result<ScanResult> {
            Ok(ScanResult::completed(
                self.name,
                target.clone(),
                ScanCategory::Custom,
                Vec::new(),
                Duration::from_millis(1),
            ))
        }
    }

    #[tokio::test]
    async fn test_register_and_replace() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();

        registry
            .register(TestScanner::handle("alpha", false, counter.clone()))
            .unwrap();
        assert_eq!(registry.len(), 1);

        // same name replaces rather than erroring
        registry
            .register(TestScanner::handle("alpha", false, counter.clone()))
            .unwrap();
        assert_eq!(registry.len(), 1);

        // malformed identities are rejected
        assert!(registry
            .register(TestScanner::handle("", false, counter.clone()))
            .is_err());
        assert!(registry
            .register(TestScanner::handle("bad name", false, counter))
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_initialization_skips_plugin() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry
            .register(TestScanner::handle("good", false, counter.clone()))
            .unwrap();
        registry
            .register(TestScanner::handle("bad", true, counter))
            .unwrap();

        let initialized = registry.initialize_all(&HashMap::new()).await;
        assert_eq!(initialized, 1);

        // the failed plugin stays registered but is not applicable
        assert_eq!(registry.len(), 2);
        let scanners = registry.applicable_scanners(&ScanTarget::path("."), None);
        assert_eq!(scanners.len(), 1);
        assert_eq!(scanners[0].name(), "good");
    }

    #[tokio::test]
    async fn test_name_filtering() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry
            .register(TestScanner::handle("one", false, counter.clone()))
            .unwrap();
        registry
            .register(TestScanner::handle("two", false, counter))
            .unwrap();
        registry.initialize_all(&HashMap::new()).await;

        let selected =
            registry.applicable_scanners(&ScanTarget::path("."), Some(&[String::from("two")]));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "two");
    }

    #[tokio::test]
    async fn test_cleanup_all_survives_failures() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry
            .register(TestScanner::handle("ok", false, counter.clone()))
            .unwrap();
        registry
            .register(TestScanner::handle("broken", true, counter.clone()))
            .unwrap();

        registry.cleanup_all().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
