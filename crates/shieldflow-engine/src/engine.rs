//! Scan orchestration engine
//!
//! Turns a (category, target) request into executed, cached, aggregated
//! results. Backends and plugins fan out one task each; every task is
//! joined and its outcome captured independently, so one failing detector
//! never cancels or hides its siblings.

use crate::metrics::MetricsCollector;
use shieldflow_backends::{builtin, Backend, BackendOptions};
use shieldflow_cache::ScanCache;
use shieldflow_common::Config;
use shieldflow_core::{Error, Result, ScanCategory, ScanReport, ScanResult, ScanTarget};
use shieldflow_plugins::PluginRegistry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct ScanEngine {
    backends: HashMap<ScanCategory, Arc<dyn Backend>>,
    registry: PluginRegistry,
    cache: Option<Arc<ScanCache>>,
    metrics: MetricsCollector,
}

impl std::fmt::Debug for ScanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanEngine")
            .field("categories", &self.backends.keys().collect::<Vec<_>>())
            .field("cache_enabled", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ScanEngine {
    /// Build an engine from configuration and an explicit plugin registry.
    ///
    /// Unknown tool names are configuration errors surfaced here, not
    /// runtime failures.
    pub fn new(config: &Config, registry: PluginRegistry) -> Result<Self> {
        let options = BackendOptions {
            exclude_paths: config.scanning.exclude_paths.clone(),
            timeout: Duration::from_secs(config.scanning.timeout_seconds),
        };

        let mut backends: HashMap<ScanCategory, Arc<dyn Backend>> = HashMap::new();
        for category in config.scanning.enabled_categories() {
            let tool = config
                .scanning
                .tool_for(category)
                .ok_or_else(|| Error::UnsupportedCategory {
                    category: category.to_string(),
                })?;
            let backend = builtin(tool, &options).ok_or_else(|| {
                Error::Configuration(format!("unsupported {category} tool: {tool}"))
            })?;
            backends.insert(category, backend);
        }

        let cache = if config.cache.enabled {
            Some(Arc::new(ScanCache::new(
                &config.cache.dir,
                Duration::from_secs(config.cache.ttl_seconds),
            )?))
        } else {
            None
        };

        info!(
            backends = backends.len(),
            plugins = registry.len(),
            cache = cache.is_some(),
            "scan engine ready"
        );
        Ok(Self {
            backends,
            registry,
            cache,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn cache(&self) -> Option<&ScanCache> {
        self.cache.as_deref()
    }

    fn backend_for(&self, category: ScanCategory) -> Result<Arc<dyn Backend>> {
        self.backends
            .get(&category)
            .cloned()
            .ok_or_else(|| Error::UnsupportedCategory {
                category: category.to_string(),
            })
    }

    /// Run the designated backend for one category, with the cache as a
    /// read-through layer. An unconfigured category is a usage error; a
    /// failing backend is a failed `ScanResult`.
    pub async fn run_category(
        &self,
        category: ScanCategory,
        target: &ScanTarget,
    ) -> Result<ScanResult> {
        let backend = self.backend_for(category)?;
        info!(category = %category, target = %target, "running category scan");
        Ok(execute_with_cache(backend, self.cache.clone(), target.clone()).await)
    }

    /// Run every enabled category concurrently. Categories are independent;
    /// a failure in one never prevents the others from completing or being
    /// reported. The returned report has one entry per enabled category.
    pub async fn run_all(&self, target: &ScanTarget) -> ScanReport {
        info!(target = %target, categories = self.backends.len(), "running all categories");

        let mut tasks: JoinSet<(ScanCategory, ScanResult)> = JoinSet::new();
        for (&category, backend) in &self.backends {
            let backend = backend.clone();
            let cache = self.cache.clone();
            let target = target.clone();
            tasks.spawn(async move { (category, execute_with_cache(backend, cache, target).await) });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((category, result)) => {
                    results.insert(category, result);
                }
                Err(e) => warn!(error = %e, "category scan task panicked"),
            }
        }

        let report = ScanReport::new(results);
        self.metrics.record(report.results.values());
        report
    }

    /// Execute all applicable scanner plugins concurrently and return only
    /// the results that did not raise; a raising plugin is logged and
    /// excluded. The registry owns applicability filtering, the engine owns
    /// concurrency and failure isolation.
    pub async fn run_plugins(
        &self,
        target: &ScanTarget,
        names: Option<&[String]>,
    ) -> Vec<ScanResult> {
        let plugins = self.registry.applicable_scanners(target, names);
        info!(target = %target, plugins = plugins.len(), "running scanner plugins");

        let mut tasks = JoinSet::new();
        for plugin in plugins {
            let target = target.clone();
            tasks.spawn(async move {
                let name = plugin.name().to_string();
                (name, plugin.scan(&target).await)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(result))) => {
                    debug!(plugin = %name, "scanner plugin completed");
                    results.push(result);
                }
                Ok((name, Err(e))) => {
                    warn!(plugin = %name, error = %e, "scanner plugin failed, excluding result");
                }
                Err(e) => warn!(error = %e, "scanner plugin task panicked"),
            }
        }

        self.metrics.record(results.iter());
        results
    }

    /// Tear down the plugin registry; always completes
    pub async fn shutdown(&self) {
        self.registry.cleanup_all().await;
    }
}

/// Read-through cache around one backend execution. Failed results are not
/// cached, so a transient tool failure is retried on the next request.
async fn execute_with_cache(
    backend: Arc<dyn Backend>,
    cache: Option<Arc<ScanCache>>,
    target: ScanTarget,
) -> ScanResult {
    let category = backend.category();
    if let Some(cache) = &cache {
        if let Some(hit) = cache.get(category, &target, backend.name()) {
            debug!(backend = backend.name(), category = %category, "serving cached result");
            return hit;
        }
    }

    let result = backend.execute(&target).await;
    if let Some(cache) = &cache {
        if !result.is_failed() {
            cache.put(&result);
        }
    }
    result
}
