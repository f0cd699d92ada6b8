//! ShieldFlow Plugins - capability-typed extension registry
//!
//! Plugins extend the engine in one of three roles: Scanner (produce scan
//! results), Report (render the aggregate to an artifact), Integration
//! (push the aggregate to an external system). Plugins are compiled in and
//! registered through an explicit registration list; there is no runtime
//! code loading.

pub mod builtin;
pub mod plugin;
pub mod registry;

pub use builtin::{JsonReportPlugin, WebhookIntegrationPlugin};
pub use plugin::{
    IntegrationPlugin, Plugin, PluginHandle, PluginRole, ReportPlugin, ScannerPlugin,
};
pub use registry::{PluginInfo, PluginRegistry};

use std::sync::Arc;
use tracing::warn;

/// Registry pre-populated with the built-in sink plugins
pub fn default_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    let builtins = [
        PluginHandle::Report(Arc::new(JsonReportPlugin::new()) as Arc<dyn ReportPlugin>),
        PluginHandle::Integration(
            Arc::new(WebhookIntegrationPlugin::new()) as Arc<dyn IntegrationPlugin>
        ),
    ];
    for handle in builtins {
        if let Err(e) = registry.register(handle) {
            warn!(error = %e, "failed to register built-in plugin");
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_registry_roles() {
        let mut registry = default_registry();
        assert_eq!(registry.len(), 2);

        registry.initialize_all(&Default::default()).await;
        // json-report initializes unconfigured; webhook needs a url
        assert_eq!(registry.report_sinks().len(), 1);
        assert!(registry.integration_sinks().is_empty());
    }
}
