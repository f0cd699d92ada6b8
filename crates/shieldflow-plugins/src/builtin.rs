//! Built-in sink plugins registered by the default registration list

use crate::plugin::{IntegrationPlugin, Plugin, ReportPlugin};
use async_trait::async_trait;
use serde_json::Value;
use shieldflow_core::{Error, Result, ScanReport};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Writes the structured aggregate report to a JSON file
pub struct JsonReportPlugin {
    pretty: Mutex<bool>,
}

impl JsonReportPlugin {
    pub fn new() -> Self {
        Self {
            pretty: Mutex::new(true),
        }
    }
}

impl Default for JsonReportPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for JsonReportPlugin {
    fn name(&self) -> &str {
        "json-report"
    }

    fn description(&self) -> &str {
        "Write the aggregate scan report as JSON"
    }

    async fn initialize(&self, config: &Value) -> Result<()> {
        if let Some(pretty) = config.get("pretty").and_then(Value::as_bool) {
            *self.pretty.lock().unwrap() = pretty;
        }
        Ok(())
    }
}

#[async_trait]
impl ReportPlugin for JsonReportPlugin {
    async fn write_report(&self, report: &ScanReport, output: &Path) -> Result<PathBuf> {
        let doc = report.to_structured();
        let pretty = *self.pretty.lock().unwrap();
        let rendered = if pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        tokio::fs::write(output, rendered)
            .await
            .map_err(|e| Error::plugin("json-report", format!("failed to write report: {e}")))?;
        info!(path = %output.display(), "wrote scan report");
        Ok(output.to_path_buf())
    }
}

/// POSTs the structured aggregate report to a configured webhook
pub struct WebhookIntegrationPlugin {
    client: reqwest::Client,
    url: Mutex<Option<String>>,
}

impl WebhookIntegrationPlugin {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: Mutex::new(None),
        }
    }
}

impl Default for WebhookIntegrationPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for WebhookIntegrationPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn description(&self) -> &str {
        "POST the aggregate scan report to a webhook"
    }

    async fn initialize(&self, config: &Value) -> Result<()> {
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::plugin("webhook", "missing required config key: url"))?;
        *self.url.lock().unwrap() = Some(url.to_string());
        Ok(())
    }
}

#[async_trait]
impl IntegrationPlugin for WebhookIntegrationPlugin {
    async fn publish(&self, report: &ScanReport) -> Result<()> {
        let url = self
            .url
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::plugin("webhook", "not configured"))?;

        let response = self
            .client
            .post(&url)
            .json(&report.to_structured())
            .send()
            .await
            .map_err(|e| Error::plugin("webhook", format!("request failed: {e}")))?;

        response
            .error_for_status()
            .map_err(|e| Error::plugin("webhook", format!("webhook rejected report: {e}")))?;
        info!("published scan report to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shieldflow_core::{ScanCategory, ScanResult, ScanTarget};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_report() -> ScanReport {
        let mut results = BTreeMap::new();
        results.insert(
            ScanCategory::Sast,
            ScanResult::completed(
                "semgrep",
                ScanTarget::path("."),
                ScanCategory::Sast,
                Vec::new(),
                Duration::from_secs(1),
            ),
        );
        ScanReport::new(results)
    }

    #[tokio::test]
    async fn test_json_report_writes_structured_doc() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("report.json");

        let plugin = JsonReportPlugin::new();
        plugin.initialize(&json!({"pretty": false})).await.unwrap();
        let written = plugin.write_report(&sample_report(), &output).await.unwrap();

        let raw = std::fs::read_to_string(written).unwrap();
        let doc: Value = serde_json::from_str(&raw).unwrap();
        assert!(doc["results"]["sast"].is_object());
        assert_eq!(doc["summary"]["total"], 0);
    }

    #[tokio::test]
    async fn test_webhook_requires_url() {
        let plugin = WebhookIntegrationPlugin::new();
        assert!(plugin.initialize(&Value::Null).await.is_err());
        assert!(plugin.publish(&sample_report()).await.is_err());
        assert!(plugin
            .initialize(&json!({"url": "https://hooks.example.com/scan"}))
            .await
            .is_ok());
    }
}
