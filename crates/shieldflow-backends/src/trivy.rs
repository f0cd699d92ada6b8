//! Trivy adapter - container image and filesystem analysis

use crate::adapter::{Backend, BackendOptions};
use crate::exec;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shieldflow_core::{Error, Result, ScanCategory, ScanTarget, Severity, Vulnerability};
use std::time::Duration;

pub struct TrivyBackend {
    options: BackendOptions,
}

impl TrivyBackend {
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Backend for TrivyBackend {
    fn name(&self) -> &str {
        "trivy"
    }

    fn category(&self) -> ScanCategory {
        ScanCategory::Container
    }

    fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn run(&self, target: &ScanTarget) -> Result<Vec<Vulnerability>> {
        let args = match target {
            ScanTarget::Image(reference) => vec![
                String::from("image"),
                String::from("--format"),
                String::from("json"),
                String::from("--quiet"),
                reference.clone(),
            ],
            ScanTarget::Path(path) => vec![
                String::from("fs"),
                String::from("--format"),
                String::from("json"),
                String::from("--quiet"),
                path.display().to_string(),
            ],
        };

        let out = exec::run_tool("trivy", &args, None).await?;
        // trivy reports findings on exit 0; non-zero is a tool failure
        match out.exit_code {
            0 => parse_trivy(&out.stdout),
            code => Err(Error::backend(
                "trivy",
                format!("exit code {code}: {}", out.stderr_summary()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrivyOutput {
    #[serde(rename = "Results", default)]
    results: Vec<TrivyResult>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Target", default)]
    target: String,
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Vec<TrivyVuln>,
}

#[derive(Debug, Deserialize)]
struct TrivyVuln {
    #[serde(rename = "VulnerabilityID")]
    id: String,
    #[serde(rename = "PkgName", default)]
    pkg_name: String,
    #[serde(rename = "InstalledVersion", default)]
    installed_version: String,
    #[serde(rename = "FixedVersion", default)]
    fixed_version: Option<String>,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Severity", default)]
    severity: String,
    #[serde(rename = "CweIDs", default)]
    cwe_ids: Vec<String>,
    #[serde(rename = "References", default)]
    references: Vec<String>,
    #[serde(rename = "CVSS", default)]
    cvss: Value,
}

fn parse_trivy(stdout: &str) -> Result<Vec<Vulnerability>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: TrivyOutput =
        serde_json::from_str(stdout).map_err(|e| Error::parse("trivy", e.to_string()))?;

    let mut vulnerabilities = Vec::new();
    for result in doc.results {
        for vuln in result.vulnerabilities {
            let title = vuln.title.clone().unwrap_or_else(|| {
                format!(
                    "{} in {} {}",
                    vuln.id, vuln.pkg_name, vuln.installed_version
                )
            });
            let mut builder = Vulnerability::builder(&vuln.id, "trivy")
                .title(title)
                .description(&vuln.description)
                .severity(Severity::from_tool_str(&vuln.severity))
                .location(&result.target, None)
                .references(vuln.references.clone());

            if let Some(cwe) = vuln.cwe_ids.first() {
                builder = builder.cwe(cwe);
            }
            if let Some(score) = cvss_v3_score(&vuln.cvss) {
                builder = builder.cvss(score);
            }
            if let Some(fixed) = &vuln.fixed_version {
                if !fixed.is_empty() {
                    builder =
                        builder.remediation(format!("Upgrade {} to {}", vuln.pkg_name, fixed));
                }
            }
            vulnerabilities.push(builder.build());
        }
    }
    Ok(vulnerabilities)
}

// CVSS is keyed by source (nvd, redhat, ...); prefer nvd, fall back to any
fn cvss_v3_score(cvss: &Value) -> Option<f32> {
    let object = cvss.as_object()?;
    let nvd = object.get("nvd").and_then(|v| v.get("V3Score"));
    let any = object.values().find_map(|v| v.get("V3Score"));
    nvd.or(any).and_then(Value::as_f64).map(|s| s as f32)
}
