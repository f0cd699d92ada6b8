//! pip-audit adapter - dependency audit (SCA) for Python projects

use crate::adapter::{Backend, BackendOptions};
use crate::exec;
use crate::normalize;
use async_trait::async_trait;
use serde::Deserialize;
use shieldflow_core::{Error, Result, ScanCategory, ScanTarget, Severity, Vulnerability};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

pub struct PipAuditBackend {
    options: BackendOptions,
}

impl PipAuditBackend {
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Backend for PipAuditBackend {
    fn name(&self) -> &str {
        "pip-audit"
    }

    fn category(&self) -> ScanCategory {
        ScanCategory::Sca
    }

    fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn run(&self, target: &ScanTarget) -> Result<Vec<Vulnerability>> {
        let root = target.as_path().ok_or_else(|| {
            Error::InvalidTarget("pip-audit requires a filesystem target".into())
        })?;

        let Some(manifest) = find_requirements(root) else {
            debug!(target = %target, "no Python dependency manifest, nothing to audit");
            return Ok(Vec::new());
        };

        let args = [
            String::from("--format=json"),
            String::from("--requirement"),
            manifest.display().to_string(),
        ];

        let out = exec::run_tool("pip-audit", &args, Some(root)).await?;
        // 0: no known vulnerabilities, 1: vulnerabilities found
        match out.exit_code {
            0 | 1 => parse_pip_audit(&out.stdout),
            code => Err(Error::backend(
                "pip-audit",
                format!("exit code {code}: {}", out.stderr_summary()),
            )),
        }
    }
}

/// Locate a requirements file under the target, skipping excluded dirs by name
fn find_requirements(root: &Path) -> Option<std::path::PathBuf> {
    if root.is_file() {
        return Some(root.to_path_buf());
    }
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with("requirements") && name.ends_with(".txt"))
        })
        .map(|entry| entry.into_path())
}

#[derive(Debug, Deserialize)]
struct PipAuditOutput {
    #[serde(default)]
    dependencies: Vec<PipAuditDependency>,
}

#[derive(Debug, Deserialize)]
struct PipAuditDependency {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    vulns: Vec<PipAuditVuln>,
}

#[derive(Debug, Deserialize)]
struct PipAuditVuln {
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    fix_versions: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

fn parse_pip_audit(stdout: &str) -> Result<Vec<Vulnerability>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: PipAuditOutput =
        serde_json::from_str(stdout).map_err(|e| Error::parse("pip-audit", e.to_string()))?;

    let mut vulnerabilities = Vec::new();
    for dep in doc.dependencies {
        for vuln in dep.vulns {
            let mut builder = Vulnerability::builder(&vuln.id, "pip-audit")
                .title(format!("Vulnerable package: {} {}", dep.name, dep.version))
                .description(&vuln.description)
                // advisory databases rarely carry severity; treat known
                // vulnerable dependencies as high until triaged
                .severity(Severity::High);

            if let Some(cve) = normalize::first_cve(&vuln.aliases)
                .or_else(|| normalize::extract_cve_ids(&vuln.description).into_iter().next())
            {
                builder = builder.reference(format!("https://nvd.nist.gov/vuln/detail/{cve}"));
            }
            if let Some(fix) = vuln.fix_versions.first() {
                builder = builder.remediation(format!("Upgrade {} to {}", dep.name, fix));
            }
            vulnerabilities.push(builder.build());
        }
    }
    Ok(vulnerabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_pip_audit_output() {
        let stdout = r#"{
            "dependencies": [
                {"name": "flask", "version": "0.5", "vulns": [
                    {
                        "id": "PYSEC-2019-179",
                        "fix_versions": ["1.0"],
                        "aliases": ["CVE-2019-1010083"],
                        "description": "Unbounded memory usage when decoding JSON."
                    }
                ]},
                {"name": "requests", "version": "2.32.0", "vulns": []}
            ]
        }"#;

        let vulns = parse_pip_audit(stdout).unwrap();
        assert_eq!(vulns.len(), 1);
        let v = &vulns[0];
        assert_eq!(v.id, "PYSEC-2019-179");
        assert_eq!(v.severity, Severity::High);
        assert!(v.title.contains("flask 0.5"));
        assert_eq!(v.remediation.as_deref(), Some("Upgrade flask to 1.0"));
        assert!(v.references[0].contains("CVE-2019-1010083"));
    }

    #[test]
    fn test_find_requirements() {
        let dir = TempDir::new().unwrap();
        assert!(find_requirements(dir.path()).is_none());

        std::fs::create_dir(dir.path().join("deploy")).unwrap();
        std::fs::write(dir.path().join("deploy/requirements-dev.txt"), "flask==0.5").unwrap();
        let found = find_requirements(dir.path()).unwrap();
        assert!(found.ends_with("requirements-dev.txt"));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        assert!(matches!(
            parse_pip_audit("<html>").unwrap_err(),
            Error::Parse { .. }
        ));
    }
}
