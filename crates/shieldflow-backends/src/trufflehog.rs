//! TruffleHog adapter - secret detection over the filesystem source

use crate::adapter::{Backend, BackendOptions};
use crate::exec;
use async_trait::async_trait;
use serde::Deserialize;
use shieldflow_core::{Error, Result, ScanCategory, ScanTarget, Severity, Vulnerability};
use std::time::Duration;
use tracing::debug;

pub struct TrufflehogBackend {
    options: BackendOptions,
}

impl TrufflehogBackend {
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Backend for TrufflehogBackend {
    fn name(&self) -> &str {
        "trufflehog"
    }

    fn category(&self) -> ScanCategory {
        ScanCategory::Secrets
    }

    fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn run(&self, target: &ScanTarget) -> Result<Vec<Vulnerability>> {
        let root = target.as_path().ok_or_else(|| {
            Error::InvalidTarget("trufflehog requires a filesystem target".into())
        })?;

        let args = [
            String::from("filesystem"),
            String::from("--json"),
            String::from("--no-update"),
            root.display().to_string(),
        ];

        let out = exec::run_tool("trufflehog", &args, None).await?;
        // 0: run completed (findings or not); 183: findings with --fail
        match out.exit_code {
            0 | 183 => parse_trufflehog(&out.stdout),
            code => Err(Error::backend(
                "trufflehog",
                format!("exit code {code}: {}", out.stderr_summary()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrufflehogRecord {
    #[serde(rename = "DetectorName", default)]
    detector_name: String,
    #[serde(rename = "Verified", default)]
    verified: bool,
    #[serde(rename = "Redacted", default)]
    redacted: String,
    #[serde(rename = "SourceMetadata", default)]
    source: TrufflehogSource,
}

#[derive(Debug, Default, Deserialize)]
struct TrufflehogSource {
    #[serde(rename = "Data", default)]
    data: TrufflehogData,
}

#[derive(Debug, Default, Deserialize)]
struct TrufflehogData {
    #[serde(rename = "Filesystem", default)]
    filesystem: Option<TrufflehogFilesystem>,
}

#[derive(Debug, Deserialize)]
struct TrufflehogFilesystem {
    #[serde(default)]
    file: String,
    #[serde(default)]
    line: Option<u32>,
}

/// Parse JSON-lines output: one record per detected secret.
///
/// Individual unparseable lines are skipped; output that yields no record at
/// all despite being non-empty is a parse failure.
fn parse_trufflehog(stdout: &str) -> Result<Vec<Vulnerability>> {
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let mut vulnerabilities = Vec::new();
    let mut parsed = 0usize;
    for (idx, line) in lines.iter().enumerate() {
        let record: TrufflehogRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping unparseable trufflehog line");
                continue;
            }
        };
        parsed += 1;

        let severity = if record.verified {
            Severity::Critical
        } else {
            Severity::High
        };
        let mut builder = Vulnerability::builder(
            format!("trufflehog-{}-{}", record.detector_name, idx),
            "trufflehog",
        )
        .title(format!(
            "Hardcoded {} credential detected",
            record.detector_name
        ))
        .description(if record.redacted.is_empty() {
            String::from("A secret literal was detected in the scanned tree")
        } else {
            format!("Detected secret (redacted): {}", record.redacted)
        })
        .severity(severity)
        .cwe("CWE-798")
        .rule_id(&record.detector_name)
        .remediation("Remove the credential from the tree and rotate it");

        if let Some(fs) = record.source.data.filesystem {
            builder = builder.location(&fs.file, fs.line);
        }
        vulnerabilities.push(builder.build());
    }

    if parsed == 0 {
        return Err(Error::parse(
            "trufflehog",
            "no parseable records in output".to_string(),
        ));
    }
    Ok(vulnerabilities)
}
