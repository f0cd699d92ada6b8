//! Checkov adapter - infrastructure-as-code analysis

use crate::adapter::{Backend, BackendOptions};
use crate::exec;
use async_trait::async_trait;
use serde_json::Value;
use shieldflow_core::{Error, Result, ScanCategory, ScanTarget, Severity, Vulnerability};
use std::time::Duration;

pub struct CheckovBackend {
    options: BackendOptions,
}

impl CheckovBackend {
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Backend for CheckovBackend {
    fn name(&self) -> &str {
        "checkov"
    }

    fn category(&self) -> ScanCategory {
        ScanCategory::Iac
    }

    fn supported_suffixes(&self) -> &[&str] {
        &[".tf", ".yml", ".yaml", ".json"]
    }

    fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn run(&self, target: &ScanTarget) -> Result<Vec<Vulnerability>> {
        let root = target
            .as_path()
            .ok_or_else(|| Error::InvalidTarget("checkov requires a filesystem target".into()))?;

        let mut args = vec![
            String::from("--directory"),
            root.display().to_string(),
            String::from("--output"),
            String::from("json"),
            String::from("--quiet"),
        ];
        for path in &self.options.exclude_paths {
            args.push(String::from("--skip-path"));
            args.push(path.clone());
        }

        let out = exec::run_tool("checkov", &args, None).await?;
        // 0: all checks passed, 1: failed checks reported
        match out.exit_code {
            0 | 1 => parse_checkov(&out.stdout),
            code => Err(Error::backend(
                "checkov",
                format!("exit code {code}: {}", out.stderr_summary()),
            )),
        }
    }
}

/// Checkov emits one JSON document per framework, or a list of them when
/// several frameworks matched.
fn parse_checkov(stdout: &str) -> Result<Vec<Vulnerability>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: Value =
        serde_json::from_str(stdout).map_err(|e| Error::parse("checkov", e.to_string()))?;
    let frameworks = match doc {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut vulnerabilities = Vec::new();
    for framework in &frameworks {
        let Some(failed) = framework
            .pointer("/results/failed_checks")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for check in failed {
            let check_id = check
                .get("check_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let check_name = check
                .get("check_name")
                .and_then(Value::as_str)
                .unwrap_or("Failed infrastructure check");
            let severity = check
                .get("severity")
                .and_then(Value::as_str)
                .map(Severity::from_tool_str)
                // checkov omits severity without a platform key; a failed
                // misconfiguration check defaults to medium
                .unwrap_or(Severity::Medium);

            let mut builder = Vulnerability::builder(check_id, "checkov")
                .title(check_name)
                .description(format!("{check_id}: {check_name}"))
                .severity(severity)
                .rule_id(check_id);

            if let Some(file) = check.get("file_path").and_then(Value::as_str) {
                let line = check
                    .pointer("/file_line_range/0")
                    .and_then(Value::as_u64)
                    .map(|l| l as u32);
                builder = builder.location(file, line);
            }
            if let Some(guideline) = check.get("guideline").and_then(Value::as_str) {
                builder = builder.reference(guideline);
            }
            vulnerabilities.push(builder.build());
        }
    }
    Ok(vulnerabilities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checkov_single_framework() {
        let stdout = r#"{
            "check_type": "terraform",
            "results": {
                "passed_checks": [],
                "failed_checks": [
                    {
                        "check_id": "CKV_AWS_20",
                        "check_name": "S3 Bucket has an ACL defined which allows public READ access",
                        "file_path": "/main.tf",
                        "file_line_range": [12, 24],
                        "guideline": "https://docs.prismacloud.io/policy/s3-public-read",
                        "severity": null
                    }
                ]
            }
        }"#;

        let vulns = parse_checkov(stdout).unwrap();
        assert_eq!(vulns.len(), 1);
        let v = &vulns[0];
        assert_eq!(v.id, "CKV_AWS_20");
        assert_eq!(v.severity, Severity::Medium);
        assert_eq!(v.file_path.as_deref(), Some("/main.tf"));
        assert_eq!(v.line_number, Some(12));
        assert_eq!(v.references.len(), 1);
    }

    #[test]
    fn test_parse_checkov_framework_list() {
        let stdout = r#"[
            {"check_type": "terraform", "results": {"failed_checks": [
                {"check_id": "CKV_AWS_20", "check_name": "public bucket", "severity": "HIGH"}
            ]}},
            {"check_type": "kubernetes", "results": {"failed_checks": []}}
        ]"#;

        let vulns = parse_checkov(stdout).unwrap();
        assert_eq!(vulns.len(), 1);
        assert_eq!(vulns[0].severity, Severity::High);
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        assert!(matches!(
            parse_checkov("Traceback ...").unwrap_err(),
            Error::Parse { .. }
        ));
    }
}
