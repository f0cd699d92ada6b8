//! Semgrep adapter - SAST over the auto config

use crate::adapter::{Backend, BackendOptions};
use crate::exec;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shieldflow_core::{
    Error, Result, ScanCategory, ScanTarget, Severity, Vulnerability,
};
use std::time::Duration;

pub struct SemgrepBackend {
    options: BackendOptions,
}

impl SemgrepBackend {
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Backend for SemgrepBackend {
    fn name(&self) -> &str {
        "semgrep"
    }

    fn category(&self) -> ScanCategory {
        ScanCategory::Sast
    }

    fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn run(&self, target: &ScanTarget) -> Result<Vec<Vulnerability>> {
        let root = target
            .as_path()
            .ok_or_else(|| Error::InvalidTarget("semgrep requires a filesystem target".into()))?;

        let mut args = vec![
            String::from("--config=auto"),
            String::from("--json"),
            String::from("--quiet"),
        ];
        for path in &self.options.exclude_paths {
            args.push(String::from("--exclude"));
            args.push(path.clone());
        }
        args.push(root.display().to_string());

        let out = exec::run_tool("semgrep", &args, None).await?;
        // 0: clean run, 1: findings reported; anything else is a tool failure
        match out.exit_code {
            0 | 1 => parse_semgrep(&out.stdout),
            code => Err(Error::backend(
                "semgrep",
                format!("exit code {code}: {}", out.stderr_summary()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SemgrepOutput {
    #[serde(default)]
    results: Vec<SemgrepResult>,
}

#[derive(Debug, Deserialize)]
struct SemgrepResult {
    check_id: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    start: SemgrepPosition,
    #[serde(default)]
    extra: SemgrepExtra,
}

#[derive(Debug, Default, Deserialize)]
struct SemgrepPosition {
    #[serde(default)]
    line: u32,
}

#[derive(Debug, Default, Deserialize)]
struct SemgrepExtra {
    #[serde(default)]
    message: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    metadata: Value,
}

fn parse_semgrep(stdout: &str) -> Result<Vec<Vulnerability>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: SemgrepOutput =
        serde_json::from_str(stdout).map_err(|e| Error::parse("semgrep", e.to_string()))?;

    Ok(doc
        .results
        .into_iter()
        .map(|r| {
            let mut builder = Vulnerability::builder(&r.check_id, "semgrep")
                .title(&r.extra.message)
                .description(&r.extra.message)
                .severity(Severity::from_tool_str(&r.extra.severity))
                .rule_id(&r.check_id);

            if !r.path.is_empty() {
                let line = (r.start.line > 0).then_some(r.start.line);
                builder = builder.location(&r.path, line);
            }
            if let Some(cwe) = first_cwe(&r.extra.metadata) {
                builder = builder.cwe(cwe);
            }
            if let Some(refs) = r.extra.metadata.get("references").and_then(Value::as_array) {
                for url in refs.iter().filter_map(Value::as_str) {
                    builder = builder.reference(url);
                }
            }
            builder.build()
        })
        .collect())
}

// semgrep metadata carries cwe as either a string or a list of strings
fn first_cwe(metadata: &Value) -> Option<String> {
    match metadata.get("cwe")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_semgrep_results() {
        let stdout = r#"{
            "results": [
                {
                    "check_id": "python.lang.security.audit.dangerous-subprocess-use",
                    "path": "app/main.py",
                    "start": {"line": 42, "col": 5},
                    "end": {"line": 42, "col": 40},
                    "extra": {
                        "message": "Detected subprocess call with shell=True",
                        "severity": "ERROR",
                        "metadata": {
                            "cwe": ["CWE-78: OS Command Injection"],
                            "references": ["https://owasp.org/Top10/A03_2021-Injection/"]
                        }
                    }
                }
            ],
            "errors": []
        }"#;

        let vulns = parse_semgrep(stdout).unwrap();
        assert_eq!(vulns.len(), 1);
        let v = &vulns[0];
        assert_eq!(v.severity, Severity::High);
        assert_eq!(v.file_path.as_deref(), Some("app/main.py"));
        assert_eq!(v.line_number, Some(42));
        assert_eq!(v.cwe.as_deref(), Some("CWE-78: OS Command Injection"));
        assert_eq!(v.references.len(), 1);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_semgrep("").unwrap().is_empty());
        assert!(parse_semgrep(r#"{"results": [], "errors": []}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let err = parse_semgrep("not json at all").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
