//! Vulnerability definitions - normalized findings produced by backend parsers

use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// One normalized finding within a scan result.
///
/// Immutable value type; the `id` is only unique within the originating
/// backend's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Backend-local identifier
    pub id: String,

    /// Short finding title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Normalized severity
    pub severity: Severity,

    /// CWE identifier (e.g. "CWE-89")
    pub cwe: Option<String>,

    /// CVSS v3 score, if the backend reported one
    pub cvss_score: Option<f32>,

    /// Affected file, relative to the scan target where possible
    pub file_path: Option<String>,
    pub line_number: Option<u32>,

    /// Name of the backend that produced this finding
    pub backend: String,

    /// Backend rule/check identifier
    pub rule_id: Option<String>,

    /// Suggested remediation
    pub remediation: Option<String>,

    /// Reference URLs
    #[serde(default)]
    pub references: Vec<String>,
}

impl Vulnerability {
    /// Create a new vulnerability builder
    pub fn builder(id: impl Into<String>, backend: impl Into<String>) -> VulnerabilityBuilder {
        VulnerabilityBuilder::new(id, backend)
    }
}

/// Builder for constructing vulnerabilities
pub struct VulnerabilityBuilder {
    vuln: Vulnerability,
}

impl VulnerabilityBuilder {
    pub fn new(id: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            vuln: Vulnerability {
                id: id.into(),
                title: String::new(),
                description: String::new(),
                severity: Severity::Info,
                cwe: None,
                cvss_score: None,
                file_path: None,
                line_number: None,
                backend: backend.into(),
                rule_id: None,
                remediation: None,
                references: Vec::new(),
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.vuln.title = title.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.vuln.description = desc.into();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.vuln.severity = severity;
        self
    }

    pub fn cwe(mut self, cwe: impl Into<String>) -> Self {
        self.vuln.cwe = Some(cwe.into());
        self
    }

    pub fn cvss(mut self, score: f32) -> Self {
        self.vuln.cvss_score = Some(score);
        self
    }

    pub fn location(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.vuln.file_path = Some(file.into());
        self.vuln.line_number = line;
        self
    }

    pub fn rule_id(mut self, rule: impl Into<String>) -> Self {
        self.vuln.rule_id = Some(rule.into());
        self
    }

    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.vuln.remediation = Some(remediation.into());
        self
    }

    pub fn reference(mut self, url: impl Into<String>) -> Self {
        self.vuln.references.push(url.into());
        self
    }

    pub fn references(mut self, urls: Vec<String>) -> Self {
        self.vuln.references = urls;
        self
    }

    pub fn build(self) -> Vulnerability {
        self.vuln
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vulnerability_builder() {
        let vuln = Vulnerability::builder("rule-42", "semgrep")
            .title("SQL injection")
            .description("User input flows into a raw query")
            .severity(Severity::High)
            .cwe("CWE-89")
            .location("src/db.py", Some(17))
            .rule_id("python.sqli.raw-query")
            .remediation("Use parameterized queries")
            .reference("https://owasp.org/Top10/A03_2021-Injection/")
            .build();

        assert_eq!(vuln.severity, Severity::High);
        assert_eq!(vuln.backend, "semgrep");
        assert_eq!(vuln.line_number, Some(17));
        assert_eq!(vuln.references.len(), 1);
    }
}
