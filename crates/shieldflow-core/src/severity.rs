//! Severity levels and scan categories

use serde::{Deserialize, Serialize};

/// Severity level for a vulnerability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding, no security impact
    #[default]
    Info,
    /// Low severity, minimal risk
    Low,
    /// Medium severity, moderate risk
    Medium,
    /// High severity, significant risk
    High,
    /// Critical severity, immediate action required
    Critical,
}

impl Severity {
    /// Convert CVSS 3.x score to severity
    pub fn from_cvss(score: f32) -> Self {
        match score {
            s if s >= 9.0 => Severity::Critical,
            s if s >= 7.0 => Severity::High,
            s if s >= 4.0 => Severity::Medium,
            s if s >= 0.1 => Severity::Low,
            _ => Severity::Info,
        }
    }

    /// Normalize a backend-native severity string.
    ///
    /// Total function: anything unrecognized maps to `Info` rather than
    /// being dropped. Numeric levels follow the common 0-4 vendor scale.
    pub fn from_tool_str(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" | "URGENT" => Severity::Critical,
            "HIGH" | "SERIOUS" | "ERROR" => Severity::High,
            "MEDIUM" | "MODERATE" | "WARNING" => Severity::Medium,
            "LOW" | "MINIMAL" => Severity::Low,
            "INFO" | "INFORMATIONAL" | "NONE" => Severity::Info,
            other => match other.parse::<u8>() {
                Ok(n) if n >= 4 => Severity::Critical,
                Ok(3) => Severity::High,
                Ok(2) => Severity::Medium,
                Ok(1) => Severity::Low,
                _ => Severity::Info,
            },
        }
    }

    /// Get numeric value for sorting/comparison
    pub fn as_number(&self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Get display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// All severities, lowest first
    pub fn all() -> [Severity; 5] {
        [
            Severity::Info,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
    }

    pub fn is_high_or_critical(&self) -> bool {
        *self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Class of scanning concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanCategory {
    /// Static application security testing
    Sast,
    /// Software composition analysis (dependency audit)
    Sca,
    /// Secret/credential detection
    Secrets,
    /// Infrastructure-as-code analysis
    Iac,
    /// Container image/filesystem analysis
    Container,
    /// Plugin-provided scans outside the built-in categories
    Custom,
}

impl ScanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanCategory::Sast => "sast",
            ScanCategory::Sca => "sca",
            ScanCategory::Secrets => "secrets",
            ScanCategory::Iac => "iac",
            ScanCategory::Container => "container",
            ScanCategory::Custom => "custom",
        }
    }

    /// The categories that have a designated built-in backend
    pub fn standard() -> [ScanCategory; 5] {
        [
            ScanCategory::Sast,
            ScanCategory::Sca,
            ScanCategory::Secrets,
            ScanCategory::Iac,
            ScanCategory::Container,
        ]
    }
}

impl std::fmt::Display for ScanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ScanCategory {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sast" => Ok(ScanCategory::Sast),
            "sca" => Ok(ScanCategory::Sca),
            "secrets" => Ok(ScanCategory::Secrets),
            "iac" => Ok(ScanCategory::Iac),
            "container" => Ok(ScanCategory::Container),
            "custom" => Ok(ScanCategory::Custom),
            other => Err(crate::error::Error::UnsupportedCategory {
                category: other.to_string(),
            }),
        }
    }
}
