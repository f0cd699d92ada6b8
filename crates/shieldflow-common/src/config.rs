//! Configuration management for ShieldFlow components

use serde::{Deserialize, Serialize};
use shieldflow_core::{Error, Result, ScanCategory, Severity};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scanning settings
    #[serde(default)]
    pub scanning: ScanningConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-plugin configuration sub-documents, forwarded verbatim to the
    /// plugin named by the key
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Create a configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Merge with environment variables (SHIELDFLOW_ prefix)
    pub fn merge_env(mut self) -> Self {
        if let Ok(val) = std::env::var("SHIELDFLOW_SAST_TOOL") {
            self.scanning.sast_tool = val;
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_SCA_TOOL") {
            self.scanning.sca_tool = val;
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_SECRETS_TOOL") {
            self.scanning.secrets_tool = val;
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_IAC_TOOL") {
            self.scanning.iac_tool = val;
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_CONTAINER_TOOL") {
            self.scanning.container_tool = val;
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_SCAN_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.scanning.timeout_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_CACHE_TTL") {
            if let Ok(n) = val.parse() {
                self.cache.ttl_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_CACHE_DIR") {
            self.cache.dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("SHIELDFLOW_LOG_FORMAT") {
            self.logging.format = val;
        }
        self
    }
}

/// Scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanningConfig {
    /// Per-category enable flags
    #[serde(default = "default_true")]
    pub enable_sast: bool,
    #[serde(default = "default_true")]
    pub enable_sca: bool,
    #[serde(default = "default_true")]
    pub enable_secrets: bool,
    #[serde(default = "default_true")]
    pub enable_iac: bool,
    #[serde(default = "default_true")]
    pub enable_container: bool,

    /// Designated backend per category
    #[serde(default = "default_sast_tool")]
    pub sast_tool: String,
    #[serde(default = "default_sca_tool")]
    pub sca_tool: String,
    #[serde(default = "default_secrets_tool")]
    pub secrets_tool: String,
    #[serde(default = "default_iac_tool")]
    pub iac_tool: String,
    #[serde(default = "default_container_tool")]
    pub container_tool: String,

    /// Paths excluded from scanning
    #[serde(default = "default_exclude_paths")]
    pub exclude_paths: Vec<String>,

    /// Per-backend execution timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Minimum severity included in rendered output
    #[serde(default)]
    pub severity_threshold: Severity,

    /// Fail-build policy
    #[serde(default = "default_true")]
    pub fail_on_high: bool,
    #[serde(default = "default_true")]
    pub fail_on_critical: bool,
}

fn default_true() -> bool {
    true
}

fn default_sast_tool() -> String {
    String::from("semgrep")
}

fn default_sca_tool() -> String {
    String::from("pip-audit")
}

fn default_secrets_tool() -> String {
    String::from("trufflehog")
}

fn default_iac_tool() -> String {
    String::from("checkov")
}

fn default_container_tool() -> String {
    String::from("trivy")
}

fn default_exclude_paths() -> Vec<String> {
    vec![
        String::from(".git"),
        String::from(".venv"),
        String::from("node_modules"),
        String::from("target"),
        String::from("__pycache__"),
    ]
}

fn default_timeout() -> u64 {
    300
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            enable_sast: true,
            enable_sca: true,
            enable_secrets: true,
            enable_iac: true,
            enable_container: true,
            sast_tool: default_sast_tool(),
            sca_tool: default_sca_tool(),
            secrets_tool: default_secrets_tool(),
            iac_tool: default_iac_tool(),
            container_tool: default_container_tool(),
            exclude_paths: default_exclude_paths(),
            timeout_seconds: default_timeout(),
            severity_threshold: Severity::Info,
            fail_on_high: true,
            fail_on_critical: true,
        }
    }
}

impl ScanningConfig {
    pub fn is_enabled(&self, category: ScanCategory) -> bool {
        match category {
            ScanCategory::Sast => self.enable_sast,
            ScanCategory::Sca => self.enable_sca,
            ScanCategory::Secrets => self.enable_secrets,
            ScanCategory::Iac => self.enable_iac,
            ScanCategory::Container => self.enable_container,
            ScanCategory::Custom => false,
        }
    }

    /// The configured tool name for a category; Custom has none
    pub fn tool_for(&self, category: ScanCategory) -> Option<&str> {
        match category {
            ScanCategory::Sast => Some(&self.sast_tool),
            ScanCategory::Sca => Some(&self.sca_tool),
            ScanCategory::Secrets => Some(&self.secrets_tool),
            ScanCategory::Iac => Some(&self.iac_tool),
            ScanCategory::Container => Some(&self.container_tool),
            ScanCategory::Custom => None,
        }
    }

    pub fn enabled_categories(&self) -> Vec<ScanCategory> {
        ScanCategory::standard()
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".shieldflow-cache")
}

fn default_cache_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Builder for constructing Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn sast_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.scanning.sast_tool = tool.into();
        self
    }

    pub fn sca_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.scanning.sca_tool = tool.into();
        self
    }

    pub fn secrets_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.scanning.secrets_tool = tool.into();
        self
    }

    pub fn iac_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.scanning.iac_tool = tool.into();
        self
    }

    pub fn container_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.scanning.container_tool = tool.into();
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.scanning.timeout_seconds = seconds;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.dir = dir.into();
        self
    }

    pub fn cache_ttl(mut self, seconds: u64) -> Self {
        self.config.cache.ttl_seconds = seconds;
        self
    }

    pub fn disable_cache(mut self) -> Self {
        self.config.cache.enabled = false;
        self
    }

    pub fn disable_category(mut self, category: ScanCategory) -> Self {
        match category {
            ScanCategory::Sast => self.config.scanning.enable_sast = false,
            ScanCategory::Sca => self.config.scanning.enable_sca = false,
            ScanCategory::Secrets => self.config.scanning.enable_secrets = false,
            ScanCategory::Iac => self.config.scanning.enable_iac = false,
            ScanCategory::Container => self.config.scanning.enable_container = false,
            ScanCategory::Custom => {}
        }
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn plugin_config(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.plugins.insert(name.into(), value);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
