//! Error types for ShieldFlow

use thiserror::Error;

/// Result type alias using ShieldFlow Error
pub type Result<T> = std::result::Result<T, Error>;

/// ShieldFlow error types
#[derive(Error, Debug)]
pub enum Error {
    // === Backend execution ===
    #[error("Backend {backend} failed: {message}")]
    BackendExecution { backend: String, message: String },

    #[error("Backend {backend} timed out after {seconds}s")]
    BackendTimeout { backend: String, seconds: u64 },

    #[error("Backend {backend} produced unparseable output: {message}")]
    Parse { backend: String, message: String },

    // === Configuration ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required configuration: {key}")]
    MissingConfig { key: String },

    #[error("No backend configured for category: {category}")]
    UnsupportedCategory { category: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    // === Plugins ===
    #[error("Plugin {plugin}: {message}")]
    Plugin { plugin: String, message: String },

    // === Cache ===
    #[error("Cache error: {0}")]
    Cache(String),

    // === IO / serialization ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BackendExecution {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn parse(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Errors caused by API misuse; these surface to the caller instead of
    /// being folded into a failed result.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::MissingConfig { .. }
                | Error::UnsupportedCategory { .. }
                | Error::InvalidTarget(_)
        )
    }

    /// Get an error code for logging/metrics
    pub fn code(&self) -> &'static str {
        match self {
            Error::BackendExecution { .. } => "BACKEND_FAILED",
            Error::BackendTimeout { .. } => "BACKEND_TIMEOUT",
            Error::Parse { .. } => "PARSE_ERROR",
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::MissingConfig { .. } => "MISSING_CONFIG",
            Error::UnsupportedCategory { .. } => "UNSUPPORTED_CATEGORY",
            Error::InvalidTarget(_) => "INVALID_TARGET",
            Error::Plugin { .. } => "PLUGIN_ERROR",
            Error::Cache(_) => "CACHE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Other(_) => "OTHER",
        }
    }
}
