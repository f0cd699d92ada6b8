//! ShieldFlow Common - configuration and logging shared by all components

pub mod config;
pub mod logging;

pub use config::{CacheConfig, Config, ConfigBuilder, LoggingConfig, ScanningConfig};
pub use logging::{init_logging, LogFormat};
