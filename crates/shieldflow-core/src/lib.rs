//! ShieldFlow Core - Foundation types and error handling
//!
//! This crate provides the canonical model shared by every ShieldFlow crate:
//! - `ScanTarget`: what to scan (filesystem path or container image)
//! - `Vulnerability`: one normalized finding
//! - `ScanResult` / `ScanReport`: one backend run and the aggregate view
//! - `Severity`, `ScanCategory`: core enums
//! - `Error` / `Result`: the error taxonomy

pub mod error;
pub mod result;
pub mod severity;
pub mod target;
pub mod vulnerability;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use result::{
    ScanReport, ScanResult, META_ERROR, META_STATUS, STATUS_FAILED, STATUS_NO_ISSUES,
};
pub use severity::{ScanCategory, Severity};
pub use target::ScanTarget;
pub use vulnerability::{Vulnerability, VulnerabilityBuilder};
