//! Scan target definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A target to scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScanTarget {
    /// File or directory on the local filesystem
    Path(PathBuf),

    /// Container image reference (e.g. "alpine:3.20", "ghcr.io/org/app@sha256:...")
    Image(String),
}

impl ScanTarget {
    /// Create a filesystem target
    pub fn path(p: impl Into<PathBuf>) -> Self {
        ScanTarget::Path(p.into())
    }

    /// Create a container image target
    pub fn image(reference: impl Into<String>) -> Self {
        ScanTarget::Image(reference.into())
    }

    /// Parse a target from a string, auto-detecting the type.
    ///
    /// An existing filesystem path wins; otherwise anything that looks like
    /// an image reference (tag or digest) is treated as one.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidTarget("empty target".to_string()));
        }

        let path = Path::new(s);
        if path.exists() {
            return Ok(ScanTarget::Path(path.to_path_buf()));
        }

        if s.contains('@') || s.rsplit_once(':').is_some_and(|(_, tag)| !tag.contains('/')) {
            return Ok(ScanTarget::Image(s.to_string()));
        }

        Ok(ScanTarget::Path(path.to_path_buf()))
    }

    /// Filesystem path, if this is a path target
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ScanTarget::Path(p) => Some(p),
            ScanTarget::Image(_) => None,
        }
    }

    /// Get a display string for the target
    pub fn display(&self) -> String {
        match self {
            ScanTarget::Path(p) => p.display().to_string(),
            ScanTarget::Image(r) => r.clone(),
        }
    }
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
