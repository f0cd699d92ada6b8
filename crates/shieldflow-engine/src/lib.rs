//! ShieldFlow Engine - concurrent scan orchestration
//!
//! The engine resolves the designated backend per category, fans scans out
//! one task per backend/plugin, applies the result cache as a read-through
//! layer, isolates per-backend failures, and aggregates everything into a
//! `ScanReport` recorded by the metrics collector.

pub mod engine;
pub mod metrics;

pub use engine::ScanEngine;
pub use metrics::{MetricsCollector, MetricsSnapshot};
