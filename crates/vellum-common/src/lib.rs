//! vellum-common: shared infrastructure for the vellum editor crates.
//!
//! This crate provides:
//! - `EditorConfig` - static editor configuration with serde round-tripping
//! - `EditorError` - the error taxonomy shared across editor crates
//! - `redact` - log-redaction helpers for untrusted data
//! - `perf` - lightweight timing instrumentation

pub mod config;
pub mod error;
pub mod perf;
pub mod redact;

pub use config::{EditorConfig, FormatConfig, PerformanceConfig, SecurityConfig};
pub use error::EditorError;
pub use redact::sanitize_log;
