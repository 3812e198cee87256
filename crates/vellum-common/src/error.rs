//! Error types for the vellum editor crates.

use miette::Diagnostic;

/// Main error type for editor operations.
///
/// Pipeline-level failures (a rejected paste, a failed validation) are
/// surfaced as result values by the services themselves; this type covers
/// the cases that are genuine errors rather than rejections.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// Content exceeds the configured maximum length.
    #[error("content length {length} exceeds maximum of {max_length} characters")]
    #[diagnostic(code(vellum::content_too_long))]
    ContentTooLong { length: usize, max_length: usize },

    /// Configuration could not be serialized or deserialized.
    #[error(transparent)]
    #[diagnostic(code(vellum::config))]
    Config(#[from] serde_json::Error),

    /// A selection referenced a node that no longer exists in the document.
    #[error("selection references a detached or unknown node")]
    #[diagnostic(code(vellum::stale_selection))]
    StaleSelection,
}

impl EditorError {
    /// Build the oversized-content error from the measured and allowed lengths.
    pub fn content_too_long(length: usize, max_length: usize) -> Self {
        Self::ContentTooLong { length, max_length }
    }
}
