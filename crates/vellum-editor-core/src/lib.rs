//! vellum-editor-core: format-state and paste-sanitization core for the
//! vellum rich-text editor.
//!
//! This crate provides:
//! - `Document` - an arena-backed model of the editing surface
//! - `DomSelection`/`CaretPosition` - explicit selection values
//! - `sanitize_html` and `SanitizePolicy` - the trust-boundary sanitizer
//! - `FormatCache` and `Debouncer` - per-editor caching and scheduling
//! - `FormatResolver` - cursor format resolution with cached ancestor walks
//! - `PasteService` - the classify/clean/validate/insert paste pipeline
//! - `serialize`/`deserialize` - the save/load normalization boundary
//!
//! Everything is host-agnostic: the host passes selection and clipboard
//! state in explicitly and drives the debouncer from its own event loop.

pub mod cache;
pub mod commands;
pub mod debounce;
pub mod dom;
pub mod format;
pub mod paste;
pub mod resolver;
pub mod security;
pub mod selection;
pub mod serialize;
pub mod validate;

pub use cache::FormatCache;
pub use debounce::Debouncer;
pub use dom::{Document, NodeData, NodeId};
pub use format::{FormatState, InlineFormatKind, InlineStyle, TextAlign};
pub use paste::{
    ClipboardPayload, InMemoryClipboard, PasteOptions, PasteResult, PasteService,
};
pub use resolver::{FORMAT_STATE_KEY, FormatResolver};
pub use security::{SanitizePolicy, enforce_content, sanitize_html};
pub use selection::{CaretPosition, Direction, DomSelection};
pub use serialize::{EMPTY_PARAGRAPH, deserialize_content, serialize_content};
pub use smol_str::SmolStr;
pub use vellum_common::{EditorConfig, EditorError, sanitize_log};
