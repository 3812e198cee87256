//! Pre-flight input validation.
//!
//! Pure predicates with no side effects, used as a cheap gate before a
//! paste or save is attempted. The sanitizer in [`crate::security`] is the
//! authoritative enforcement at the trust boundary; these checks only stop
//! obviously bad input from reaching it.

use vellum_common::config::EditorConfig;

/// Whether `value` is one of the configured font sizes.
/// Matching is exact and case-sensitive.
pub fn is_valid_font_size(config: &EditorConfig, value: &str) -> bool {
    config.format.font_sizes.iter().any(|s| s == value)
}

/// Whether `value` is one of the configured font families.
/// Matching is exact and case-sensitive.
pub fn is_valid_font_family(config: &EditorConfig, value: &str) -> bool {
    config.format.font_families.iter().any(|f| f == value)
}

/// Whether `value` is one of the configured text alignments.
pub fn is_valid_text_alignment(config: &EditorConfig, value: &str) -> bool {
    config.format.text_alignments.iter().any(|a| a == value)
}

/// Gross content check before attempting a paste or save.
///
/// Rejects content that is over the configured length or carries obvious
/// script vectors. Returns a boolean rather than an error: callers that
/// need the oversized-content error use
/// [`crate::security::enforce_content`] instead.
pub fn validate_content(config: &EditorConfig, content: &str) -> bool {
    if content.chars().count() > config.security.max_content_length {
        return false;
    }
    let lower = content.to_ascii_lowercase();
    if lower.contains("<script") || lower.contains("javascript:") {
        return false;
    }
    if lower.contains("data:text/html") {
        return false;
    }
    true
}

/// Heuristic tag-balance check: open tags must equal close tags plus
/// self-closing tags.
///
/// Advisory only. This is a counter, not a parser, and must never be used
/// as a security control.
pub fn validate_html_structure(content: &str) -> bool {
    let mut opens = 0usize;
    let mut closes = 0usize;

    let mut rest = content;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            // Dangling '<': cannot be balanced.
            return false;
        };
        let inside = &after[..end];
        if let Some(name) = inside.strip_prefix('/') {
            if !name.is_empty() {
                closes += 1;
            }
        } else if inside.ends_with('/') || is_void_tag(inside) {
            // Self-closing and void tags need no close tag.
        } else if inside
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        {
            opens += 1;
        }
        rest = &after[end + 1..];
    }

    opens == closes
}

fn is_void_tag(inside: &str) -> bool {
    let name: String = inside
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    matches!(name.to_ascii_lowercase().as_str(), "br" | "hr" | "img" | "input" | "meta" | "link")
}
