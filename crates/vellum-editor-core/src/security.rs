//! HTML sanitization at the trust boundary.
//!
//! Untrusted markup (clipboard payloads, stored content) is parsed into a
//! node tree and rebuilt against an allow/block policy, then re-serialized.
//! Dangerous containers are dropped with their content, unknown wrappers
//! are flattened so their content survives, and event-handler and script
//! URL attributes are stripped. Sanitization never reports an error to the
//! caller: it silently removes what it cannot keep and proceeds.

use smol_str::SmolStr;
use vellum_common::config::EditorConfig;
use vellum_common::{EditorError, sanitize_log};

use crate::dom::{Document, NodeId};

/// The process-wide sanitization policy. Read-only at runtime; no mutation
/// path is exposed once constructed.
#[derive(Clone, Debug)]
pub struct SanitizePolicy {
    allowed_tags: Vec<SmolStr>,
    allowed_attrs: Vec<SmolStr>,
    blocked_tags: Vec<SmolStr>,
    max_content_length: usize,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl SanitizePolicy {
    /// Build the policy from the editor configuration.
    ///
    /// Anchors are kept beyond the editing tag set so that link semantics
    /// survive sanitization (a `javascript:` href is neutered to `#`, not
    /// removed with its text).
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut allowed_tags: Vec<SmolStr> = config
            .security
            .allowed_tags
            .iter()
            .map(|t| SmolStr::new(t))
            .collect();
        if !allowed_tags.iter().any(|t| t == "a") {
            allowed_tags.push(SmolStr::new_static("a"));
        }
        Self {
            allowed_tags,
            allowed_attrs: vec![SmolStr::new_static("style"), SmolStr::new_static("href")],
            blocked_tags: ["script", "iframe", "object", "embed", "form", "input", "meta", "link"]
                .iter()
                .map(|&t| SmolStr::new_static(t))
                .collect(),
            max_content_length: config.security.max_content_length,
        }
    }

    pub fn is_allowed_tag(&self, tag: &str) -> bool {
        self.allowed_tags.iter().any(|t| t == tag)
    }

    pub fn is_blocked_tag(&self, tag: &str) -> bool {
        self.blocked_tags.iter().any(|t| t == tag)
    }

    pub fn is_allowed_attr(&self, name: &str) -> bool {
        self.allowed_attrs.iter().any(|a| a == name)
    }

    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }
}

/// Sanitize untrusted HTML into markup safe for the editing surface.
///
/// Idempotent: sanitizing already-sanitized output returns it unchanged.
pub fn sanitize_html(policy: &SanitizePolicy, input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let mut doc = Document::parse_fragment(input);
    let root = doc.root();
    sanitize_subtree(policy, &mut doc, root);
    let output = doc.inner_html(root);
    if output.len() != input.len() {
        tracing::debug!(
            target: "vellum::sanitize",
            input_len = input.len(),
            output_len = output.len(),
            "sanitized content"
        );
    }
    output
}

/// Sanitize the children of `node` in place against the policy.
///
/// Used directly by the paste pipeline, which sanitizes an already-parsed
/// fragment before deciding how to insert it.
pub fn sanitize_subtree(policy: &SanitizePolicy, doc: &mut Document, node: NodeId) {
    for child in doc.children(node).to_vec() {
        if doc.is_text(child) {
            continue;
        }
        let Some(tag) = doc.tag(child).map(SmolStr::new) else {
            continue;
        };

        if policy.is_blocked_tag(&tag) {
            // Dangerous container: the content goes with it.
            tracing::debug!(target: "vellum::sanitize", tag = %tag, "dropped blocked element");
            doc.detach(child);
            continue;
        }

        if policy.is_allowed_tag(&tag) {
            sanitize_attributes(policy, doc, child);
            sanitize_subtree(policy, doc, child);
        } else {
            // Unknown wrapper: flatten it, keep its content.
            sanitize_subtree(policy, doc, child);
            doc.unwrap_node(child);
        }
    }
}

fn sanitize_attributes(policy: &SanitizePolicy, doc: &mut Document, node: NodeId) {
    let names: Vec<SmolStr> = doc.attrs(node).iter().map(|(n, _)| n.clone()).collect();
    for name in names {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("on") {
            doc.remove_attr(node, &name);
            continue;
        }
        if !policy.is_allowed_attr(&lower) {
            doc.remove_attr(node, &name);
            continue;
        }
        let value = doc.attr(node, &name).unwrap_or_default().to_owned();
        let value_lower = value.trim().to_ascii_lowercase();
        if lower == "href" && value_lower.starts_with("javascript:") {
            // Neuter rather than remove: the link itself stays navigable.
            doc.set_attr(node, &name, "#");
            continue;
        }
        if value_lower.contains("javascript:") || value_lower.contains("data:") {
            doc.remove_attr(node, &name);
        }
    }
}

/// Enforce the content limits at the trust boundary.
///
/// Errors with [`EditorError::ContentTooLong`] when over the configured
/// maximum. Otherwise `Ok(false)` when the content still smells dangerous
/// (an embedded `<script` or `javascript:` that survived upstream checks),
/// `Ok(true)` when clean.
pub fn enforce_content(policy: &SanitizePolicy, content: &str) -> Result<bool, EditorError> {
    let length = content.chars().count();
    if length > policy.max_content_length {
        tracing::warn!(
            target: "vellum::sanitize",
            length,
            max = policy.max_content_length,
            "content over limit"
        );
        return Err(EditorError::content_too_long(
            length,
            policy.max_content_length,
        ));
    }
    let lower = content.to_ascii_lowercase();
    if lower.contains("<script") || lower.contains("javascript:") {
        tracing::warn!(
            target: "vellum::sanitize",
            preview = %sanitize_log(content),
            "dangerous content rejected"
        );
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SanitizePolicy {
        SanitizePolicy::default()
    }

    #[test]
    fn test_script_dropped_with_content() {
        let out = sanitize_html(&policy(), "<p>before</p><script>alert(1)</script><p>after</p>");
        assert!(!out.contains("script"));
        assert!(!out.contains("alert"));
        assert_eq!(out, "<p>before</p><p>after</p>");
    }

    #[test]
    fn test_event_handler_attributes_stripped() {
        let out = sanitize_html(&policy(), r#"<p onclick="alert(1)" onmouseover="x()">hi</p>"#);
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn test_img_onerror_vector() {
        let out = sanitize_html(&policy(), r#"<img src=x onerror=alert(1)>"#);
        assert!(!out.contains("onerror"));
        assert!(!out.contains("alert"));
    }

    #[test]
    fn test_javascript_href_neutered() {
        let out = sanitize_html(&policy(), r#"<a href="javascript:alert(1)">link</a>"#);
        assert_eq!(out, r##"<a href="#">link</a>"##);
    }

    #[test]
    fn test_iframe_dropped_entirely() {
        let out = sanitize_html(&policy(), r#"<iframe src="javascript:alert(1)"></iframe><p>Safe content</p>"#);
        assert!(!out.contains("iframe"));
        assert!(!out.contains("javascript:"));
        assert_eq!(out, "<p>Safe content</p>");
    }

    #[test]
    fn test_blocklist_elements_removed() {
        for tag in ["object", "embed", "form", "input", "meta", "link"] {
            let out = sanitize_html(&policy(), &format!("<{tag}>x</{tag}><p>ok</p>"));
            assert!(!out.contains(tag), "{tag} survived: {out}");
            assert!(out.contains("<p>ok</p>"));
        }
    }

    #[test]
    fn test_unknown_wrapper_flattened() {
        let out = sanitize_html(&policy(), "<div><p>kept <strong>bold</strong></p></div>");
        assert_eq!(out, "<p>kept <strong>bold</strong></p>");
    }

    #[test]
    fn test_styled_span_survives() {
        let out = sanitize_html(&policy(), r#"<p><span style="font-size: 12pt">x</span></p>"#);
        assert_eq!(out, r#"<p><span style="font-size: 12pt">x</span></p>"#);
    }

    #[test]
    fn test_style_with_script_url_dropped() {
        let out = sanitize_html(
            &policy(),
            r#"<p><span style="background: url(javascript:alert(1))">x</span></p>"#,
        );
        assert!(!out.contains("javascript:"));
        assert!(out.contains("x"));
    }

    #[test]
    fn test_safe_content_untouched() {
        let input = "<p>Safe content</p>";
        assert_eq!(sanitize_html(&policy(), input), input);
    }

    #[test]
    fn test_idempotent() {
        let vectors = [
            "<script>alert(1)</script>",
            r#"<img onerror=alert(1)>"#,
            r#"<a href="javascript:alert(1)">x</a>"#,
            "<div><p>a <b>b</b> &lt;c&gt;</p></div>",
            r#"<p><span style="font-family: 'Courier New'">m</span></p>"#,
        ];
        for input in vectors {
            let once = sanitize_html(&policy(), input);
            let twice = sanitize_html(&policy(), &once);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_enforce_content_limits() {
        let policy = policy();
        assert!(enforce_content(&policy, "<p>fine</p>").unwrap());
        assert!(!enforce_content(&policy, "<p><script>x</script></p>").unwrap());
        assert!(!enforce_content(&policy, "javascript:alert(1)").unwrap());

        let oversized = "x".repeat(policy.max_content_length() + 1);
        match enforce_content(&policy, &oversized) {
            Err(EditorError::ContentTooLong { length, max_length }) => {
                assert_eq!(length, policy.max_content_length() + 1);
                assert_eq!(max_length, policy.max_content_length());
            }
            other => panic!("expected ContentTooLong, got {other:?}"),
        }
    }
}
