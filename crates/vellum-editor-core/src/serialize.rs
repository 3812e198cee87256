//! Content serialization for persistence.
//!
//! Runs only at save/load boundaries, never on the live-editing hot path.
//! Serialization operates on a clone of the surface so the editor the user
//! is typing into is never mutated mid-save; deserialization guarantees
//! the structural invariants the editing code relies on (every empty
//! paragraph holds a `<br>`, every format element can host a cursor).

use crate::dom::{Document, NodeId};
use crate::security::{SanitizePolicy, sanitize_html};

/// Tags canonicalized and merged by normalization.
const FORMAT_TAGS: &[&str] = &["strong", "em", "u"];

/// The canonical representation of an empty document.
pub const EMPTY_PARAGRAPH: &str = "<p><br></p>";

/// Serialize the subtree under `root` for storage.
///
/// Works on a clone of the subtree: legacy tags are canonicalized,
/// adjacent identical format wrappers merged, genuinely empty wrappers
/// dropped, and the result passed through the sanitizer.
pub fn serialize_content(policy: &SanitizePolicy, doc: &Document, root: NodeId) -> String {
    let mut clone = doc.clone_subtree(root);
    let clone_root = clone.root();

    normalize_content(&mut clone, clone_root);
    cleanup_empty_format_elements(&mut clone, clone_root);

    sanitize_html(policy, &clone.inner_html(clone_root))
}

/// Restore stored content into markup safe to load into the surface.
///
/// Empty input maps to the canonical empty paragraph. Otherwise the
/// content is sanitized, empty format elements get an empty text child so
/// the cursor can enter them, and paragraph structure is guaranteed.
pub fn deserialize_content(policy: &SanitizePolicy, html: &str) -> String {
    if html.is_empty() {
        return EMPTY_PARAGRAPH.to_owned();
    }

    let sanitized = sanitize_html(policy, html);
    let mut doc = Document::parse_fragment(&sanitized);
    let root = doc.root();

    restore_format_anchors(&mut doc, root);
    ensure_paragraph_structure(&mut doc, root);

    doc.inner_html(root)
}

/// Canonicalize legacy tags and merge adjacent identical format wrappers.
pub fn normalize_content(doc: &mut Document, root: NodeId) {
    // Legacy tags first, so a <b> adjacent to a <strong> merges below.
    for node in doc.descendants(root) {
        match doc.tag(node) {
            Some("b") => doc.rename_element(node, "strong"),
            Some("i") => doc.rename_element(node, "em"),
            _ => {}
        }
    }
    merge_adjacent_formats(doc, root);
}

/// Merge any two adjacent siblings of identical tag among the format
/// tags, repeating until no adjacent pair remains.
fn merge_adjacent_formats(doc: &mut Document, root: NodeId) {
    loop {
        let mut merged = false;
        for node in doc.descendants(root) {
            let Some(tag) = doc.tag(node) else { continue };
            if !FORMAT_TAGS.contains(&tag) {
                continue;
            }
            let Some(next) = doc.next_sibling(node) else {
                continue;
            };
            if doc.tag(next) != Some(tag) {
                continue;
            }
            for child in doc.children(next).to_vec() {
                doc.append_child(node, child);
            }
            doc.detach(next);
            merged = true;
            break;
        }
        if !merged {
            return;
        }
    }
}

/// Remove format elements with no content, keeping styled spans: an empty
/// `span` carrying a style is a legitimate cursor anchor.
pub fn cleanup_empty_format_elements(doc: &mut Document, root: NodeId) {
    cleanup_empty_format_elements_except(doc, root, None);
}

/// Like [`cleanup_empty_format_elements`], but leaves the chain holding
/// `protected` alone. The live-editing path protects the wrapper the
/// cursor currently sits in, which is empty only because the user has not
/// typed into it yet.
pub fn cleanup_empty_format_elements_except(
    doc: &mut Document,
    root: NodeId,
    protected: Option<NodeId>,
) {
    // Bottom-up so a wrapper emptied by removing its children goes too.
    let mut nodes = doc.descendants(root);
    nodes.reverse();
    for node in nodes {
        if node == root {
            continue;
        }
        if let Some(protected) = protected {
            if doc.contains(node, protected) {
                continue;
            }
        }
        let Some(tag) = doc.tag(node) else { continue };
        if !FORMAT_TAGS.contains(&tag) && tag != "span" {
            continue;
        }
        if tag == "span" && doc.attr(node, "style").is_some_and(|s| !s.is_empty()) {
            continue;
        }
        if is_effectively_empty(doc, node) {
            doc.detach(node);
        }
    }
}

/// An element is effectively empty when it has no children, or only text
/// children that are all empty strings.
fn is_effectively_empty(doc: &Document, node: NodeId) -> bool {
    doc.children(node)
        .iter()
        .all(|&child| doc.text(child).is_some_and(str::is_empty))
}

/// Give every childless format element an empty text child so the cursor
/// can be placed inside it after a load.
fn restore_format_anchors(doc: &mut Document, root: NodeId) {
    for node in doc.descendants(root) {
        let Some(tag) = doc.tag(node) else { continue };
        let is_format = FORMAT_TAGS.contains(&tag)
            || (tag == "span" && doc.attr(node, "style").is_some_and(|s| !s.is_empty()));
        if is_format && doc.children(node).is_empty() {
            let text = doc.create_text("");
            doc.append_child(node, text);
        }
    }
}

/// Guarantee the root holds at least one paragraph and every empty
/// paragraph holds a `<br>`.
fn ensure_paragraph_structure(doc: &mut Document, root: NodeId) {
    if doc.elements_by_tag(root, "p").is_empty() {
        let p = doc.create_element("p");
        if doc.inner_html(root).trim().is_empty() {
            doc.clear_children(root);
            let br = doc.create_element("br");
            doc.append_child(p, br);
        } else {
            for child in doc.children(root).to_vec() {
                doc.append_child(p, child);
            }
        }
        doc.append_child(root, p);
    }

    for p in doc.elements_by_tag(root, "p") {
        if doc.children(p).is_empty() {
            let br = doc.create_element("br");
            doc.append_child(p, br);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SanitizePolicy {
        SanitizePolicy::default()
    }

    fn serialize(html: &str) -> String {
        let doc = Document::parse_fragment(html);
        serialize_content(&policy(), &doc, doc.root())
    }

    #[test]
    fn test_deserialize_empty_input() {
        assert_eq!(deserialize_content(&policy(), ""), "<p><br></p>");
    }

    #[test]
    fn test_legacy_tags_canonicalized() {
        assert_eq!(serialize("<p><b>a</b><i>b</i></p>"), "<p><strong>a</strong><em>b</em></p>");
    }

    #[test]
    fn test_adjacent_identical_wrappers_merge() {
        assert_eq!(
            serialize("<p><strong>A</strong><strong>B</strong></p>"),
            "<p><strong>AB</strong></p>"
        );
    }

    #[test]
    fn test_merge_repeats_until_fixed_point() {
        assert_eq!(
            serialize("<p><strong>A</strong><strong>B</strong><strong>C</strong></p>"),
            "<p><strong>ABC</strong></p>"
        );
    }

    #[test]
    fn test_legacy_tag_merges_with_canonical() {
        assert_eq!(serialize("<p><b>A</b><strong>B</strong></p>"), "<p><strong>AB</strong></p>");
    }

    #[test]
    fn test_empty_wrappers_dropped() {
        assert_eq!(serialize("<p><strong></strong>text<u></u></p>"), "<p>text</p>");
    }

    #[test]
    fn test_empty_styled_span_kept() {
        let out = serialize(r#"<p><span style="font-size: 14pt"></span>x</p>"#);
        assert_eq!(out, r#"<p><span style="font-size: 14pt"></span>x</p>"#);
    }

    #[test]
    fn test_nested_emptiness_collapses() {
        assert_eq!(serialize("<p><strong><em></em></strong>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_serialized_output_is_sanitized() {
        let out = serialize("<p>ok</p><script>alert(1)</script>");
        assert_eq!(out, "<p>ok</p>");
    }

    #[test]
    fn test_deserialize_wraps_bare_content() {
        let out = deserialize_content(&policy(), "just text");
        assert_eq!(out, "<p>just text</p>");
    }

    #[test]
    fn test_deserialize_fills_empty_paragraphs() {
        let out = deserialize_content(&policy(), "<p></p><p>x</p>");
        assert_eq!(out, "<p><br></p><p>x</p>");
    }

    #[test]
    fn test_deserialize_round_trips_formatted_content() {
        let stored = "<p><strong>bold</strong> and <em>italic</em></p>";
        assert_eq!(deserialize_content(&policy(), stored), stored);
    }
}
