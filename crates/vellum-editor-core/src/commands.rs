//! Format commands over the live document.
//!
//! These are the mutation entry points behind toolbar actions: wrapping a
//! selection in a format tag, applying an inline style, probing the
//! ancestor chain for active formatting. Every mutation clears the format
//! cache before returning, since the next format-state read would
//! otherwise see stale entries.

use smol_str::SmolStr;

use crate::cache::FormatCache;
use crate::dom::{Document, NodeId};
use crate::format::{InlineStyle, parse_inline_style};
use crate::selection::{CaretPosition, DomSelection, anchor_element};

/// Toggle a format tag over the selection.
///
/// When the selection already sits inside the tag somewhere in its
/// hierarchy the wrapper is removed; otherwise the selected content is
/// wrapped. A collapsed caret gets an empty wrapper it can type into.
/// Returns whether the document changed.
pub fn toggle_wrap(
    doc: &mut Document,
    sel: &DomSelection,
    tag: &str,
    cache: &mut FormatCache,
) -> bool {
    let Some(element) = anchor_element(doc, &sel.anchor) else {
        return false;
    };

    let changed = if let Some(format_el) = find_format_element(doc, element, tag) {
        unwrap_element(doc, format_el);
        true
    } else {
        wrap_selection(doc, sel, tag)
    };

    if changed {
        cache.clear_all();
    }
    changed
}

/// Apply one style declaration to the selection via a styled span.
///
/// A collapsed caret gets an empty marker span the cursor can enter; a
/// ranged selection within one text node is split and the middle wrapped.
/// Returns whether the document changed.
pub fn apply_style(
    doc: &mut Document,
    sel: &DomSelection,
    property: &str,
    value: &str,
    cache: &mut FormatCache,
) -> bool {
    let style = format!("{property}: {value}");
    let changed = if sel.is_collapsed() {
        insert_wrapper_at(doc, &sel.anchor, "span", Some(&style)).is_some()
    } else {
        wrap_range_in(doc, sel, "span", Some(&style)).is_some()
    };
    if changed {
        cache.clear_all();
    }
    changed
}

/// Build a text node wrapped in the tags implied by the requested marks,
/// underline innermost and bold outermost.
pub fn formatted_text_node(
    doc: &mut Document,
    text: &str,
    bold: bool,
    italic: bool,
    underline: bool,
) -> NodeId {
    let mut node = doc.create_text(text);

    if underline {
        let u = doc.create_element("u");
        doc.append_child(u, node);
        node = u;
    }
    if italic {
        let em = doc.create_element("em");
        doc.append_child(em, node);
        node = em;
    }
    if bold {
        let strong = doc.create_element("strong");
        doc.append_child(strong, node);
        node = strong;
    }

    node
}

/// Whether any ancestor of `node` (inclusive) up to the root carries one
/// of the given tags.
pub fn has_formatting_in_hierarchy(doc: &Document, node: NodeId, tags: &[&str]) -> bool {
    hierarchy(doc, node).any(|n| doc.tag(n).is_some_and(|t| tags.contains(&t)))
}

/// First value of `property` found in the inline styles of the ancestor
/// chain (inclusive, innermost first), parsing through the cache.
pub fn style_from_hierarchy(
    doc: &Document,
    node: NodeId,
    property: &str,
    px_to_pt_ratio: f32,
    cache: &mut FormatCache,
) -> Option<SmolStr> {
    for el in hierarchy(doc, node) {
        let style = cached_style(doc, el, px_to_pt_ratio, cache);
        let value = match property {
            "font-size" => style.font_size,
            "font-family" => style.font_family,
            "text-align" => style.text_align.map(|a| SmolStr::new_static(a.as_str())),
            _ => None,
        };
        if value.is_some() {
            return value;
        }
    }
    None
}

/// Parse an element's inline style, consulting the cache first.
pub fn cached_style(
    doc: &Document,
    el: NodeId,
    px_to_pt_ratio: f32,
    cache: &mut FormatCache,
) -> InlineStyle {
    if let Some(style) = cache.get_style(el) {
        return style;
    }
    let style = doc
        .attr(el, "style")
        .map(|s| parse_inline_style(s, px_to_pt_ratio))
        .unwrap_or_default();
    cache.set_style(el, style.clone());
    style
}

/// Whether the caret sits at the trailing edge of a format element's text,
/// where typed characters would land inside the formatting.
///
/// The node-level part (is this text node the tail of a format wrapper) is
/// cached per node; the offset comparison happens per call.
pub fn is_at_format_boundary(
    doc: &Document,
    caret: &CaretPosition,
    cache: &mut FormatCache,
) -> bool {
    let Some(text) = doc.text(caret.node) else {
        return false;
    };
    if caret.offset != text.chars().count() {
        return false;
    }
    if let Some(cached) = cache.get_boundary(caret.node) {
        return cached;
    }
    let at_boundary = trailing_edge_is_formatted(doc, caret.node);
    cache.set_boundary(caret.node, at_boundary);
    at_boundary
}

fn trailing_edge_is_formatted(doc: &Document, node: NodeId) -> bool {
    let Some(parent) = doc.parent(node) else {
        return false;
    };
    match doc.tag(parent) {
        Some("strong" | "b" | "em" | "i" | "u") => true,
        Some("span") => doc.attr(parent, "style").is_some_and(|s| !s.is_empty()),
        _ => false,
    }
}

/// Step out of the enclosing format element: insert a space after it and
/// return the caret position following the space. Used when the user
/// types a space at a format boundary and expects unformatted text.
pub fn escape_format_at_boundary(
    doc: &mut Document,
    caret: &CaretPosition,
    cache: &mut FormatCache,
) -> Option<CaretPosition> {
    if !is_at_format_boundary(doc, caret, cache) {
        return None;
    }
    let format_el = doc.parent(caret.node)?;
    let space = doc.create_text(" ");
    doc.insert_after(format_el, space);
    cache.clear_all();
    Some(CaretPosition::new(space, 1))
}

/// Remove a wrapper element, lifting its children into its place.
pub fn unwrap_element(doc: &mut Document, el: NodeId) {
    doc.unwrap_node(el);
}

// === Internals ===

fn hierarchy(doc: &Document, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let start = if doc.is_text(node) {
        doc.parent(node)
    } else {
        Some(node)
    };
    std::iter::successors(start, move |&n| doc.parent(n)).take_while(move |&n| n != doc.root())
}

fn find_format_element(doc: &Document, node: NodeId, tag: &str) -> Option<NodeId> {
    hierarchy(doc, node).find(|&n| doc.tag(n) == Some(tag))
}

fn wrap_selection(doc: &mut Document, sel: &DomSelection, tag: &str) -> bool {
    if sel.is_collapsed() {
        insert_wrapper_at(doc, &sel.anchor, tag, None).is_some()
    } else {
        wrap_range_in(doc, sel, tag, None).is_some()
    }
}

/// Insert an empty wrapper at a collapsed caret, returning the wrapper.
/// The wrapper gets an empty text child so the cursor can enter it.
fn insert_wrapper_at(
    doc: &mut Document,
    caret: &CaretPosition,
    tag: &str,
    style: Option<&str>,
) -> Option<NodeId> {
    let wrapper = doc.create_element(tag);
    if let Some(style) = style {
        doc.set_attr(wrapper, "style", style);
    }
    let anchor_text = doc.create_text("");
    doc.append_child(wrapper, anchor_text);

    if doc.is_text(caret.node) {
        let text = doc.text(caret.node)?.to_owned();
        let offset = caret.offset.min(text.chars().count());
        let before: String = text.chars().take(offset).collect();
        let after: String = text.chars().skip(offset).collect();
        doc.set_text(caret.node, before);
        let after_node = doc.create_text(after);
        doc.insert_after(caret.node, after_node);
        doc.insert_after(caret.node, wrapper);
    } else if doc.is_element(caret.node) {
        doc.insert_child_at(caret.node, caret.offset, wrapper);
    } else {
        return None;
    }
    Some(wrapper)
}

/// Wrap the selected range in a new element. Handles a range inside one
/// text node by splitting it; a same-parent range by moving the covered
/// siblings into the wrapper. Returns the wrapper.
fn wrap_range_in(
    doc: &mut Document,
    sel: &DomSelection,
    tag: &str,
    style: Option<&str>,
) -> Option<NodeId> {
    let (start, end) = sel.ordered(doc);

    if start.node == end.node && doc.is_text(start.node) {
        let text = doc.text(start.node)?.to_owned();
        let chars = text.chars().count();
        let (s, e) = (start.offset.min(chars), end.offset.min(chars));
        let before: String = text.chars().take(s).collect();
        let middle: String = text.chars().skip(s).take(e - s).collect();
        let after: String = text.chars().skip(e).collect();

        let wrapper = doc.create_element(tag);
        if let Some(style) = style {
            doc.set_attr(wrapper, "style", style);
        }
        let middle_node = doc.create_text(middle);
        doc.append_child(wrapper, middle_node);

        doc.set_text(start.node, before);
        let after_node = doc.create_text(after);
        doc.insert_after(start.node, after_node);
        doc.insert_after(start.node, wrapper);
        return Some(wrapper);
    }

    let start_parent = doc.parent(start.node)?;
    if Some(start_parent) != doc.parent(end.node) {
        tracing::warn!(target: "vellum::format", "cross-parent wrap not supported");
        return None;
    }

    let siblings = doc.children(start_parent).to_vec();
    let start_pos = siblings.iter().position(|&n| n == start.node)?;
    let end_pos = siblings.iter().position(|&n| n == end.node)?;

    let wrapper = doc.create_element(tag);
    if let Some(style) = style {
        doc.set_attr(wrapper, "style", style);
    }
    doc.insert_before(start.node, wrapper);
    for &node in &siblings[start_pos..=end_pos] {
        doc.append_child(wrapper, node);
    }
    Some(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_text(doc: &Document) -> NodeId {
        doc.descendants(doc.root())
            .into_iter()
            .find(|&n| doc.is_text(n))
            .unwrap()
    }

    #[test]
    fn test_wrap_text_range() {
        let mut doc = Document::parse_fragment("<p>hello world</p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);
        let sel = DomSelection::new(CaretPosition::new(text, 0), CaretPosition::new(text, 5));

        assert!(toggle_wrap(&mut doc, &sel, "strong", &mut cache));
        assert_eq!(
            doc.inner_html(doc.root()),
            "<p><strong>hello</strong> world</p>"
        );
    }

    #[test]
    fn test_toggle_removes_existing_format() {
        let mut doc = Document::parse_fragment("<p><strong>bold</strong></p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);
        let sel = DomSelection::collapsed(CaretPosition::new(text, 2));

        assert!(toggle_wrap(&mut doc, &sel, "strong", &mut cache));
        assert_eq!(doc.inner_html(doc.root()), "<p>bold</p>");
    }

    #[test]
    fn test_collapsed_wrap_inserts_cursor_anchor() {
        let mut doc = Document::parse_fragment("<p>ab</p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);
        let sel = DomSelection::collapsed(CaretPosition::new(text, 1));

        assert!(toggle_wrap(&mut doc, &sel, "em", &mut cache));
        assert_eq!(doc.inner_html(doc.root()), "<p>a<em></em>b</p>");
    }

    #[test]
    fn test_mutation_clears_cache() {
        let mut doc = Document::parse_fragment("<p>x</p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);
        let p = doc.parent(text).unwrap();
        cache.set_format(p, crate::format::FormatState::default());

        let sel = DomSelection::new(CaretPosition::new(text, 0), CaretPosition::new(text, 1));
        toggle_wrap(&mut doc, &sel, "u", &mut cache);
        assert_eq!(cache.get_format(p), None);
    }

    #[test]
    fn test_apply_style_wraps_in_span() {
        let mut doc = Document::parse_fragment("<p>size me</p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);
        let sel = DomSelection::new(CaretPosition::new(text, 0), CaretPosition::new(text, 4));

        assert!(apply_style(&mut doc, &sel, "font-size", "14pt", &mut cache));
        assert_eq!(
            doc.inner_html(doc.root()),
            r#"<p><span style="font-size: 14pt">size</span> me</p>"#
        );
    }

    #[test]
    fn test_formatted_text_node_nesting() {
        let mut doc = Document::new();
        let node = formatted_text_node(&mut doc, "x", true, true, true);
        let root = doc.root();
        doc.append_child(root, node);
        assert_eq!(doc.inner_html(root), "<strong><em><u>x</u></em></strong>");
    }

    #[test]
    fn test_hierarchy_probe() {
        let doc = Document::parse_fragment("<p><strong><em>x</em></strong></p>");
        let text = first_text(&doc);
        assert!(has_formatting_in_hierarchy(&doc, text, &["strong"]));
        assert!(has_formatting_in_hierarchy(&doc, text, &["em"]));
        assert!(!has_formatting_in_hierarchy(&doc, text, &["u"]));
    }

    #[test]
    fn test_style_from_hierarchy() {
        let doc = Document::parse_fragment(
            r#"<p style="text-align: center"><span style="font-size: 16px">x</span></p>"#,
        );
        let mut cache = FormatCache::new();
        let text = first_text(&doc);
        assert_eq!(
            style_from_hierarchy(&doc, text, "font-size", 0.75, &mut cache).as_deref(),
            Some("12pt")
        );
        assert_eq!(
            style_from_hierarchy(&doc, text, "text-align", 0.75, &mut cache).as_deref(),
            Some("center")
        );
        assert_eq!(
            style_from_hierarchy(&doc, text, "font-family", 0.75, &mut cache),
            None
        );
    }

    #[test]
    fn test_format_boundary_detection() {
        let doc = Document::parse_fragment("<p><strong>abc</strong>tail</p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);

        assert!(is_at_format_boundary(
            &doc,
            &CaretPosition::new(text, 3),
            &mut cache
        ));
        assert!(!is_at_format_boundary(
            &doc,
            &CaretPosition::new(text, 1),
            &mut cache
        ));
    }

    #[test]
    fn test_escape_format_at_boundary() {
        let mut doc = Document::parse_fragment("<p><strong>abc</strong></p>");
        let mut cache = FormatCache::new();
        let text = first_text(&doc);

        let caret = escape_format_at_boundary(&mut doc, &CaretPosition::new(text, 3), &mut cache)
            .expect("caret at boundary");
        assert_eq!(doc.inner_html(doc.root()), "<p><strong>abc</strong> </p>");
        assert_eq!(caret.offset, 1);

        // Mid-text caret is not a boundary.
        assert!(
            escape_format_at_boundary(&mut doc, &CaretPosition::new(text, 1), &mut cache).is_none()
        );
    }
}
