//! The paste pipeline.
//!
//! One paste event flows through classify -> clean -> validate -> insert.
//! Everything that can reject does so before the document is touched, so a
//! failed paste never leaves a partial insertion behind. Failures surface
//! as [`PasteResult`] values; nothing in the public paste API panics or
//! returns a hard error.

use smol_str::SmolStr;
use vellum_common::config::EditorConfig;
use vellum_common::sanitize_log;

use crate::cache::FormatCache;
use crate::dom::{Document, NodeId, escape_text};
use crate::format::FormatState;
use crate::security::{SanitizePolicy, sanitize_html};
use crate::selection::{
    CaretPosition, DomSelection, anchor_element, delete_range, nearest_block_ancestor, splice_text,
};
use crate::serialize::{cleanup_empty_format_elements, normalize_content};
use crate::validate::validate_content;

/// Clipboard access as the host provides it: a set of MIME types and a
/// reader per type. Implemented by the host's clipboard event wrapper and
/// by [`InMemoryClipboard`] for tests.
pub trait ClipboardPayload {
    fn types(&self) -> Vec<String>;
    fn get_data(&self, mime: &str) -> Option<String>;
}

/// A clipboard held in memory. The test double, and the representation
/// hosts without a native clipboard hand over.
#[derive(Clone, Debug, Default)]
pub struct InMemoryClipboard {
    entries: Vec<(String, String)>,
}

impl InMemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mime: impl Into<String>, data: impl Into<String>) -> Self {
        self.entries.push((mime.into(), data.into()));
        self
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self::new().with("text/html", html)
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().with("text/plain", text)
    }
}

impl ClipboardPayload for InMemoryClipboard {
    fn types(&self) -> Vec<String> {
        self.entries.iter().map(|(mime, _)| mime.clone()).collect()
    }

    fn get_data(&self, mime: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(m, _)| m == mime)
            .map(|(_, data)| data.clone())
    }
}

/// Options for one paste operation.
#[derive(Clone, Copy, Debug)]
pub struct PasteOptions {
    pub preserve_formatting: bool,
    pub cleanup_html: bool,
    pub max_length: Option<usize>,
}

impl Default for PasteOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            cleanup_html: true,
            max_length: None,
        }
    }
}

/// Outcome of one paste operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasteResult {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
}

impl PasteResult {
    fn ok(content: String) -> Self {
        Self {
            success: true,
            content,
            error: None,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Inline wrapper tags preserved by inline extraction.
const INLINE_TAGS: &[&str] = &["strong", "b", "em", "i", "u", "span"];

/// Attributes allowed to survive the block-paste element cleanup.
const PASTE_ALLOWED_ATTRS: &[&str] = &["style"];

/// Per-editor paste service.
#[derive(Clone, Debug)]
pub struct PasteService {
    config: EditorConfig,
    policy: SanitizePolicy,
}

impl PasteService {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            config: config.clone(),
            policy: SanitizePolicy::from_config(config),
        }
    }

    /// Whether the clipboard offers an HTML flavor.
    pub fn has_html_content<C: ClipboardPayload>(clipboard: &C) -> bool {
        clipboard.types().iter().any(|t| t == "text/html")
    }

    /// Whether the clipboard offers an image flavor.
    pub fn has_image_content<C: ClipboardPayload>(clipboard: &C) -> bool {
        clipboard.types().iter().any(|t| t.starts_with("image/"))
    }

    /// Run one paste against the document.
    ///
    /// The selection is the live one at the moment of the paste event; a
    /// non-collapsed selection is replaced by the pasted content. A
    /// rejected paste returns `success: false` and leaves the document
    /// untouched. An empty clipboard is a successful no-op.
    pub fn handle_paste<C: ClipboardPayload>(
        &self,
        doc: &mut Document,
        sel: &DomSelection,
        clipboard: &C,
        options: &PasteOptions,
        cache: &mut FormatCache,
    ) -> PasteResult {
        let html = clipboard.get_data("text/html").unwrap_or_default();
        let text = clipboard.get_data("text/plain").unwrap_or_default();

        let content = if !html.is_empty() && options.preserve_formatting {
            self.cleanup_pasted_content(&html, doc, sel, options.cleanup_html)
        } else {
            process_plain_text(&text)
        };

        if content.is_empty() {
            // No-op paste is not an error.
            return PasteResult::ok(content);
        }

        if !validate_content(&self.config, &content) {
            tracing::warn!(
                target: "vellum::paste",
                preview = %sanitize_log(&content),
                "paste rejected by validation"
            );
            return PasteResult::rejected("Invalid content detected");
        }

        if let Some(max) = options.max_length {
            if content.chars().count() > max {
                return PasteResult::rejected(format!(
                    "Content exceeds maximum length of {max} characters"
                ));
            }
        }

        match insert_content(doc, sel, &content) {
            Ok(()) => {
                cache.clear_all();
                tracing::debug!(
                    target: "vellum::paste",
                    content_len = content.len(),
                    "paste inserted"
                );
                PasteResult::ok(content)
            }
            Err(reason) => PasteResult::rejected(sanitize_log(&reason)),
        }
    }

    /// Clean pasted HTML for insertion.
    ///
    /// The payload is sanitized first, then the destination decides the
    /// shape: pasting into a paragraph that already has content keeps only
    /// inline marks and flattens source block structure into the paragraph
    /// flow; pasting at a structural boundary keeps paragraph structure
    /// and deep-cleans elements instead.
    pub fn cleanup_pasted_content(
        &self,
        html: &str,
        doc: &Document,
        sel: &DomSelection,
        cleanup: bool,
    ) -> String {
        let sanitized = sanitize_html(&self.policy, html);
        let mut fragment = Document::parse_fragment(&sanitized);
        let root = fragment.root();

        if self.is_inline_destination(doc, sel) {
            return extract_inline_content(&fragment);
        }

        self.sanitize_element_tree(&mut fragment, root);
        if cleanup {
            normalize_content(&mut fragment, root);
            cleanup_empty_format_elements(&mut fragment, root);
        }
        fragment.inner_html(root)
    }

    /// Destination policy: inline only when the caret's nearest block
    /// ancestor is a paragraph that already has content. Any other block
    /// context (bare root, future list items) takes the block path.
    fn is_inline_destination(&self, doc: &Document, sel: &DomSelection) -> bool {
        let Some(anchor) = anchor_element(doc, &sel.anchor) else {
            return false;
        };
        let Some(p) = nearest_block_ancestor(doc, anchor) else {
            return false;
        };
        !doc.text_content(p).trim().is_empty()
    }

    /// Recursive element cleanup for block paste: strip attributes not in
    /// the paste allow-list, unwrap elements whose tag the surface does
    /// not accept, keeping their content.
    fn sanitize_element_tree(&self, doc: &mut Document, node: NodeId) {
        let names: Vec<SmolStr> = doc.attrs(node).iter().map(|(n, _)| n.clone()).collect();
        for name in names {
            if !PASTE_ALLOWED_ATTRS.contains(&name.to_ascii_lowercase().as_str()) {
                doc.remove_attr(node, &name);
            }
        }

        for child in doc.children(node).to_vec() {
            if !doc.is_element(child) {
                continue;
            }
            let allowed = doc
                .tag(child)
                .is_some_and(|t| self.config.security.allowed_tags.iter().any(|a| a == t));
            if allowed {
                self.sanitize_element_tree(doc, child);
            } else {
                self.sanitize_element_tree(doc, child);
                doc.unwrap_node(child);
            }
        }
    }

    /// Wrap a content fragment in the marks implied by a target format.
    ///
    /// An explicit operation, not part of the automatic paste pipeline.
    /// Wrapping applies bold, then italic, then underline, so the nesting
    /// is deterministic; font styles that differ from the configured
    /// defaults are carried on an outer styled span.
    pub fn preserve_formatting(&self, content: &str, target: &FormatState) -> String {
        if content.is_empty() {
            return String::new();
        }
        let mut doc = Document::parse_fragment(content);
        let root = doc.root();

        if target.bold {
            wrap_children(&mut doc, root, "strong", None);
        }
        if target.italic {
            wrap_children(&mut doc, root, "em", None);
        }
        if target.underline {
            wrap_children(&mut doc, root, "u", None);
        }

        let defaults = &self.config.format;
        if target.font_size != defaults.default_font_size.as_str()
            || target.font_family != defaults.default_font_family.as_str()
        {
            let style = format!(
                "font-size: {}; font-family: {}",
                target.font_size, target.font_family
            );
            wrap_children(&mut doc, root, "span", Some(&style));
        }

        doc.inner_html(root)
    }
}

/// Plain-text paste: split on line breaks, escape each line, and wrap
/// non-blank lines in paragraphs. Blank lines become empty paragraphs.
pub fn process_plain_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.split('\n') {
        let trimmed = line.trim_end_matches('\r').trim();
        if trimmed.is_empty() {
            out.push_str("<p><br></p>");
        } else {
            out.push_str("<p>");
            out.push_str(&escape_text(trimmed));
            out.push_str("</p>");
        }
    }
    out
}

/// Extract only text and whitelisted inline wrappers from a fragment,
/// flattening any block structure into one inline flow.
fn extract_inline_content(src: &Document) -> String {
    let mut out = Document::new();
    let out_root = out.root();
    extract_inline_nodes(src, src.root(), &mut out, out_root);
    out.inner_html(out_root)
}

fn extract_inline_nodes(src: &Document, src_node: NodeId, out: &mut Document, target: NodeId) {
    for &child in src.children(src_node) {
        if let Some(text) = src.text(child) {
            let copy = out.create_text(text);
            out.append_child(target, copy);
            continue;
        }
        let Some(tag) = src.tag(child) else { continue };
        if INLINE_TAGS.contains(&tag) {
            let clone = out.create_element(SmolStr::new(tag));
            // Only a span's style attribute carries meaning inline.
            if tag == "span" {
                if let Some(style) = src.attr(child, "style") {
                    out.set_attr(clone, "style", style);
                }
            }
            out.append_child(target, clone);
            extract_inline_nodes(src, child, out, clone);
        } else {
            // Block wrapper: keep its content, drop the wrapper.
            extract_inline_nodes(src, child, out, target);
        }
    }
}

fn wrap_children(doc: &mut Document, parent: NodeId, tag: &str, style: Option<&str>) {
    let wrapper = doc.create_element(SmolStr::new(tag));
    if let Some(style) = style {
        doc.set_attr(wrapper, "style", style);
    }
    for child in doc.children(parent).to_vec() {
        doc.append_child(wrapper, child);
    }
    doc.append_child(parent, wrapper);
}

/// Insert prepared content at the selection, deleting a non-collapsed
/// selection first. Runs only after validation has accepted the content.
fn insert_content(doc: &mut Document, sel: &DomSelection, content: &str) -> Result<(), String> {
    if doc.data(sel.anchor.node).is_none() || !doc.is_attached(sel.anchor.node) {
        return Err("paste target is no longer in the document".to_owned());
    }

    let caret = if sel.is_collapsed() {
        sel.anchor
    } else {
        delete_range(doc, sel)
    };

    if content.contains('<') {
        insert_html_at(doc, caret, content);
    } else {
        insert_text_at(doc, caret, content);
    }
    Ok(())
}

/// Insert plain text at the caret, splicing into the text node when the
/// caret is inside one. Preserves native caret placement semantics.
pub fn insert_text_at(doc: &mut Document, caret: CaretPosition, text: &str) -> CaretPosition {
    if let Some(existing) = doc.text(caret.node) {
        let spliced = splice_text(existing, caret.offset, caret.offset, text);
        doc.set_text(caret.node, spliced);
        return CaretPosition::new(caret.node, caret.offset + text.chars().count());
    }
    let node = doc.create_text(text);
    doc.insert_child_at(caret.node, caret.offset, node);
    CaretPosition::new(node, text.chars().count())
}

/// Insert an HTML fragment at the caret.
///
/// Block content lands at the block level: it replaces the caret's
/// paragraph when that paragraph is an empty placeholder, and follows it
/// otherwise. Inline content splits the caret's text node and flows in
/// place.
pub fn insert_html_at(doc: &mut Document, caret: CaretPosition, html: &str) -> CaretPosition {
    let fragment = Document::parse_fragment(html);
    let has_blocks = fragment
        .children(fragment.root())
        .iter()
        .any(|&n| fragment.tag(n) == Some("p"));

    if has_blocks {
        let block = anchor_element(doc, &caret)
            .and_then(|el| nearest_block_ancestor(doc, el));
        let inserted = match block {
            Some(p) if doc.text_content(p).trim().is_empty() => {
                let mut ids = Vec::new();
                for &child in fragment.children(fragment.root()) {
                    if let Some(id) = doc.graft(&fragment, child, doc.parent(p).unwrap_or(p)) {
                        doc.insert_before(p, id);
                        ids.push(id);
                    }
                }
                doc.detach(p);
                ids
            }
            Some(p) => {
                let mut ids = Vec::new();
                let mut reference = p;
                for &child in fragment.children(fragment.root()) {
                    if let Some(id) = doc.graft(&fragment, child, doc.parent(p).unwrap_or(p)) {
                        doc.insert_after(reference, id);
                        reference = id;
                        ids.push(id);
                    }
                }
                ids
            }
            None => {
                let root = doc.root();
                doc.graft_children(&fragment, fragment.root(), root)
            }
        };
        return caret_after(doc, inserted.last().copied(), caret);
    }

    // Inline fragment: flow into the text at the caret.
    if doc.is_text(caret.node) {
        let text = doc.text(caret.node).unwrap_or_default().to_owned();
        let before: String = text.chars().take(caret.offset).collect();
        let after: String = text.chars().skip(caret.offset).collect();
        doc.set_text(caret.node, before);
        let after_node = doc.create_text(after);
        doc.insert_after(caret.node, after_node);

        let mut reference = caret.node;
        let mut last = None;
        for &child in fragment.children(fragment.root()) {
            if let Some(parent) = doc.parent(reference) {
                if let Some(id) = doc.graft(&fragment, child, parent) {
                    doc.insert_after(reference, id);
                    reference = id;
                    last = Some(id);
                }
            }
        }
        return caret_after(doc, last, caret);
    }

    let inserted = if doc.is_element(caret.node) {
        let mut ids = Vec::new();
        for (offset, &child) in fragment.children(fragment.root()).iter().enumerate() {
            if let Some(id) = doc.graft(&fragment, child, caret.node) {
                doc.insert_child_at(caret.node, caret.offset + offset, id);
                ids.push(id);
            }
        }
        ids
    } else {
        Vec::new()
    };
    caret_after(doc, inserted.last().copied(), caret)
}

/// The caret position following `node`, or the original caret when
/// nothing was inserted.
fn caret_after(doc: &Document, node: Option<NodeId>, fallback: CaretPosition) -> CaretPosition {
    match node {
        Some(node) => {
            let offset = match doc.text(node) {
                Some(text) => text.chars().count(),
                None => doc.children(node).len(),
            };
            CaretPosition::new(node, offset)
        }
        None => fallback,
    }
}
