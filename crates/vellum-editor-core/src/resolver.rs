//! Format-state resolution at the cursor.
//!
//! Given a selection anchor, the resolver walks the ancestor-element chain
//! outward to the enclosing paragraph, folding each recognized inline
//! format into a fresh [`FormatState`]. The walk consults the format cache
//! first, keyed on the innermost formatting ancestor, so repeated reads at
//! an unchanged position skip the walk entirely.
//!
//! Delivery has two speeds: a debounced variant for continuous triggers
//! (selection movement while typing) and an immediate variant for discrete
//! toolbar actions that must reflect instantly.

use std::time::Duration;

use vellum_common::config::EditorConfig;
use vellum_common::sanitize_log;

use crate::cache::FormatCache;
use crate::commands::cached_style;
use crate::debounce::Debouncer;
use crate::dom::{Document, NodeId};
use crate::format::{FormatState, InlineFormatKind, classify_inline_format};
use crate::selection::{DomSelection, anchor_element};
use crate::serialize::cleanup_empty_format_elements_except;

/// Debounce key for continuous format-state delivery.
pub const FORMAT_STATE_KEY: &str = "format-state-update";

/// Per-editor format-state resolver.
///
/// Holds the last resolved state so that a missing selection leaves the
/// caller's view of the format untouched.
#[derive(Debug)]
pub struct FormatResolver {
    config: EditorConfig,
    last: FormatState,
}

impl FormatResolver {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            config: config.clone(),
            last: FormatState::neutral(&config.format),
        }
    }

    /// The most recently resolved state.
    pub fn last_state(&self) -> &FormatState {
        &self.last
    }

    /// Resolve the format at the selection anchor.
    ///
    /// No selection is not an error: the last-known state is returned
    /// untouched. A selection pointing at a detached or foreign node is
    /// logged and likewise falls back to the last-known state, so a
    /// malformed surface never breaks the editing loop.
    pub fn resolve(
        &mut self,
        doc: &Document,
        sel: Option<&DomSelection>,
        cache: &mut FormatCache,
    ) -> FormatState {
        let Some(sel) = sel else {
            return self.last.clone();
        };
        let Some(anchor) = anchor_element(doc, &sel.anchor) else {
            tracing::warn!(
                target: "vellum::format",
                anchor = %sanitize_log(&format!("{:?}", sel.anchor)),
                "selection anchor has no element; keeping last state"
            );
            return self.last.clone();
        };
        if !doc.is_attached(anchor) {
            tracing::warn!(
                target: "vellum::format",
                anchor = %sanitize_log(&format!("{anchor:?}")),
                "selection anchor is detached; keeping last state"
            );
            return self.last.clone();
        }

        let ratio = self.config.format.px_to_pt_ratio;
        let chain = self.format_chain(doc, anchor);

        // Cache lookup keyed on the innermost formatting ancestor.
        let cache_key = chain
            .iter()
            .find(|&&el| classify_inline_format(doc, el, ratio).is_some())
            .copied();
        if let Some(key) = cache_key {
            if let Some(cached) = cache.get_format(key) {
                tracing::trace!(target: "vellum::format", "cache hit, skipping walk");
                self.last = cached.clone();
                return cached;
            }
        }

        let state = self.walk(doc, &chain, cache);

        if let Some(key) = cache_key {
            cache.set_format(key, state.clone());
        }
        self.last = state.clone();
        state
    }

    /// Resolve and deliver through `callback` immediately.
    ///
    /// Used for discrete actions (a toolbar click) that must reflect in
    /// the same frame. Also cleans up empty format wrappers left behind by
    /// the action - protecting the one the cursor sits in - and clears the
    /// cache, since the surface may have just changed.
    pub fn update_immediate(
        &mut self,
        doc: &mut Document,
        sel: Option<&DomSelection>,
        cache: &mut FormatCache,
        callback: impl FnOnce(FormatState),
    ) {
        let root = doc.root();
        let protected = sel.map(|s| s.anchor.node);
        cleanup_empty_format_elements_except(doc, root, protected);
        cache.clear_all();

        let state = self.resolve(doc, sel, cache);
        callback(state);
    }

    /// Resolve now, deliver through `callback` once the debounce delay has
    /// passed without another scheduled update.
    ///
    /// Used for continuous triggers; rapid cursor movement coalesces into
    /// one trailing delivery per quiescence window.
    pub fn update_debounced(
        &mut self,
        doc: &Document,
        sel: Option<&DomSelection>,
        cache: &mut FormatCache,
        debouncer: &mut Debouncer,
        callback: impl FnOnce(FormatState) + 'static,
    ) {
        let state = self.resolve(doc, sel, cache);
        let delay = Duration::from_millis(self.config.performance.debounce_delay_ms);
        debouncer.schedule(FORMAT_STATE_KEY, delay, move || callback(state));
    }

    /// The ancestor chain to fold, innermost first, ending at the
    /// enclosing paragraph (inclusive) or the root boundary.
    fn format_chain(&self, doc: &Document, anchor: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(anchor);
        while let Some(el) = current {
            if el == doc.root() {
                break;
            }
            chain.push(el);
            if doc.tag(el) == Some("p") {
                break;
            }
            current = doc.parent(el);
        }
        chain
    }

    fn walk(&self, doc: &Document, chain: &[NodeId], cache: &mut FormatCache) -> FormatState {
        let ratio = self.config.format.px_to_pt_ratio;
        let mut state = FormatState::neutral(&self.config.format);
        let mut font_size_set = false;
        let mut font_family_set = false;
        let mut align_set = false;

        for &el in chain {
            match classify_inline_format(doc, el, ratio) {
                Some(InlineFormatKind::Bold) => state.bold = true,
                Some(InlineFormatKind::Italic) => state.italic = true,
                Some(InlineFormatKind::Underline) => state.underline = true,
                Some(InlineFormatKind::StyledSpan(_)) | None => {
                    // Innermost styled value wins; the paragraph itself can
                    // still contribute alignment.
                    let style = cached_style(doc, el, ratio, cache);
                    if let Some(size) = style.font_size {
                        if !font_size_set {
                            state.font_size = size;
                            font_size_set = true;
                        }
                    }
                    if let Some(family) = style.font_family {
                        if !font_family_set {
                            state.font_family = family;
                            font_family_set = true;
                        }
                    }
                    if let Some(align) = style.text_align {
                        if !align_set {
                            state.text_align = align;
                            align_set = true;
                        }
                    }
                }
            }
        }

        state
    }
}
