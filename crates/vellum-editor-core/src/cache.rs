//! Node-keyed caching for format resolution.
//!
//! Three independent maps associate live nodes with their computed format
//! state, boundary flag, and parsed inline style. There is no TTL:
//! correctness depends entirely on every content-mutation site calling
//! [`FormatCache::clear_all`] before the next read. Missing an
//! invalidation silently reintroduces stale-format bugs, which is exactly
//! what the boundary tests guard against.
//!
//! Entries carry the generation they were written under; `clear_all`
//! bumps the generation, so entries from before a mutation can never be
//! read back even though they are discarded lazily. This gives the same
//! "no stale read survives a mutation" behavior a weak map would, without
//! depending on collector timing.

use std::collections::HashMap;

use crate::dom::NodeId;
use crate::format::{FormatState, InlineStyle};

/// Entry count above which `clear_all` drops the backing maps eagerly
/// instead of leaving stale generations for lazy cleanup.
const COMPACT_THRESHOLD: usize = 4096;

/// Per-editor cache of computed format data, keyed by node identity.
///
/// Construct one per editor instance; two editors must never share one.
#[derive(Debug, Default)]
pub struct FormatCache {
    generation: u64,
    format: HashMap<NodeId, (u64, FormatState)>,
    boundary: HashMap<NodeId, (u64, bool)>,
    style: HashMap<NodeId, (u64, InlineStyle)>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_format(&mut self, node: NodeId) -> Option<FormatState> {
        Self::read(self.generation, &mut self.format, node)
    }

    pub fn set_format(&mut self, node: NodeId, state: FormatState) {
        self.format.insert(node, (self.generation, state));
    }

    pub fn get_boundary(&mut self, node: NodeId) -> Option<bool> {
        Self::read(self.generation, &mut self.boundary, node)
    }

    pub fn set_boundary(&mut self, node: NodeId, at_boundary: bool) {
        self.boundary.insert(node, (self.generation, at_boundary));
    }

    pub fn get_style(&mut self, node: NodeId) -> Option<InlineStyle> {
        Self::read(self.generation, &mut self.style, node)
    }

    pub fn set_style(&mut self, node: NodeId, style: InlineStyle) {
        self.style.insert(node, (self.generation, style));
    }

    /// Invalidate all three maps at once.
    ///
    /// Every content mutation (paste, format toggle, delete) must call
    /// this before the next cache read.
    pub fn clear_all(&mut self) {
        self.generation += 1;
        if self.format.len() + self.boundary.len() + self.style.len() > COMPACT_THRESHOLD {
            self.format.clear();
            self.boundary.clear();
            self.style.clear();
        }
    }

    /// Current generation, bumped on every `clear_all`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn read<V: Clone>(
        generation: u64,
        map: &mut HashMap<NodeId, (u64, V)>,
        node: NodeId,
    ) -> Option<V> {
        match map.get(&node) {
            Some((entry_generation, value)) if *entry_generation == generation => {
                Some(value.clone())
            }
            Some(_) => {
                // Stale generation: discard lazily on read.
                map.remove(&node);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn make_node() -> (Document, NodeId) {
        let mut doc = Document::new();
        let el = doc.create_element("strong");
        let root = doc.root();
        doc.append_child(root, el);
        (doc, el)
    }

    #[test]
    fn test_format_round_trip() {
        let (_doc, el) = make_node();
        let mut cache = FormatCache::new();
        let state = FormatState {
            bold: true,
            ..FormatState::default()
        };

        cache.set_format(el, state.clone());
        assert_eq!(cache.get_format(el), Some(state));
    }

    #[test]
    fn test_clear_all_invalidates_every_map() {
        let (_doc, el) = make_node();
        let mut cache = FormatCache::new();

        cache.set_format(el, FormatState::default());
        cache.set_boundary(el, true);
        cache.set_style(el, InlineStyle::default());
        cache.clear_all();

        assert_eq!(cache.get_format(el), None);
        assert_eq!(cache.get_boundary(el), None);
        assert_eq!(cache.get_style(el), None);
    }

    #[test]
    fn test_boundary_round_trip() {
        let (_doc, el) = make_node();
        let mut cache = FormatCache::new();

        cache.set_boundary(el, true);
        assert_eq!(cache.get_boundary(el), Some(true));
    }

    #[test]
    fn test_writes_after_clear_are_visible() {
        let (_doc, el) = make_node();
        let mut cache = FormatCache::new();

        cache.set_format(el, FormatState::default());
        cache.clear_all();
        let fresh = FormatState {
            italic: true,
            ..FormatState::default()
        };
        cache.set_format(el, fresh.clone());
        assert_eq!(cache.get_format(el), Some(fresh));
    }

    #[test]
    fn test_instances_are_independent() {
        let (_doc, el) = make_node();
        let mut a = FormatCache::new();
        let mut b = FormatCache::new();

        a.set_format(el, FormatState::default());
        assert_eq!(b.get_format(el), None);
        b.clear_all();
        assert!(a.get_format(el).is_some());
    }
}
