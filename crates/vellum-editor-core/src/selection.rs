//! Selection and caret model.
//!
//! The host's selection API is mirrored as explicit values passed into
//! every operation that needs one, rather than read from ambient state.
//! A caret is a node plus an offset: a character offset inside a text
//! node, or a child index inside an element.

use crate::dom::{Document, NodeId};

/// A single caret position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaretPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl CaretPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Build a caret with the offset clamped to the node's bounds:
    /// text length for text nodes, child count for elements.
    pub fn clamped(doc: &Document, node: NodeId, offset: usize) -> Self {
        let max = match doc.text(node) {
            Some(text) => text.chars().count(),
            None => doc.children(node).len(),
        };
        Self {
            node,
            offset: offset.min(max),
        }
    }
}

/// Selection direction in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    None,
}

/// A selection with anchor (where it started) and focus (where it is now).
///
/// Anchor and focus may be in any order; use [`DomSelection::ordered`] for
/// document-ordered bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomSelection {
    pub anchor: CaretPosition,
    pub focus: CaretPosition,
}

impl DomSelection {
    pub fn new(anchor: CaretPosition, focus: CaretPosition) -> Self {
        Self { anchor, focus }
    }

    /// A collapsed selection (caret only).
    pub fn collapsed(caret: CaretPosition) -> Self {
        Self {
            anchor: caret,
            focus: caret,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Determine the selection direction by comparing document positions.
    pub fn direction(&self, doc: &Document) -> Direction {
        if self.is_collapsed() {
            return Direction::None;
        }
        match (caret_sort_key(doc, &self.anchor), caret_sort_key(doc, &self.focus)) {
            (Some(a), Some(f)) => {
                if a <= f {
                    Direction::Forward
                } else {
                    Direction::Backward
                }
            }
            _ => Direction::None,
        }
    }

    /// Return `(start, end)` carets in document order.
    ///
    /// Falls back to `(anchor, focus)` when either node is detached.
    pub fn ordered(&self, doc: &Document) -> (CaretPosition, CaretPosition) {
        match self.direction(doc) {
            Direction::Backward => (self.focus, self.anchor),
            _ => (self.anchor, self.focus),
        }
    }

    /// Whether both endpoints live under `root`.
    pub fn is_within(&self, doc: &Document, root: NodeId) -> bool {
        doc.contains(root, self.anchor.node) && doc.contains(root, self.focus.node)
    }
}

fn caret_sort_key(doc: &Document, caret: &CaretPosition) -> Option<(Vec<usize>, usize)> {
    doc.path_from_root(caret.node)
        .map(|path| (path, caret.offset))
}

/// The element a caret effectively sits in: the parent element for a text
/// node, the node itself for an element.
pub fn anchor_element(doc: &Document, caret: &CaretPosition) -> Option<NodeId> {
    if doc.is_text(caret.node) {
        doc.parent(caret.node)
    } else if doc.is_element(caret.node) {
        Some(caret.node)
    } else {
        None
    }
}

/// The nearest ancestor paragraph of `node` (inclusive), if any.
pub fn nearest_block_ancestor(doc: &Document, node: NodeId) -> Option<NodeId> {
    if doc.tag(node) == Some("p") {
        return Some(node);
    }
    doc.ancestors(node).find(|&a| doc.tag(a) == Some("p"))
}

/// Delete the content covered by a non-collapsed selection.
///
/// Handles a range within one text node precisely; for ranges spanning
/// nodes it trims the boundary text nodes and detaches every node fully
/// covered between them. Returns the collapsed caret at the start of the
/// deleted range.
pub fn delete_range(doc: &mut Document, sel: &DomSelection) -> CaretPosition {
    if sel.is_collapsed() {
        return sel.anchor;
    }
    let (start, end) = sel.ordered(doc);

    if start.node == end.node {
        if let Some(text) = doc.text(start.node) {
            let spliced = splice_text(text, start.offset, end.offset, "");
            doc.set_text(start.node, spliced);
        } else {
            // Element-offset range: drop the covered children.
            let covered: Vec<NodeId> = doc
                .children(start.node)
                .iter()
                .copied()
                .skip(start.offset)
                .take(end.offset.saturating_sub(start.offset))
                .collect();
            for child in covered {
                doc.detach(child);
            }
        }
        return CaretPosition::new(start.node, start.offset);
    }

    // Trim the boundary text nodes.
    if let Some(text) = doc.text(start.node) {
        let kept: String = text.chars().take(start.offset).collect();
        doc.set_text(start.node, kept);
    }
    if let Some(text) = doc.text(end.node) {
        let kept: String = text.chars().skip(end.offset).collect();
        doc.set_text(end.node, kept);
    }

    // Detach every node strictly between the endpoints whose subtree is
    // fully covered (its ancestors hold neither endpoint).
    let root = doc.root();
    let start_path = doc.path_from_root(start.node);
    let end_path = doc.path_from_root(end.node);
    if let (Some(start_path), Some(end_path)) = (start_path, end_path) {
        let mut to_detach = Vec::new();
        for node in doc.descendants(root) {
            if node == root || node == start.node || node == end.node {
                continue;
            }
            if doc.contains(node, start.node) || doc.contains(node, end.node) {
                continue;
            }
            let Some(path) = doc.path_from_root(node) else {
                continue;
            };
            if path > start_path && path < end_path {
                to_detach.push(node);
            }
        }
        // Detaching a covered ancestor drops its subtree in one step.
        for node in to_detach {
            if doc.is_attached(node) {
                doc.detach(node);
            }
        }
    }

    CaretPosition::new(start.node, start.offset)
}

/// Replace `range` of `text` (char offsets) with `replacement`.
pub fn splice_text(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.extend(text.chars().take(start));
    out.push_str(replacement);
    out.extend(text.chars().skip(end.max(start)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_offset() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.create_text("abc");
        doc.append_child(root, text);

        let caret = CaretPosition::clamped(&doc, text, 99);
        assert_eq!(caret.offset, 3);
        let caret = CaretPosition::clamped(&doc, root, 99);
        assert_eq!(caret.offset, 1);
    }

    #[test]
    fn test_direction_detection() {
        let doc = Document::parse_fragment("<p>one</p><p>two</p>");
        let root = doc.root();
        let first = doc.first_child(doc.children(root)[0]).unwrap();
        let second = doc.first_child(doc.children(root)[1]).unwrap();

        let forward = DomSelection::new(
            CaretPosition::new(first, 0),
            CaretPosition::new(second, 1),
        );
        assert_eq!(forward.direction(&doc), Direction::Forward);

        let backward = DomSelection::new(
            CaretPosition::new(second, 1),
            CaretPosition::new(first, 0),
        );
        assert_eq!(backward.direction(&doc), Direction::Backward);
        let (start, _) = backward.ordered(&doc);
        assert_eq!(start.node, first);
    }

    #[test]
    fn test_same_node_direction_by_offset() {
        let doc = Document::parse_fragment("<p>hello</p>");
        let text = doc.first_child(doc.children(doc.root())[0]).unwrap();
        let sel = DomSelection::new(CaretPosition::new(text, 4), CaretPosition::new(text, 1));
        assert_eq!(sel.direction(&doc), Direction::Backward);
    }

    #[test]
    fn test_nearest_block_ancestor() {
        let doc = Document::parse_fragment("<p><strong>x</strong></p>");
        let root = doc.root();
        let strong = doc.elements_by_tag(root, "strong")[0];
        let p = doc.children(root)[0];
        assert_eq!(nearest_block_ancestor(&doc, strong), Some(p));
        assert_eq!(nearest_block_ancestor(&doc, root), None);
    }

    #[test]
    fn test_delete_range_within_text_node() {
        let mut doc = Document::parse_fragment("<p>hello world</p>");
        let text = doc.first_child(doc.children(doc.root())[0]).unwrap();
        let sel = DomSelection::new(CaretPosition::new(text, 5), CaretPosition::new(text, 11));
        let caret = delete_range(&mut doc, &sel);
        assert_eq!(doc.inner_html(doc.root()), "<p>hello</p>");
        assert_eq!(caret, CaretPosition::new(text, 5));
    }

    #[test]
    fn test_delete_range_across_nodes() {
        let mut doc = Document::parse_fragment("<p>abc<strong>mid</strong>xyz</p>");
        let p = doc.children(doc.root())[0];
        let first = doc.children(p)[0];
        let last = doc.children(p)[2];
        let sel = DomSelection::new(CaretPosition::new(first, 1), CaretPosition::new(last, 2));
        delete_range(&mut doc, &sel);
        assert_eq!(doc.inner_html(doc.root()), "<p>az</p>");
    }

    #[test]
    fn test_splice_text() {
        assert_eq!(splice_text("hello", 1, 4, ""), "ho");
        assert_eq!(splice_text("hello", 2, 2, "XY"), "heXYllo");
    }
}
