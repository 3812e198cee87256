//! Arena-backed document model for the editing surface.
//!
//! The host owns a live editing surface; this model mirrors it as an
//! id-addressed node arena so the format resolver, paste pipeline, and
//! serializer can be driven without a browser. Node ids are stable for the
//! lifetime of the document and cheap to copy, which makes them usable as
//! cache keys. Detached nodes stay in the arena as tombstones; structural
//! queries treat them as absent.

use smol_str::SmolStr;

/// Stable identifier for a node within one [`Document`].
///
/// Ids are never reused. An id from one document must not be used with
/// another; lookups with a foreign id simply return `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a single node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Element {
        tag: SmolStr,
        attrs: Vec<(SmolStr, String)>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Tags serialized without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// The editing surface as an id-addressed tree.
///
/// The root is a synthetic container element (the editable region itself);
/// it is never serialized, only its contents are.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document: a root container with no content.
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                tag: SmolStr::new_static("div"),
                attrs: Vec::new(),
            },
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
        }
    }

    /// Parse an HTML fragment into a fresh document.
    ///
    /// Parsing is delegated to html5ever (via `scraper`), so malformed
    /// markup is recovered the way a browser would recover it. Comments,
    /// doctypes, and processing instructions are dropped.
    pub fn parse_fragment(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        doc.append_parsed_fragment(html, root);
        doc
    }

    /// Parse `html` and append the resulting nodes as children of `parent`.
    pub fn append_parsed_fragment(&mut self, html: &str, parent: NodeId) -> Vec<NodeId> {
        let parsed = scraper::Html::parse_fragment(html);
        let mut appended = Vec::new();
        for child in parsed.tree.root().children() {
            // html5ever wraps fragment content in a synthetic <html> element.
            if let scraper::Node::Element(el) = child.value() {
                if el.name() == "html" {
                    for grandchild in child.children() {
                        self.convert_parsed(&grandchild, parent, &mut appended);
                    }
                    continue;
                }
            }
            self.convert_parsed(&child, parent, &mut appended);
        }
        appended
    }

    fn convert_parsed(
        &mut self,
        node: &ego_tree::NodeRef<'_, scraper::Node>,
        parent: NodeId,
        appended: &mut Vec<NodeId>,
    ) {
        match node.value() {
            scraper::Node::Element(el) => {
                let id = self.create_element(el.name());
                for (name, value) in el.attrs() {
                    self.set_attr(id, name, value);
                }
                self.append_child(parent, id);
                appended.push(id);
                let mut nested = Vec::new();
                for child in node.children() {
                    self.convert_parsed(&child, id, &mut nested);
                }
            }
            scraper::Node::Text(text) => {
                let id = self.create_text(&*text.text);
                self.append_child(parent, id);
                appended.push(id);
            }
            // Comments, doctypes, and PIs have no place on the surface.
            _ => {}
        }
    }

    // === Node construction ===

    pub fn create_element(&mut self, tag: impl Into<SmolStr>) -> NodeId {
        self.push_node(NodeData::Element {
            tag: tag.into(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    // === Accessors ===

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    /// Tag name of an element node, `None` for text nodes and unknown ids.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Text of a text node, `None` for elements and unknown ids.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element { .. } => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            if let NodeData::Text(t) = &mut node.data {
                *t = text.into();
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n.as_str() == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(SmolStr, String)] {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    /// Rename an element in place, keeping attributes and children.
    pub fn rename_element(&mut self, id: NodeId, tag: impl Into<SmolStr>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            if let NodeData::Element { tag: t, .. } = &mut node.data {
                *t = tag.into();
            }
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            if let NodeData::Element { attrs, .. } = &mut node.data {
                let value = value.into();
                match attrs.iter_mut().find(|(n, _)| n.as_str() == name) {
                    Some(entry) => entry.1 = value,
                    None => attrs.push((SmolStr::new(name), value)),
                }
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            if let NodeData::Element { attrs, .. } = &mut node.data {
                attrs.retain(|(n, _)| n.as_str() != name);
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` contains `id` (inclusive).
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Iterate the ancestor chain of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// All elements with the given tag under `root`, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.tag(n) == Some(tag))
            .collect()
    }

    /// Concatenated text of all text nodes under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Child-index path from the root down to `id`.
    ///
    /// Used for document-order comparison of arbitrary nodes. Returns
    /// `None` for detached or foreign nodes.
    pub fn path_from_root(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            let parent = self.parent(current)?;
            let pos = self.children(parent).iter().position(|&c| c == current)?;
            path.push(pos);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    // === Structural mutation ===

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Insert `child` under `parent` at `index` (clamped to the child count).
    pub fn insert_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        let index = index.min(self.nodes[parent.index()].children.len());
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.insert(index, child);
    }

    /// Insert `child` immediately before `reference` under its parent.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        self.detach(child);
        if let Some(parent) = self.parent(reference) {
            let pos = self
                .children(parent)
                .iter()
                .position(|&c| c == reference)
                .unwrap_or(0);
            self.insert_child_at(parent, pos, child);
        }
    }

    /// Insert `child` immediately after `reference` under its parent.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        self.detach(child);
        if let Some(parent) = self.parent(reference) {
            let pos = self
                .children(parent)
                .iter()
                .position(|&c| c == reference)
                .map(|p| p + 1)
                .unwrap_or_else(|| self.children(parent).len());
            self.insert_child_at(parent, pos, child);
        }
    }

    /// Remove `id` from its parent. The subtree stays in the arena but is
    /// no longer reachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != id);
        self.nodes[id.index()].parent = None;
    }

    /// Replace an element with its children ("flatten unknown wrapper,
    /// keep content").
    pub fn unwrap_node(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let pos = self
            .children(parent)
            .iter()
            .position(|&c| c == id)
            .unwrap_or(0);
        let children: Vec<NodeId> = self.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child_at(parent, pos + offset, child);
        }
        self.detach(id);
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
    }

    /// Deep-copy the subtree rooted at `src_id` in `src` into this
    /// document, appending it under `parent`. Returns the new root id.
    pub fn graft(&mut self, src: &Document, src_id: NodeId, parent: NodeId) -> Option<NodeId> {
        let new_id = match src.data(src_id)? {
            NodeData::Element { tag, attrs } => {
                let id = self.create_element(tag.clone());
                for (name, value) in attrs {
                    self.set_attr(id, name, value.clone());
                }
                id
            }
            NodeData::Text(text) => self.create_text(text.clone()),
        };
        self.append_child(parent, new_id);
        for &child in src.children(src_id) {
            self.graft(src, child, new_id);
        }
        Some(new_id)
    }

    /// Deep-copy the *children* of `src_id` under `parent`.
    pub fn graft_children(&mut self, src: &Document, src_id: NodeId, parent: NodeId) -> Vec<NodeId> {
        src.children(src_id)
            .iter()
            .filter_map(|&child| self.graft(src, child, parent))
            .collect()
    }

    /// Clone the subtree rooted at `id` into a fresh document whose root
    /// container holds the copied children of `id`.
    pub fn clone_subtree(&self, id: NodeId) -> Document {
        let mut out = Document::new();
        let root = out.root;
        out.graft_children(self, id, root);
        out
    }

    // === Serialization ===

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(&escape_text(text)),
            Some(NodeData::Element { tag, attrs }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            None => {}
        }
    }
}

/// Escape a string for use as HTML text content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape a string for use inside a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_round_trip() {
        let doc = Document::parse_fragment("<p><strong>Bold</strong> text</p>");
        let root = doc.root();
        assert_eq!(doc.inner_html(root), "<p><strong>Bold</strong> text</p>");
    }

    #[test]
    fn test_parse_empty_fragment() {
        let doc = Document::parse_fragment("");
        assert_eq!(doc.inner_html(doc.root()), "");
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_text_escaping() {
        let mut doc = Document::new();
        let root = doc.root();
        let text = doc.create_text("a < b & c");
        doc.append_child(root, text);
        assert_eq!(doc.inner_html(root), "a &lt; b &amp; c");
    }

    #[test]
    fn test_entities_survive_round_trip() {
        let doc = Document::parse_fragment("<p>a &lt;script&gt; b</p>");
        let html = doc.inner_html(doc.root());
        assert_eq!(html, "<p>a &lt;script&gt; b</p>");
        let again = Document::parse_fragment(&html);
        assert_eq!(again.inner_html(again.root()), html);
    }

    #[test]
    fn test_void_elements() {
        let doc = Document::parse_fragment("<p><br></p>");
        assert_eq!(doc.inner_html(doc.root()), "<p><br></p>");
    }

    #[test]
    fn test_unwrap_keeps_content() {
        let mut doc = Document::parse_fragment("<p><u>kept</u></p>");
        let root = doc.root();
        let u = doc.elements_by_tag(root, "u")[0];
        doc.unwrap_node(u);
        assert_eq!(doc.inner_html(root), "<p>kept</p>");
        assert!(!doc.is_attached(u));
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut doc = Document::parse_fragment("<p>b</p>");
        let root = doc.root();
        let p = doc.children(root)[0];
        let before = doc.create_element("p");
        let after = doc.create_element("p");
        doc.insert_before(p, before);
        doc.insert_after(p, after);
        assert_eq!(doc.children(root), &[before, p, after]);
    }

    #[test]
    fn test_detach_makes_subtree_unreachable() {
        let mut doc = Document::parse_fragment("<p>one</p><p>two</p>");
        let root = doc.root();
        let first = doc.children(root)[0];
        doc.detach(first);
        assert_eq!(doc.inner_html(root), "<p>two</p>");
        assert!(!doc.is_attached(first));
        assert!(doc.path_from_root(first).is_none());
    }

    #[test]
    fn test_text_content_concatenates() {
        let doc = Document::parse_fragment("<p><strong>a</strong>b<em>c</em></p>");
        assert_eq!(doc.text_content(doc.root()), "abc");
    }

    #[test]
    fn test_graft_children_copies_subtree() {
        let src = Document::parse_fragment("<p><em>x</em></p>");
        let mut dst = Document::new();
        let dst_root = dst.root();
        dst.graft_children(&src, src.root(), dst_root);
        assert_eq!(dst.inner_html(dst_root), "<p><em>x</em></p>");
    }

    #[test]
    fn test_path_ordering() {
        let doc = Document::parse_fragment("<p>a</p><p><strong>b</strong></p>");
        let root = doc.root();
        let first_p = doc.children(root)[0];
        let strong = doc.elements_by_tag(root, "strong")[0];
        assert!(doc.path_from_root(first_p).unwrap() < doc.path_from_root(strong).unwrap());
    }

    #[test]
    fn test_malformed_html_recovers() {
        let doc = Document::parse_fragment("<p>unclosed <strong>bold");
        let html = doc.inner_html(doc.root());
        assert!(html.contains("unclosed"));
        assert!(html.contains("<strong>bold</strong>"));
    }
}
