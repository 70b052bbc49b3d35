//! Arena-backed document tree
//!
//! `Document` is the live, mutable tree the engine scans. It owns every node
//! in a flat arena addressed by [`NodeId`]; detached nodes stay in the arena
//! but are unreachable from the root.
//!
//! Once [`Document::observe`] has been called, every structural insertion is
//! recorded as a [`MutationRecord`]. The host drains the accumulated batch with
//! [`Document::take_records`] and hands it to the mutation watcher.
//!
//! # Example
//!
//! ```ignore
//! use context_lingo::dom::Document;
//!
//! let mut doc = Document::parse("<body><p>Good <b>mor</b>ning</p></body>");
//! let body = doc.body();
//! assert_eq!(doc.inner_html(body), "<p>Good <b>mor</b>ning</p>");
//! assert_eq!(doc.text_content(body), "Good morning");
//! ```

pub mod parser;
pub mod serialize;

use crate::error::{SwapError, SwapResult};

pub use serialize::MatchableContent;

/// Elements that never have children or an end tag
pub const VOID_ELEMENTS: [&str; 18] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Index of a node inside its document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tag name and attributes of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order; names are lowercased
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// The payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One structural change: `added_nodes` were inserted under `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
}

/// A mutable document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    observing: bool,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Document {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            observing: false,
            records: Vec::new(),
        }
    }

    /// Parse a complete HTML document
    ///
    /// Parsing never fails; malformed markup is repaired the way a browser
    /// repairs it, and `html`, `head` and `body` are always present.
    pub fn parse(html: &str) -> Self {
        let mut doc = Document::new();
        let root = doc.root;
        parser::parse_document_into(&mut doc, root, html);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element, or the root when the document has none
    pub fn body(&self) -> NodeId {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.tag_name(id) == Some("body"))
            .unwrap_or(self.root)
    }

    // ========== Node access ==========

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Nearest element ancestor (the parent, if it is an element)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&parent| self.is_element(parent))
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Strict descendants in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    pub fn find_elements_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(|data| data.has_class(class)))
            .collect()
    }

    // ========== Construction ==========

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.push_node(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Comment(text.to_string()))
    }

    pub(crate) fn create_doctype(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Doctype(text.to_string()))
    }

    /// Parse an HTML fragment as content of `context` into detached nodes,
    /// returned in order
    pub fn parse_fragment(&mut self, context: NodeId, html: &str) -> Vec<NodeId> {
        let context_name = self.tag_name(context).unwrap_or("body").to_string();
        let holder = self.push_node(NodeKind::Document);
        parser::parse_fragment_into(self, holder, html, &context_name);
        let nodes = std::mem::take(&mut self.nodes[holder.0].children);
        for &node in &nodes {
            self.nodes[node.0].parent = None;
        }
        nodes
    }

    // ========== Mutation ==========

    pub fn observe(&mut self) {
        self.observing = true;
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Drain the mutation records accumulated since the last call
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    fn record(&mut self, target: NodeId, added_nodes: Vec<NodeId>) {
        if self.observing && !added_nodes.is_empty() {
            self.records.push(MutationRecord {
                target,
                added_nodes,
            });
        }
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> SwapResult<()> {
        if matches!(self.kind(parent), NodeKind::Text(_) | NodeKind::Comment(_)) {
            return Err(SwapError::InvalidNode(format!(
                "node {} cannot have children",
                parent.0
            )));
        }
        if parent == child || self.contains(child, parent) {
            return Err(SwapError::InvalidNode(format!(
                "inserting node {} under {} would create a cycle",
                child.0, parent.0
            )));
        }
        Ok(())
    }

    /// Detach a node from its parent; the node and its subtree stay usable
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> SwapResult<()> {
        self.check_insertion(parent, child)?;
        self.attach(parent, child);
        self.record(parent, vec![child]);
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> SwapResult<()> {
        self.check_insertion(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(SwapError::InvalidNode(format!(
                "node {} is not a child of {}",
                reference.0, parent.0
            )));
        }
        self.remove(child);
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(position, child);
        self.record(parent, vec![child]);
        Ok(())
    }

    /// Parse `html` and append the resulting nodes to `parent` as one mutation
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> SwapResult<Vec<NodeId>> {
        if !self.is_element(parent) && parent != self.root {
            return Err(SwapError::InvalidNode(format!(
                "node {} cannot hold markup",
                parent.0
            )));
        }
        let nodes = self.parse_fragment(parent, html);
        for &node in &nodes {
            self.attach(parent, node);
        }
        self.record(parent, nodes.clone());
        Ok(nodes)
    }

    /// Replace all children of `id` with the nodes parsed from `html`
    ///
    /// The swap happens in one step: the old children are detached and the
    /// new ones attached before any record is emitted.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> SwapResult<()> {
        if !self.is_element(id) {
            return Err(SwapError::InvalidNode(format!(
                "node {} is not an element",
                id.0
            )));
        }
        let nodes = self.parse_fragment(id, html);
        for old in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[old.0].parent = None;
        }
        for &node in &nodes {
            self.nodes[node.0].parent = Some(id);
        }
        self.nodes[id.0].children = nodes.clone();
        self.record(id, nodes);
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> SwapResult<()> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Text(content) => {
                *content = text.to_string();
                Ok(())
            }
            _ => Err(SwapError::InvalidNode(format!(
                "node {} is not a text node",
                id.0
            ))),
        }
    }
}

/// Iterator over strict ancestors, nearest first
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
