//! An owned, mutable node tree for the article body.
//!
//! `scraper` documents are read-only, so the content region is copied into
//! a [`DomTree`] where image sources can be rewritten and wrapper links
//! unwrapped before the tree is serialized back to HTML for conversion.

use scraper::{ElementRef, Node};
use std::fmt::Write;

/// Index of a node inside its [`DomTree`].
pub type NodeId = usize;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose text is written out verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag_name: String, attrs: Vec<(String, String)> },
    Text(String),
    Comment(String),
}

/// A node in the tree
#[derive(Debug, Clone)]
pub struct DomNode {
    pub kind: NodeKind,
    /// Parent node ID (if any)
    pub parent_id: Option<NodeId>,
    /// Child node IDs, in document order
    pub child_ids: Vec<NodeId>,
}

/// Arena-backed element tree rooted at a single element.
///
/// Removed or unwrapped nodes stay in the arena but are no longer reachable
/// from the root, so every traversal starts at [`DomTree::root`].
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<DomNode>,
    root: NodeId,
}

impl DomTree {
    /// Copies `element` and everything below it into a new tree.
    pub fn from_element(element: ElementRef<'_>) -> Self {
        let mut tree = Self { nodes: Vec::new(), root: 0 };
        tree.root = tree.append_element(element, None);
        tree
    }

    fn push(&mut self, kind: NodeKind, parent_id: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DomNode { kind, parent_id, child_ids: Vec::new() });
        id
    }

    fn append_element(&mut self, element: ElementRef<'_>, parent_id: Option<NodeId>) -> NodeId {
        let el = element.value();
        let kind = NodeKind::Element {
            tag_name: el.name().to_lowercase(),
            attrs: el.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        };
        let id = self.push(kind, parent_id);

        for child in element.children() {
            let child_id = match child.value() {
                Node::Element(_) => ElementRef::wrap(child).map(|el| self.append_element(el, Some(id))),
                Node::Text(text) => Some(self.push(NodeKind::Text(text.to_string()), Some(id))),
                Node::Comment(comment) => Some(self.push(NodeKind::Comment(comment.to_string()), Some(id))),
                _ => None,
            };
            if let Some(child_id) = child_id {
                self.nodes[id].child_ids.push(child_id);
            }
        }

        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    /// Lowercase tag name, or `None` for text and comment nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Sets an attribute, replacing an existing value. No-op on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(DomNode { kind: NodeKind::Element { attrs, .. }, .. }) = self.nodes.get_mut(id) {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Get the parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent_id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.child_ids.as_slice()).unwrap_or(&[])
    }

    /// All nodes reachable from the root, in document order.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Reachable elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| self.tag_name(id) == Some(tag))
            .collect()
    }

    /// Elements with the given tag strictly below `id`, in document order.
    pub fn elements_by_tag_within(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.tag_name(node) == Some(tag) {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Concatenated text of a node and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element { .. }) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// Replaces a node with its children. The root cannot be unwrapped.
    pub fn unwrap_node(&mut self, id: NodeId) -> bool {
        let Some(parent_id) = self.parent(id) else {
            return false;
        };
        let Some(position) = self.nodes[parent_id].child_ids.iter().position(|&c| c == id) else {
            return false;
        };

        let children = std::mem::take(&mut self.nodes[id].child_ids);
        for &child in &children {
            self.nodes[child].parent_id = Some(parent_id);
        }
        self.nodes[parent_id].child_ids.splice(position..=position, children);
        self.nodes[id].parent_id = None;
        true
    }

    /// Detaches a node (and its subtree) from the tree.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(parent_id) = self.parent(id) else {
            return false;
        };
        self.nodes[parent_id].child_ids.retain(|&c| c != id);
        self.nodes[id].parent_id = None;
        true
    }

    /// Serializes the tree back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };

        match &node.kind {
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Comment(comment) => {
                let _ = write!(out, "<!--{}-->", comment);
            }
            NodeKind::Element { tag_name, attrs } => {
                out.push('<');
                out.push_str(tag_name);
                for (name, value) in attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&tag_name.as_str()) {
                    return;
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&tag_name.as_str());
                for &child in &node.child_ids {
                    self.write_node(child, raw, out);
                }
                let _ = write!(out, "</{}>", tag_name);
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
