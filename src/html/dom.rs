//! Minimal mutable document tree.
//!
//! Nodes live in an arena owned by the `Document`; children are ordered
//! `NodeId` lists and the parent link is a plain back-reference. Nodes that
//! are replaced stay in the arena, detached.
//!
//! Every parsed node remembers the source text it came from so untouched
//! markup serializes back byte-for-byte. Mutating an element's attributes
//! drops its start-tag source and the tag is regenerated.

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Index of a node in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single attribute. `value` is `None` for bare attributes such as `async`.
///
/// Values are kept exactly as written; character references are not decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// How an element is closed when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Closing {
    /// Void or self-closing; nothing to write.
    None,
    /// The source had no end tag; keep it that way.
    Omitted,
    /// End tag as it appeared in the source.
    Source(String),
    /// Created element; write `</name>`.
    Generated,
}

#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
    start_tag: Option<String>,
    pub(crate) closing: Closing,
}

impl Element {
    /// A new element with no attributes, as if created by a script.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let closing = if is_void_element(&name) {
            Closing::None
        } else {
            Closing::Generated
        };
        Self {
            name,
            attributes: Vec::new(),
            self_closing: false,
            start_tag: None,
            closing,
        }
    }

    pub(crate) fn parsed(
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
        start_tag: String,
    ) -> Self {
        let closing = if self_closing || is_void_element(&name) {
            Closing::None
        } else {
            Closing::Omitted
        };
        Self {
            name,
            attributes,
            self_closing,
            start_tag: Some(start_tag),
            closing,
        }
    }

    /// Tag name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Write the start tag as `<tag ... />`.
    pub fn set_self_closing(&mut self, self_closing: bool) {
        if self.self_closing != self_closing {
            self.self_closing = self_closing;
            self.start_tag = None;
        }
    }

    /// True while the start tag still matches the source.
    pub fn is_pristine(&self) -> bool {
        self.start_tag.is_some()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Case-insensitive attribute lookup. Bare attributes read as `""`.
    /// With duplicates, the first one wins.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Set an attribute, replacing the first existing one in place or
    /// appending a new one.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => {
                if existing.value == value {
                    return;
                }
                existing.value = value;
            }
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
        self.start_tag = None;
    }

    /// Remove every attribute with this name. Returns true if any was removed.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.name.eq_ignore_ascii_case(name));
        let removed = self.attributes.len() != before;
        if removed {
            self.start_tag = None;
        }
        removed
    }

    /// Classes from the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let value = match self.attribute("class").map(str::trim_end) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute("class", value);
    }

    pub(crate) fn start_tag_source(&self) -> Option<&str> {
        self.start_tag.as_deref()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The root; only ever at index 0.
    Document,
    Element(Element),
    Text(String),
    /// A comment including its `<!--` and `-->` delimiters.
    Comment(String),
    Doctype(String),
    /// Markup kept verbatim, such as stray end tags or processing instructions.
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// A parsed document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    /// Parse markup leniently. Never fails.
    pub fn parse(markup: &str) -> Self {
        crate::html::parser::parse(markup)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Add a detached node to the arena.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.create(NodeKind::Element(element))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Put `new` where `old` is in the tree and detach `old`.
    /// Returns false if `old` has no parent.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        self.detach(new);
        let siblings = &mut self.nodes[parent.0].children;
        let Some(pos) = siblings.iter().position(|&c| c == old) else {
            return false;
        };
        siblings[pos] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        true
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Attached elements with one of the given tag names, in document order.
    pub fn select_by_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| {
                self.element(id)
                    .map(|e| tags.iter().any(|t| e.is(t)))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// All nodes below `id` in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn to_html(&self) -> String {
        crate::html::serialize::serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let mut img = Element::new("img");
        img.set_attribute("SRC", "/a.png");
        assert_eq!(img.attribute("src"), Some("/a.png"));
        assert!(img.has_attribute("Src"));
        assert!(img.remove_attribute("src"));
        assert!(!img.has_attribute("src"));
        assert!(!img.remove_attribute("src"));
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut el = Element::new("img");
        el.set_attribute("a", "1");
        el.set_attribute("b", "2");
        el.set_attribute("A", "3");
        let names: Vec<_> = el.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(el.attribute("a"), Some("3"));
    }

    #[test]
    fn test_add_class() {
        let mut el = Element::new("img");
        el.add_class("lazyload");
        assert_eq!(el.attribute("class"), Some("lazyload"));

        el.set_attribute("class", "hero  wide ");
        el.add_class("lazyload");
        assert_eq!(el.attribute("class"), Some("hero  wide lazyload"));
        assert!(el.has_class("wide"));

        el.add_class("lazyload");
        assert_eq!(el.classes().filter(|c| *c == "lazyload").count(), 1);
    }

    #[test]
    fn test_tree_operations() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element(Element::new("div"));
        let img = doc.create_element(Element::new("img"));
        doc.append_child(root, div);
        doc.append_child(div, img);
        assert_eq!(doc.parent(img), Some(div));

        let picture = doc.create_element(Element::new("picture"));
        assert!(doc.replace_child(img, picture));
        assert_eq!(doc.children(div), &[picture]);
        assert_eq!(doc.parent(img), None);
        assert_eq!(doc.parent(picture), Some(div));

        doc.append_child(picture, img);
        assert_eq!(doc.children(picture), &[img]);
        assert_eq!(doc.select_by_tag(&["IMG", "picture"]), vec![picture, img]);
    }

    #[test]
    fn test_replace_detached_node_fails() {
        let mut doc = Document::new();
        let a = doc.create_element(Element::new("a"));
        let b = doc.create_element(Element::new("b"));
        assert!(!doc.replace_child(a, b));
    }
}
