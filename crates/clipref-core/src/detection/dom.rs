//! Minimal DOM abstraction for copy source detection.
//!
//! Hosts bridge their real element handles through [`DomElement`]. The
//! arena-backed [`Document`] is a complete implementation for hosts that
//! mirror a snapshot of the page, and for tests.

/// Read-only view of an element in a document tree.
pub trait DomElement: Clone {
    /// Lowercase tag name.
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn has_class(&self, class: &str) -> bool;

    /// Concatenated text of the element and its descendants.
    fn text_content(&self) -> String;

    fn parent_element(&self) -> Option<Self>;

    fn children(&self) -> Vec<Self>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Nearest element, starting with `self`, that satisfies `pred`.
    fn closest<F>(&self, pred: F) -> Option<Self>
    where
        F: Fn(&Self) -> bool,
    {
        let mut current = Some(self.clone());
        while let Some(el) = current {
            if pred(&el) {
                return Some(el);
            }
            current = el.parent_element();
        }
        None
    }

    /// First descendant in document order, excluding `self`, that satisfies `pred`.
    fn find_descendant<F>(&self, pred: F) -> Option<Self>
    where
        F: Fn(&Self) -> bool,
    {
        let mut stack: Vec<Self> = self.children().into_iter().rev().collect();
        while let Some(el) = stack.pop() {
            if pred(&el) {
                return Some(el);
            }
            stack.extend(el.children().into_iter().rev());
        }
        None
    }
}

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl NodeData {
    fn new(tag: &str, parent: Option<usize>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            classes: Vec::new(),
            text: String::new(),
            parent,
            children: Vec::new(),
        }
    }
}

/// Arena-backed element tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document with a single `body` root element.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("body", None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a new child element and returns its id.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData::new(tag, Some(parent.0)));
        self.nodes[parent.0].children.push(id);
        NodeId(id)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> &mut Self {
        let attrs = &mut self.nodes[node.0].attributes;
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> &mut Self {
        let classes = &mut self.nodes[node.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        self
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> &mut Self {
        self.nodes[node.0].text = text.to_string();
        self
    }

    pub fn element(&self, node: NodeId) -> ElementRef<'_> {
        ElementRef {
            doc: self,
            index: node.0,
        }
    }
}

/// Borrowed element of a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    index: usize,
}

impl<'a> ElementRef<'a> {
    pub fn id(&self) -> NodeId {
        NodeId(self.index)
    }

    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.index]
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.index == other.index
    }
}

impl DomElement for ElementRef<'_> {
    fn tag_name(&self) -> String {
        self.data().tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            let classes = &self.data().classes;
            return (!classes.is_empty()).then(|| classes.join(" "));
        }
        self.data()
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn has_class(&self, class: &str) -> bool {
        self.data().classes.iter().any(|c| c == class)
    }

    fn text_content(&self) -> String {
        let mut out = self.data().text.clone();
        for child in self.children() {
            out.push_str(&child.text_content());
        }
        out
    }

    fn parent_element(&self) -> Option<Self> {
        self.data().parent.map(|index| ElementRef {
            doc: self.doc,
            index,
        })
    }

    fn children(&self) -> Vec<Self> {
        self.data()
            .children
            .iter()
            .map(|&index| ElementRef {
                doc: self.doc,
                index,
            })
            .collect()
    }
}
