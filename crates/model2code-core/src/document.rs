//! Arena-backed XML document

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{Result, XmlError};

/// Index of a node inside a [`Document`] arena
///
/// Ids are only meaningful for the document that issued them. They stay valid
/// for the whole lifetime of the document, including after the node has been
/// detached from the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Name/value pair attached to an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, including any namespace prefix
    pub name: String,
    /// Unescaped attribute value
    pub value: String,
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with its attributes in document order
    Element {
        /// Tag name
        tag: String,
        /// Attributes in document order
        attributes: Vec<Attribute>,
    },
    /// Character data
    Text(String),
    /// CDATA section
    CData(String),
    /// Comment
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

/// XML document stored as an arena of nodes
///
/// Nodes are never freed: detaching a node only unlinks it from its parent, so
/// every [`NodeId`] handed out earlier keeps pointing at the same data.
///
/// # Panics
///
/// Accessors index the arena directly and panic when given a [`NodeId`] that was
/// issued by a different document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    declaration: Option<Declaration>,
}

impl Document {
    /// Parse a document from XML text
    ///
    /// Whitespace-only text between elements is dropped. Comments and
    /// processing instructions outside the root element are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The text is not well-formed XML
    /// - There is no root element, or more than one
    pub fn parse(source: &str) -> Result<Self> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;
        let mut declaration = None;

        loop {
            let position = u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX);
            let event = reader
                .read_event()
                .map_err(|e| XmlError::parse(position, e.to_string()))?;

            match event {
                Event::Decl(decl) => {
                    declaration = Some(read_declaration(&decl));
                }
                Event::Start(start) => {
                    let id = open_element(&mut nodes, &stack, &mut root, &start, position)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    open_element(&mut nodes, &stack, &mut root, &start, position)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::parse(position, e.to_string()))?;
                    push_leaf(&mut nodes, &stack, NodeKind::Text(value.into_owned()));
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data).into_owned();
                    push_leaf(&mut nodes, &stack, NodeKind::CData(value));
                }
                Event::Comment(comment) => {
                    let value = String::from_utf8_lossy(&comment).into_owned();
                    push_leaf(&mut nodes, &stack, NodeKind::Comment(value));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or(XmlError::NoRoot)?;
        debug!(nodes = nodes.len(), "parsed XML document");

        Ok(Self {
            nodes,
            root,
            declaration,
        })
    }

    /// Read and parse a document from a file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not well-formed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| XmlError::file(path, e))?;
        Self::parse(&source)
    }

    /// Serialize the document with four-space indentation
    ///
    /// # Errors
    ///
    /// Returns error if the writer rejects an event.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        if let Some(decl) = &self.declaration {
            emit(
                &mut writer,
                Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )),
            )?;
        }
        self.write_node(&mut writer, self.root)?;

        let mut text =
            String::from_utf8(writer.into_inner()).map_err(|e| XmlError::write(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }

    /// Serialize the document into a file, replacing any previous content
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_xml_string()?;
        fs::write(path, text).map_err(|e| XmlError::file(path, e))
    }

    /// Root element
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, detached ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true for a parsed document)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Payload of a node
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Tag name, or `None` for non-element nodes
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Whether the node is an element with the given tag
    #[must_use]
    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Attributes of an element in document order (empty for other nodes)
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Value of an attribute
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Parent of a node, `None` for the root and detached nodes
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children of a node in document order
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Direct element children carrying the given tag
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.has_tag(*child, tag))
    }

    /// First text or CDATA child
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.children(id)
            .iter()
            .find_map(|child| match &self.node(*child).kind {
                NodeKind::Text(text) | NodeKind::CData(text) => Some(text.as_str()),
                _ => None,
            })
    }

    /// Whether the node is reachable from the root
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Create a detached element
    pub fn create_element<K, V>(
        &mut self,
        tag: impl Into<String>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| Attribute {
                name: name.into(),
                value: value.into(),
            })
            .collect();
        self.push(Node {
            kind: NodeKind::Element {
                tag: tag.into(),
                attributes,
            },
            parent: None,
            children: Vec::new(),
        })
    }

    /// Append a detached node as the last child of `parent`
    ///
    /// # Errors
    ///
    /// Returns error if `parent` is not an element or `child` is attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.ensure_element(parent)?;
        self.ensure_detached(child)?;
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Insert a detached node as the next sibling of `reference`
    ///
    /// # Errors
    ///
    /// Returns error if `reference` has no parent or `new` is attached.
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<()> {
        self.ensure_detached(new)?;
        let parent = self.parent(reference).ok_or(XmlError::Detached(reference))?;
        let position = self
            .position_in_parent(parent, reference)
            .ok_or(XmlError::Detached(reference))?;
        self.node_mut(parent).children.insert(position + 1, new);
        self.node_mut(new).parent = Some(parent);
        Ok(())
    }

    /// Unlink a node (and its subtree) from its parent
    ///
    /// # Errors
    ///
    /// Returns error if the node is the root or already detached.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.parent(id).ok_or(XmlError::Detached(id))?;
        self.node_mut(parent).children.retain(|child| *child != id);
        self.node_mut(id).parent = None;
        Ok(())
    }

    /// Change an element's tag, keeping attributes and children
    ///
    /// # Errors
    ///
    /// Returns error if the node is not an element.
    pub fn set_tag(&mut self, id: NodeId, new_tag: impl Into<String>) -> Result<()> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { tag, .. } => {
                *tag = new_tag.into();
                Ok(())
            }
            _ => Err(XmlError::NotAnElement(id)),
        }
    }

    /// Set an attribute, replacing the value in place when it already exists
    ///
    /// # Errors
    ///
    /// Returns error if the node is not an element.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let attributes = self.attributes_mut(id)?;
        let value = value.into();
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
        Ok(())
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attributes = self.attributes_mut(id).ok()?;
        let index = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(index).value)
    }

    /// Rename an attribute in place, keeping its position and value
    ///
    /// Returns `false` when the element has no attribute named `old`.
    pub fn rename_attribute(&mut self, id: NodeId, old: &str, new: &str) -> bool {
        let Ok(attributes) = self.attributes_mut(id) else {
            return false;
        };
        if !attributes.iter().any(|a| a.name == old) {
            return false;
        }
        attributes.retain(|a| a.name != new || a.name == old);
        if let Some(attribute) = attributes.iter_mut().find(|a| a.name == old) {
            attribute.name = new.to_string();
        }
        true
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut Vec<Attribute>> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(XmlError::NotAnElement(id)),
        }
    }

    fn ensure_element(&self, id: NodeId) -> Result<()> {
        if self.tag(id).is_some() {
            Ok(())
        } else {
            Err(XmlError::NotAnElement(id))
        }
    }

    fn ensure_detached(&self, id: NodeId) -> Result<()> {
        if self.node(id).parent.is_some() || id == self.root {
            Err(XmlError::AlreadyAttached(id))
        } else {
            Ok(())
        }
    }

    fn position_in_parent(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Element { tag, attributes } => {
                let mut start = BytesStart::new(tag.as_str());
                for attribute in attributes {
                    start.push_attribute((attribute.name.as_str(), attribute.value.as_str()));
                }
                if node.children.is_empty() {
                    return emit(writer, Event::Empty(start));
                }
                emit(writer, Event::Start(start))?;
                for child in &node.children {
                    self.write_node(writer, *child)?;
                }
                emit(writer, Event::End(BytesEnd::new(tag.as_str())))
            }
            NodeKind::Text(text) => emit(writer, Event::Text(BytesText::new(text))),
            NodeKind::CData(text) => emit(writer, Event::CData(BytesCData::new(text.as_str()))),
            NodeKind::Comment(text) => {
                emit(writer, Event::Comment(BytesText::from_escaped(text.as_str())))
            }
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::write(e.to_string()))
}

fn read_declaration(decl: &BytesDecl<'_>) -> Declaration {
    let version = decl
        .version()
        .map_or_else(|_| "1.0".to_string(), |v| String::from_utf8_lossy(&v).into_owned());
    let encoding = decl
        .encoding()
        .and_then(std::result::Result::ok)
        .map(|e| String::from_utf8_lossy(&e).into_owned());
    let standalone = decl
        .standalone()
        .and_then(std::result::Result::ok)
        .map(|s| String::from_utf8_lossy(&s).into_owned());
    Declaration {
        version,
        encoding,
        standalone,
    }
}

fn open_element(
    nodes: &mut Vec<Node>,
    stack: &[NodeId],
    root: &mut Option<NodeId>,
    start: &BytesStart<'_>,
    position: u64,
) -> Result<NodeId> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::parse(position, e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::parse(position, e.to_string()))?;
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    let parent = stack.last().copied();
    if parent.is_none() && root.is_some() {
        return Err(XmlError::MultipleRoots(tag));
    }

    nodes.push(Node {
        kind: NodeKind::Element { tag, attributes },
        parent,
        children: Vec::new(),
    });
    let id = NodeId(nodes.len() - 1);
    match parent {
        Some(parent) => nodes[parent.0].children.push(id),
        None => *root = Some(id),
    }
    Ok(id)
}

fn push_leaf(nodes: &mut Vec<Node>, stack: &[NodeId], kind: NodeKind) {
    // Content outside the root element is not kept
    let Some(parent) = stack.last().copied() else {
        return;
    };
    nodes.push(Node {
        kind,
        parent: Some(parent),
        children: Vec::new(),
    });
    let id = NodeId(nodes.len() - 1);
    nodes[parent.0].children.push(id);
}
