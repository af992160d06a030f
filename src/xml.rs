//! A small lossless XML tree for markup surgery on OOXML parts.
//!
//! Parts are parsed with `quick-xml` into [`Element`] / [`Node`] values,
//! edited in place, and written back. Text is stored unescaped and escaped
//! again on output, so substituted content can never break the markup.

use crate::error::{MergeError, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::errors::IllFormedError;
use quick_xml::escape::partial_escape;
use quick_xml::{Reader, Writer};

/// One node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Unescaped character data.
    Text(String),
    CData(String),
    /// Raw comment content.
    Comment(String),
    /// Raw processing instruction content.
    ProcessingInstruction(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// An element with its qualified name (e.g. `w:p`), attributes in source
/// order, and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder: append a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: append a text node.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(name))
    }

    /// Concatenated direct text children.
    pub fn own_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Serialize this element alone (no declaration).
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(|_| MergeError::Utf8("fragment".into()))
    }
}

/// A parsed XML part: optional declaration followed by the top-level nodes
/// (the root element plus any surrounding whitespace, comments, PIs).
#[derive(Debug, Clone)]
pub struct XmlDocument {
    declaration: Option<BytesDecl<'static>>,
    nodes: Vec<Node>,
}

impl XmlDocument {
    /// Parse a part. `part` names it in error messages.
    pub fn parse(xml: &str, part: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut declaration = None;
        let mut top: Vec<Node> = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| MergeError::xml(part, e))?;
            let node = match event {
                Event::Decl(d) => {
                    declaration = Some(d.into_owned());
                    continue;
                }
                Event::Start(e) => {
                    stack.push(start_to_element(&e, part)?);
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => Node::Element(element),
                    None => continue,
                },
                Event::Empty(e) => Node::Element(start_to_element(&e, part)?),
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| MergeError::xml(part, e))?;
                    Node::Text(text.into_owned())
                }
                Event::CData(c) => Node::CData(String::from_utf8_lossy(&c).into_owned()),
                Event::Comment(c) => Node::Comment(String::from_utf8_lossy(&c).into_owned()),
                Event::PI(p) => {
                    Node::ProcessingInstruction(String::from_utf8_lossy(&p).into_owned())
                }
                Event::DocType(d) => Node::DocType(String::from_utf8_lossy(&d).into_owned()),
                Event::Eof => break,
            };
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => top.push(node),
            }
        }

        if let Some(open) = stack.pop() {
            return Err(MergeError::xml(
                part,
                quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(open.name)),
            ));
        }

        Ok(Self {
            declaration,
            nodes: top,
        })
    }

    /// The first top-level element.
    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(Node::as_element)
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(Node::as_element_mut)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        if let Some(ref decl) = self.declaration {
            writer.write_event(Event::Decl(decl.clone()))?;
        }
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|_| MergeError::Utf8("document".into()))
    }
}

fn start_to_element(start: &BytesStart<'_>, part: &str) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|e| MergeError::xml(part, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MergeError::xml(part, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Element(e) => write_element(writer, e)?,
        Node::Text(t) => writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(t))))?,
        Node::CData(c) => writer.write_event(Event::CData(BytesCData::new(c.as_str())))?,
        Node::Comment(c) => writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?,
        Node::ProcessingInstruction(p) => writer.write_event(Event::PI(BytesPI::new(p.as_str())))?,
        Node::DocType(d) => writer.write_event(Event::DocType(BytesText::from_escaped(d.as_str())))?,
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Replace every element matching `matches` with the nodes produced by
/// `replacement`. Matched subtrees are not searched further; unmatched
/// elements are searched recursively. Returns the number of replacements.
pub fn replace_elements<M, R>(nodes: &mut Vec<Node>, matches: &M, replacement: &R) -> usize
where
    M: Fn(&Element) -> bool,
    R: Fn(&Element) -> Vec<Node>,
{
    let mut count = 0;
    let mut i = 0;
    while i < nodes.len() {
        let Node::Element(element) = &mut nodes[i] else {
            i += 1;
            continue;
        };
        if matches(element) {
            let new_nodes = replacement(element);
            let added = new_nodes.len();
            nodes.splice(i..=i, new_nodes);
            count += 1;
            i += added;
        } else {
            count += replace_elements(&mut element.children, matches, replacement);
            i += 1;
        }
    }
    count
}

/// What [`walk`] does after visiting an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Continue into the element's children.
    Descend,
    /// Continue with the next sibling, skipping the children.
    Skip,
    /// End the walk.
    Stop,
}

/// Visit elements in document order until `visit` returns [`Visit::Stop`].
/// Returns `false` if the walk was stopped.
pub fn walk<'a, F>(nodes: &'a [Node], visit: &mut F) -> bool
where
    F: FnMut(&'a Element) -> Visit,
{
    for element in nodes.iter().filter_map(Node::as_element) {
        match visit(element) {
            Visit::Stop => return false,
            Visit::Skip => {}
            Visit::Descend => {
                if !walk(&element.children, visit) {
                    return false;
                }
            }
        }
    }
    true
}
