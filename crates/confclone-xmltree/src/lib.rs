//! Owned XML element tree for configuration-repository editing.
//!
//! This crate is the parsed representation behind the artifact store and the
//! index editor:
//!
//! - parses UTF-8 XML into an owned `Document`/`Element` tree,
//! - preserves whitespace text nodes verbatim, so editing one record in an
//!   index file does not reformat the lines around it,
//! - serializes back with the canonical `<?xml version="1.0"
//!   encoding="UTF-8"?>` declaration.
//!
//! It is deliberately not a general XML toolkit: no DTDs, no entity
//! definitions, no streaming. Documents here are configuration artifacts a
//! few hundred kilobytes at most, loaded whole, edited, written back.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml parse error: {0}")]
    Parse(#[from] quick_xml::Error),
    #[error("document has no root element")]
    NoRoot,
    #[error("unexpected content after the root element")]
    TrailingContent,
    #[error("mismatched closing tag")]
    Unbalanced,
    #[error("expected element <{0}> not found")]
    ElementNotFound(String),
}

// ============================================================================
// Tree model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for a text node that is nothing but whitespace (indentation).
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

/// An element with its attributes and children, names kept exactly as
/// written (namespace prefixes included, e.g. `cfg:Catalog`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Leaf element holding a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = Element::new(name);
        el.children.push(Node::Text(text.into()));
        el
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing an existing one in place so attribute
    /// order survives the edit.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(Node::Text(text.into()));
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First element matching `pred` in document order, `self` included.
    pub fn find(&self, pred: &impl Fn(&Element) -> bool) -> Option<&Element> {
        if pred(self) {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find(pred))
    }

    /// Visits every element in document order, `self` included.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.for_each_mut(f);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

// ============================================================================
// Parsing
// ============================================================================

impl Document {
    pub fn parse(text: &str) -> Result<Document, XmlError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from(&start)?);
                }
                Event::Empty(start) => {
                    let el = element_from(&start)?;
                    attach(&mut stack, &mut root, Node::Element(el))?;
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or(XmlError::Unbalanced)?;
                    attach(&mut stack, &mut root, Node::Element(el))?;
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text)),
                        // Whitespace between the declaration and the root,
                        // or after the root, carries no information.
                        None if text.trim().is_empty() => {}
                        None => return Err(XmlError::TrailingContent),
                    }
                }
                Event::CData(t) => {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text)),
                        None => return Err(XmlError::TrailingContent),
                    }
                }
                Event::Comment(t) => {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Comment(text));
                    }
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }
        root.map(|root| Document { root }).ok_or(XmlError::NoRoot)
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut el = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        el.attrs.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        ));
    }
    Ok(el)
}

fn attach(
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    node: Node,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => match node {
            Node::Element(el) if root.is_none() => {
                *root = Some(el);
                Ok(())
            }
            Node::Element(_) => Err(XmlError::TrailingContent),
            _ => Ok(()),
        },
    }
}

// ============================================================================
// Serialization
// ============================================================================

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

impl Document {
    /// Serializes with the canonical declaration and a trailing newline.
    /// Childless elements are written self-closed.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        write_element(&mut out, &self.root);
        out.push('\n');
        out
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attrs {
        let _ = write!(out, r#" {}="{}""#, key, escape(value));
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(child) => write_element(out, child),
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
        }
    }
    let _ = write!(out, "</{}>", el.name);
}

// ============================================================================
// Tests
// ============================================================================
