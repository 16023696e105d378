//! Index editor: locating, removing, and inserting registration records.
//!
//! A registration record is a leaf element whose text is a qualified name
//! (`<cfg:Catalog>Catalog.Items</cfg:Catalog>`,
//! `<xr:Metadata>Catalog.Items</xr:Metadata>`). Records of one type are
//! contiguous, and the canonical insertion point for a new record is
//! immediately after the last existing record of the same type. The rest of
//! the toolchain consuming the repository depends on that grouping, so it is
//! a hard invariant here.

use crate::model::NamespaceMap;
use confclone_xmltree::{Document, Element, Node, XmlError};
use serde::{Deserialize, Serialize};

/// How records of one entity type are recognized inside an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecordGroup {
    /// The record element's name carries the type (`cfg:Catalog`).
    ElementName(String),
    /// All records share one element name; the type is the qualified-name
    /// prefix of the text (`Catalog.`).
    TextPrefix(String),
}

impl RecordGroup {
    fn matches(&self, el: &Element) -> bool {
        match self {
            RecordGroup::ElementName(name) => el.name == *name,
            RecordGroup::TextPrefix(prefix) => {
                is_leaf(el) && el.text().starts_with(prefix.as_str())
            }
        }
    }
}

/// Editing rules for one index artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Qualified name of the element holding the record collection.
    pub collection: String,
    /// Element name used when creating a new record.
    pub record_element: String,
    pub group: RecordGroup,
}

impl IndexSpec {
    /// The structural index registers entities as `<cfg:Type>Type.Name</cfg:Type>`
    /// under `<cfg:ChildObjects>`.
    pub fn structural(ns: &NamespaceMap, entity_type: &str) -> Self {
        let record_element = ns.config_name(entity_type);
        IndexSpec {
            collection: ns.config_name("ChildObjects"),
            group: RecordGroup::ElementName(record_element.clone()),
            record_element,
        }
    }

    /// The dump-metadata index registers every entity as
    /// `<xr:Metadata>Type.Name</xr:Metadata>`; type grouping lives in the
    /// qualified-name prefix.
    pub fn dump_metadata(ns: &NamespaceMap, entity_type: &str) -> Self {
        IndexSpec {
            collection: ns.ext_name("ChildObjects"),
            record_element: ns.ext_name("Metadata"),
            group: RecordGroup::TextPrefix(format!("{entity_type}.")),
        }
    }

    pub fn new_record(&self, qualified_name: &str) -> Element {
        Element::with_text(self.record_element.clone(), qualified_name)
    }
}

fn is_leaf(el: &Element) -> bool {
    el.child_elements().next().is_none()
}

/// Locates a registration record by exact text match.
pub fn find_record<'a>(doc: &'a Document, qualified_name: &str) -> Option<&'a Element> {
    doc.root
        .find(&|el| is_leaf(el) && el.text() == qualified_name)
}

/// Detaches the record whose text equals `qualified_name`, together with its
/// own leading indentation. Returns whether anything was removed.
pub fn remove_record(doc: &mut Document, qualified_name: &str) -> bool {
    let mut path = Vec::new();
    if !record_path(&doc.root, qualified_name, &mut path) {
        return false;
    }
    let Some((&idx, parent_path)) = path.split_last() else {
        return false;
    };
    let Some(parent) = navigate_mut(&mut doc.root, parent_path) else {
        return false;
    };
    parent.children.remove(idx);
    if idx > 0 && parent.children.get(idx - 1).is_some_and(Node::is_blank_text) {
        parent.children.remove(idx - 1);
    }
    true
}

/// Inserts `record` immediately after the last record of its group, or — when
/// the index holds no record of that group yet — appends it as the final
/// child of the record collection.
pub fn insert_after_last_of_type(
    doc: &mut Document,
    spec: &IndexSpec,
    record: Element,
) -> Result<(), XmlError> {
    let mut path = Vec::new();
    if group_anchor_path(&doc.root, &spec.group, &mut path) {
        let Some((&anchor, parent_path)) = path.split_last() else {
            return Err(XmlError::ElementNotFound(spec.collection.clone()));
        };
        let parent = navigate_mut(&mut doc.root, parent_path)
            .ok_or_else(|| XmlError::ElementNotFound(spec.collection.clone()))?;
        insert_after(parent, anchor, record);
        return Ok(());
    }

    let mut path = Vec::new();
    if !element_path(&doc.root, &spec.collection, &mut path) {
        return Err(XmlError::ElementNotFound(spec.collection.clone()));
    }
    let collection = navigate_mut(&mut doc.root, &path)
        .ok_or_else(|| XmlError::ElementNotFound(spec.collection.clone()))?;
    append_child(collection, record);
    Ok(())
}

// ============================================================================
// Tree navigation by child-index path
// ============================================================================

// Mutable recursive searches fight the borrow checker, so searches run on
// the immutable tree and produce a child-index path that is then walked
// mutably.

fn navigate_mut<'a>(mut el: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    for &i in path {
        match el.children.get_mut(i) {
            Some(Node::Element(next)) => el = next,
            _ => return None,
        }
    }
    Some(el)
}

/// Depth-first path to the first leaf record with matching text.
fn record_path(el: &Element, qualified_name: &str, path: &mut Vec<usize>) -> bool {
    for (i, node) in el.children.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(i);
            if is_leaf(child) && child.text() == qualified_name {
                return true;
            }
            if record_path(child, qualified_name, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Path to the last group-matching child of the first parent (in document
/// order) that has any.
fn group_anchor_path(el: &Element, group: &RecordGroup, path: &mut Vec<usize>) -> bool {
    let mut last = None;
    for (i, node) in el.children.iter().enumerate() {
        if let Node::Element(child) = node {
            if group.matches(child) {
                last = Some(i);
            }
        }
    }
    if let Some(i) = last {
        path.push(i);
        return true;
    }
    for (i, node) in el.children.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(i);
            if group_anchor_path(child, group, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn element_path(el: &Element, name: &str, path: &mut Vec<usize>) -> bool {
    for (i, node) in el.children.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(i);
            if child.name == name {
                return true;
            }
            if element_path(child, name, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

// ============================================================================
// Insertion with indentation handling
// ============================================================================

/// Inserts after `anchor`, cloning the anchor's leading indentation so the
/// new record lands on its own identically indented line.
fn insert_after(parent: &mut Element, anchor: usize, record: Element) {
    let indent = anchor
        .checked_sub(1)
        .and_then(|i| parent.children.get(i))
        .filter(|n| n.is_blank_text())
        .cloned();
    let mut at = anchor + 1;
    if let Some(indent) = indent {
        parent.children.insert(at, indent);
        at += 1;
    }
    parent.children.insert(at, Node::Element(record));
}

fn append_child(collection: &mut Element, record: Element) {
    match collection
        .children
        .iter()
        .rposition(|n| matches!(n, Node::Element(_)))
    {
        Some(last) => insert_after(collection, last, record),
        None => {
            // Empty (or whitespace-only) collection: keep the closing tag's
            // indentation last.
            if collection.children.last().is_some_and(Node::is_blank_text) {
                let at = collection.children.len() - 1;
                collection.children.insert(at, Node::Element(record));
            } else {
                collection.children.push(Node::Element(record));
            }
        }
    }
}
