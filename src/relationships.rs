//! Relationship table (`word/_rels/document.xml.rels`) handling.

use crate::error::{MergeError, Result};
use crate::xml::{walk, Element, Node, Visit, XmlDocument};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

pub const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const PACKAGE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

lazy_static! {
    static ref REL_ID_RE: Regex = Regex::new(r#"\bId\s*=\s*["']rId(\d+)["']"#).expect("invalid regex");
}

/// A relationship identifier of the form `rId<N>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipId(u64);

impl RelationshipId {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// The numeric suffix; also used as the drawing's display id.
    pub fn number(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rId{}", self.0)
    }
}

/// Compute the next unused relationship id from the table's text.
///
/// Returns `rId(max + 1)`; a table without `rId<N>` ids counts as max 0.
/// A table that does not parse is scanned for `Id` attributes instead.
pub fn next_relationship_id(rels_xml: &str) -> Result<RelationshipId> {
    let max_id = match XmlDocument::parse(rels_xml, "relationships") {
        Ok(doc) => {
            let mut max_id = 0;
            walk(doc.nodes(), &mut |e| {
                if e.is("Relationship") {
                    if let Some(n) = e.get_attr("Id").and_then(relationship_number) {
                        max_id = max_id.max(n);
                    }
                    return Visit::Skip;
                }
                Visit::Descend
            });
            max_id
        }
        Err(e) => {
            log::debug!("Scanning unparsable relationship table for ids: {}", e);
            REL_ID_RE
                .captures_iter(rels_xml)
                .filter_map(|caps| caps[1].parse::<u64>().ok())
                .max()
                .unwrap_or(0)
        }
    };
    max_id
        .checked_add(1)
        .map(RelationshipId)
        .ok_or_else(|| MergeError::RelationshipIdsExhausted(format!("rId{}", max_id)))
}

/// `rId12` → 12. Ids of any other shape, or too large to count, are ignored.
fn relationship_number(id: &str) -> Option<u64> {
    let digits = id.strip_prefix("rId")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_: String,
    pub target: String,
}

/// List the entries of a relationship table.
pub fn parse_relationships(rels_xml: &str, part: &str) -> Result<Vec<Relationship>> {
    let doc = XmlDocument::parse(rels_xml, part)?;
    let Some(root) = doc.root() else {
        return Ok(Vec::new());
    };
    Ok(root
        .elements()
        .filter(|e| e.is("Relationship"))
        .filter_map(|e| {
            Some(Relationship {
                id: e.get_attr("Id")?.to_string(),
                type_: e.get_attr("Type").unwrap_or_default().to_string(),
                target: e.get_attr("Target").unwrap_or_default().to_string(),
            })
        })
        .collect())
}

/// An empty relationship table, used when the template has none.
pub fn empty_relationships() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}"></Relationships>"#,
        PACKAGE_RELATIONSHIPS_NS
    )
}

/// Append a relationship entry and return the new table text.
pub fn append_relationship(
    rels_xml: &str,
    part: &str,
    id: RelationshipId,
    type_: &str,
    target: &str,
) -> Result<String> {
    let mut doc = XmlDocument::parse(rels_xml, part)?;
    let entry = Element::new("Relationship")
        .attr("Id", id.to_string())
        .attr("Type", type_)
        .attr("Target", target);
    match doc.root_mut() {
        Some(root) => root.children.push(Node::Element(entry)),
        None => {
            let root = Element::new("Relationships")
                .attr("xmlns", PACKAGE_RELATIONSHIPS_NS)
                .child(entry);
            doc.nodes_mut().push(Node::Element(root));
        }
    }
    doc.to_xml()
}
