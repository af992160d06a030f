//! `[Content_Types].xml` override handling.

use crate::error::Result;
use crate::xml::{Element, Node, XmlDocument};

/// What [`ensure_override`] did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideChange {
    /// An identical override was already present.
    Unchanged,
    Inserted,
    /// An override for the part existed with another content type.
    Updated,
}

/// Ensure exactly one `<Override>` for `part_name` declaring `content_type`.
///
/// Returns the new table text and what changed. Inserting an override that
/// is already present leaves the text untouched.
pub fn ensure_override(
    content_types_xml: &str,
    part: &str,
    part_name: &str,
    content_type: &str,
) -> Result<(String, OverrideChange)> {
    let mut doc = XmlDocument::parse(content_types_xml, part)?;
    let Some(root) = doc.root_mut() else {
        return Ok((content_types_xml.to_string(), OverrideChange::Unchanged));
    };

    let mut change = OverrideChange::Inserted;
    let mut seen = false;
    root.children.retain_mut(|node| {
        let Some(e) = node.as_element_mut() else {
            return true;
        };
        if !e.is("Override") || e.get_attr("PartName") != Some(part_name) {
            return true;
        }
        if seen {
            // duplicate override for the same part
            change = OverrideChange::Updated;
            return false;
        }
        seen = true;
        if e.get_attr("ContentType") == Some(content_type) {
            change = OverrideChange::Unchanged;
        } else {
            e.set_attr("ContentType", content_type);
            change = OverrideChange::Updated;
        }
        true
    });

    match change {
        OverrideChange::Unchanged => return Ok((content_types_xml.to_string(), change)),
        OverrideChange::Inserted => root.children.push(Node::Element(
            Element::new("Override")
                .attr("PartName", part_name)
                .attr("ContentType", content_type),
        )),
        OverrideChange::Updated => {}
    }
    Ok((doc.to_xml()?, change))
}
