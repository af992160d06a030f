//! Placeholder lookup and replacement inside the document body.
//!
//! Each content kind has its own matching rule:
//! - text: every `w:t` containing the token, token substring only;
//! - image: every `w:t` whose whole text is the token;
//! - table: every smallest `w:p` whose text contains the token.
//!
//! A token with no occurrences leaves the body untouched.

use crate::fragments::{text_element, text_paragraph};
use crate::xml::{replace_elements, walk, Element, Node, Visit, XmlDocument};

const WORDPROCESSING_DRAWING_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Paragraph properties used for paragraphs created by a text replacement.
#[derive(Debug, Clone, PartialEq)]
pub enum Formatting {
    /// The last `w:pPr` preceding the first occurrence of the token.
    Captured(Element),
    /// No `w:pPr` preceded it; an empty `<w:pPr/>` is used.
    Default,
}

impl Formatting {
    pub fn properties(&self) -> Element {
        match self {
            Formatting::Captured(ppr) => ppr.clone(),
            Formatting::Default => Element::new("w:pPr"),
        }
    }
}

/// Outcome of [`replace_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextReplacement {
    /// Number of `w:t` elements whose text was changed.
    pub replaced: usize,
    pub formatting: Formatting,
}

/// Find the paragraph formatting in effect at the token's first occurrence.
pub fn capture_formatting(body: &XmlDocument, token: &str) -> Formatting {
    let mut last_ppr: Option<&Element> = None;
    let mut found = false;
    walk(body.nodes(), &mut |e| {
        if e.is("w:pPr") {
            // nested w:pPrChange/w:pPr holds the pre-revision formatting
            last_ppr = Some(e);
            Visit::Skip
        } else if e.is("w:t") && e.own_text().contains(token) {
            found = true;
            Visit::Stop
        } else {
            Visit::Descend
        }
    });
    match last_ppr {
        Some(ppr) if found => {
            let mut ppr = ppr.clone();
            // a copied section break would split the document into sections
            ppr.children
                .retain(|n| !n.as_element().is_some_and(|e| e.is("w:sectPr")));
            Formatting::Captured(ppr)
        }
        _ => Formatting::Default,
    }
}

/// Replace every occurrence of `token` inside text runs with `content`.
///
/// Line breaks in `content` split the enclosing paragraph: each extra line
/// becomes a new paragraph carrying the captured formatting, and the last
/// one also receives whatever followed the token.
pub fn replace_text(body: &mut XmlDocument, token: &str, content: &str) -> TextReplacement {
    let formatting = capture_formatting(body, token);
    let ppr = formatting.properties();
    let mut replaced = 0;
    replace_text_in(body.nodes_mut(), token, content, &ppr, false, &mut replaced);
    TextReplacement {
        replaced,
        formatting,
    }
}

fn replace_text_in(
    nodes: &mut Vec<Node>,
    token: &str,
    content: &str,
    ppr: &Element,
    in_paragraph: bool,
    replaced: &mut usize,
) {
    let mut i = 0;
    while i < nodes.len() {
        let Node::Element(element) = &mut nodes[i] else {
            i += 1;
            continue;
        };
        if element.is("w:p") {
            // paragraphs nested in text boxes first
            replace_text_in(&mut element.children, token, content, ppr, true, replaced);
            let paragraph = std::mem::take(element);
            let pieces = replace_in_paragraph(paragraph, token, content, ppr, replaced);
            let added = pieces.len();
            nodes.splice(i..=i, pieces.into_iter().map(Node::Element));
            i += added;
            continue;
        }
        if element.is("w:t") {
            // runs inside a paragraph are handled by `replace_in_paragraph`
            let text = element.own_text();
            if !in_paragraph && text.contains(token) {
                set_run_text(element, &text.replace(token, content));
                *replaced += 1;
            }
        } else {
            replace_text_in(&mut element.children, token, content, ppr, in_paragraph, replaced);
        }
        i += 1;
    }
}

fn replace_in_paragraph(
    mut paragraph: Element,
    token: &str,
    content: &str,
    ppr: &Element,
    replaced: &mut usize,
) -> Vec<Element> {
    let mut out = Vec::new();
    let mut skip = 0;
    'paragraph: loop {
        let paths = text_paths(&paragraph);
        for path in paths.iter().skip(skip) {
            let Some(t) = element_at_mut(&mut paragraph, path) else {
                continue;
            };
            let text = t.own_text();
            if !text.contains(token) {
                continue;
            }
            *replaced += 1;
            let new_text = text.replace(token, content);
            let lines: Vec<&str> = new_text
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .collect();
            set_run_text(t, lines[0]);
            if lines.len() == 1 {
                continue;
            }

            let run_properties = path
                .split_last()
                .and_then(|(_, run_path)| element_at(&paragraph, run_path))
                .filter(|run| run.is("w:r"))
                .and_then(|run| run.first_child("w:rPr"))
                .cloned();
            let last_line = lines[lines.len() - 1];
            let remainder = split_off(&mut paragraph, path, last_line);

            out.push(paragraph);
            for line in &lines[1..lines.len() - 1] {
                out.push(text_paragraph(ppr, run_properties.as_ref(), line));
            }
            let mut next = Element::new("w:p").child(ppr.clone());
            next.children.extend(remainder.children);
            paragraph = next;
            // the first text of the new paragraph is the last line, already done
            skip = 1;
            continue 'paragraph;
        }
        break;
    }
    out.push(paragraph);
    out
}

/// Set a `w:t`'s text, marking it space-preserving when needed.
fn set_run_text(t: &mut Element, text: &str) {
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attr("xml:space", "preserve");
    }
    t.set_text(text);
}

/// Detach everything after the `w:t` at `path`, returning it wrapped in
/// copies of the ancestors along `path`. The `w:t` itself is continued by a
/// new one holding `last_line`.
fn split_off(element: &mut Element, path: &[usize], last_line: &str) -> Element {
    let mut remainder = Element {
        name: element.name.clone(),
        attributes: element.attributes.clone(),
        children: Vec::new(),
    };
    let Some((&index, rest)) = path.split_first() else {
        return remainder;
    };
    let following: Vec<Node> = element.children.drain(index + 1..).collect();
    if rest.is_empty() {
        if let Some(rpr) = element.first_child("w:rPr") {
            remainder.children.push(Node::Element(rpr.clone()));
        }
        remainder.children.push(Node::Element(text_element(last_line)));
    } else if let Some(Node::Element(child)) = element.children.get_mut(index) {
        remainder
            .children
            .push(Node::Element(split_off(child, rest, last_line)));
    }
    remainder.children.extend(following);
    remainder
}

/// Paths (child indices from `paragraph`) to its `w:t` elements in document
/// order, not descending into nested paragraphs.
fn text_paths(paragraph: &Element) -> Vec<Vec<usize>> {
    fn collect(element: &Element, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        for (i, child) in element.children.iter().enumerate() {
            let Node::Element(child) = child else {
                continue;
            };
            prefix.push(i);
            if child.is("w:t") {
                out.push(prefix.clone());
            } else if !child.is("w:p") {
                collect(child, prefix, out);
            }
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    collect(paragraph, &mut Vec::new(), &mut out);
    out
}

fn element_at<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    let mut current = root;
    for &i in path {
        current = current.children.get(i)?.as_element()?;
    }
    Some(current)
}

fn element_at_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &i in path {
        current = current.children.get_mut(i)?.as_element_mut()?;
    }
    Some(current)
}

/// Text of a paragraph's own runs, excluding nested paragraphs.
pub fn paragraph_text(paragraph: &Element) -> String {
    text_paths(paragraph)
        .iter()
        .filter_map(|path| element_at(paragraph, path))
        .map(Element::own_text)
        .collect()
}

/// Replace every `w:t` whose text is exactly `token` with `frame`.
///
/// When anything was replaced, the namespaces the frame relies on are
/// declared on the body root if missing.
pub fn replace_image(body: &mut XmlDocument, token: &str, frame: &Element) -> usize {
    let count = replace_elements(
        body.nodes_mut(),
        &|e: &Element| e.is("w:t") && e.own_text() == token,
        &|_: &Element| vec![Node::Element(frame.clone())],
    );
    if count > 0 {
        if let Some(root) = body.root_mut() {
            for (attr, ns) in [
                ("xmlns:wp", WORDPROCESSING_DRAWING_NS),
                ("xmlns:r", RELATIONSHIPS_NS),
            ] {
                if root.get_attr(attr).is_none() {
                    root.set_attr(attr, ns);
                }
            }
        }
    }
    count
}

/// Replace every smallest paragraph whose text contains `token` with a copy
/// of `table`.
pub fn replace_table(body: &mut XmlDocument, token: &str, table: &Element) -> usize {
    let count = replace_elements(
        body.nodes_mut(),
        &|e: &Element| e.is("w:p") && paragraph_text(e).contains(token),
        &|_: &Element| vec![Node::Element(table.clone())],
    );
    if count > 0 {
        close_table_cells(body.nodes_mut());
    }
    count
}

/// A table cell must end with a paragraph; append an empty one where a
/// replacement left a table last.
fn close_table_cells(nodes: &mut [Node]) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        close_table_cells(&mut element.children);
        if element.is("w:tc") {
            let ends_with_table = element
                .children
                .iter()
                .rev()
                .find_map(Node::as_element)
                .is_some_and(|last| last.is("w:tbl"));
            if ends_with_table {
                element.children.push(Node::Element(Element::new("w:p")));
            }
        }
    }
}
