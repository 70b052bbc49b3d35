//! HTML parsing into the document arena
//!
//! Markup is parsed with `scraper` (html5ever), so the imported tree is the
//! one a browser would build: `html`/`head`/`body` are implied, a paragraph
//! is closed by a block element, misnested formatting is repaired. The parsed
//! tree is then copied node by node into a [`Document`].
//!
//! Fragments are parsed in the context of the element that will hold them.
//! Table and select contexts change how the tree builder treats their
//! children, so the markup is wrapped in the matching ancestors before
//! parsing and the nodes are taken from the innermost wrapper.

use scraper::{Html, Node};
use tracing::debug;

use crate::dom::{Document, ElementData, NodeId};

/// Wrapper markup and descent path for contexts that need one
fn fragment_context(context: &str) -> Option<(&'static str, &'static str, &'static [&'static str])> {
    match context {
        "table" => Some(("<table>", "</table>", &["table"])),
        "thead" | "tbody" | "tfoot" => Some((
            "<table><tbody>",
            "</tbody></table>",
            &["table", "tbody"],
        )),
        "tr" => Some((
            "<table><tbody><tr>",
            "</tr></tbody></table>",
            &["table", "tbody", "tr"],
        )),
        "colgroup" => Some((
            "<table><colgroup>",
            "</colgroup></table>",
            &["table", "colgroup"],
        )),
        "select" => Some(("<select>", "</select>", &["select"])),
        _ => None,
    }
}

/// Parse a complete document and append its top-level nodes to `container`
pub fn parse_document_into(doc: &mut Document, container: NodeId, html: &str) {
    let parsed = Html::parse_document(html);
    log_errors(&parsed);
    import(doc, container, &parsed, &[]);
}

/// Parse `html` as the content of a `context` element, appending the nodes
/// to `container`
pub fn parse_fragment_into(doc: &mut Document, container: NodeId, html: &str, context: &str) {
    let (markup, path) = match fragment_context(context) {
        Some((open, close, path)) => (format!("{}{}{}", open, html, close), path),
        None => (html.to_string(), &[][..]),
    };
    let parsed = Html::parse_fragment(&markup);
    log_errors(&parsed);
    import(doc, container, &parsed, path);
}

fn log_errors(parsed: &Html) {
    if !parsed.errors.is_empty() {
        debug!("Repaired {} HTML parse error(s)", parsed.errors.len());
    }
}

/// Copy the children of the parsed tree's top node into the arena
///
/// For a fragment the top node is the `<html>` holder the parser wraps it
/// in, followed down `path` through the context wrappers.
fn import(doc: &mut Document, container: NodeId, parsed: &Html, path: &[&str]) {
    let mut top = match parsed.tree.root().value() {
        Node::Fragment => *parsed.root_element(),
        _ => parsed.tree.root(),
    };
    for name in path {
        let next = top.children().find(|child| {
            child
                .value()
                .as_element()
                .is_some_and(|element| element.name() == *name)
        });
        match next {
            Some(child) => top = child,
            None => break,
        }
    }

    let mut stack: Vec<_> = top.children().map(|child| (child, container)).collect();
    stack.reverse();
    while let Some((node, parent)) = stack.pop() {
        let id = match node.value() {
            Node::Element(element) => {
                let mut data = ElementData::new(element.name());
                for (name, value) in element.attrs() {
                    data.set_attr(name, value);
                }
                doc.create_element(data)
            }
            Node::Text(text) => doc.create_text(text),
            Node::Comment(comment) => doc.create_comment(comment),
            Node::Doctype(doctype) => doc.create_doctype(&format!("DOCTYPE {}", doctype.name())),
            Node::Document | Node::Fragment => parent,
            _ => continue,
        };
        if id != parent {
            doc.attach(parent, id);
        }
        let mut children: Vec<_> = node.children().map(|child| (child, id)).collect();
        children.reverse();
        stack.extend(children);
    }
}
