//! Document serialization.
//!
//! Pristine nodes are written from their source text; modified or created
//! elements get a regenerated start tag. Traversal uses an explicit stack
//! so deeply nested input cannot overflow the call stack.

use std::fmt::Write as _;

use crate::html::dom::{Attribute, Closing, Document, Element, NodeId, NodeKind};

enum Step {
    Open(NodeId),
    Close(NodeId),
}

pub(crate) fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    let mut stack: Vec<Step> = doc
        .children(doc.root())
        .iter()
        .rev()
        .map(|&id| Step::Open(id))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Open(id) => match doc.kind(id) {
                NodeKind::Document => {}
                NodeKind::Text(s) | NodeKind::Comment(s) | NodeKind::Doctype(s) | NodeKind::Raw(s) => {
                    out.push_str(s)
                }
                NodeKind::Element(element) => {
                    write_start_tag(&mut out, element);
                    stack.push(Step::Close(id));
                    stack.extend(doc.children(id).iter().rev().map(|&c| Step::Open(c)));
                }
            },
            Step::Close(id) => {
                if let Some(element) = doc.element(id) {
                    write_end_tag(&mut out, element);
                }
            }
        }
    }
    out
}

fn write_start_tag(out: &mut String, element: &Element) {
    if let Some(source) = element.start_tag_source() {
        out.push_str(source);
        return;
    }

    out.push('<');
    out.push_str(element.name());
    for attribute in element.attributes() {
        write_attribute(out, attribute);
    }
    if element.is_self_closing() {
        out.push_str(" /");
    }
    out.push('>');
}

fn write_attribute(out: &mut String, attribute: &Attribute) {
    out.push(' ');
    out.push_str(&attribute.name);
    let Some(value) = &attribute.value else {
        return;
    };
    // Values are stored as written, so only the delimiter needs care.
    if value.contains('"') && !value.contains('\'') {
        let _ = write!(out, "='{value}'");
    } else {
        let _ = write!(out, "=\"{}\"", value.replace('"', "&quot;"));
    }
}

fn write_end_tag(out: &mut String, element: &Element) {
    match &element.closing {
        Closing::None | Closing::Omitted => {}
        Closing::Source(source) => out.push_str(source),
        Closing::Generated => {
            out.push_str("</");
            out.push_str(element.name());
            out.push('>');
        }
    }
}
