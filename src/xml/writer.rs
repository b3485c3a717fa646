//! Compact XML serialization
//!
//! Output is deterministic: attributes and children are written in tree
//! order with no added whitespace, so identical trees always produce
//! identical bytes.

use super::tree::{Element, Node};
use quick_xml::escape::{escape, partial_escape};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize a document with an XML declaration
pub fn to_document_bytes(root: &Element) -> Vec<u8> {
    let mut out = String::from(DECLARATION);
    write_element(root, &mut out);
    out.into_bytes()
}

/// Serialize an element without a declaration
pub fn to_string(root: &Element) -> String {
    let mut out = String::new();
    write_element(root, &mut out);
    out
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for node in &element.children {
        match node {
            Node::Element(child) => write_element(child, out),
            Node::Text(text) => out.push_str(&partial_escape(text.as_str()).replace('\r', "&#xD;")),
            Node::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(
                    &text
                        .replace("]]>", "]]]]><![CDATA[>")
                        .replace('\r', "]]>&#xD;<![CDATA["),
                );
                out.push_str("]]>");
            }
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

/// Whitespace a parser would otherwise normalize is written as references
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}
