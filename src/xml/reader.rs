//! XML parsing into [`Element`] trees using quick-xml
//!
//! Whitespace is preserved as text nodes; declarations, comments,
//! processing instructions and doctype declarations are dropped.
//!
//! Line endings and attribute whitespace are normalized as any conforming
//! XML processor does, so canonical output matches what a remote verifier
//! computes from the same bytes.

use super::tree::{Attribute, Element, Node};
use crate::domain::XmlError;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

/// Parse a UTF-8 XML document into its root element
pub fn parse(bytes: &[u8]) -> Result<Element, XmlError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| XmlError::Parse(format!("document is not valid UTF-8: {e}")))?;
    parse_str(text)
}

/// Parse an XML document held in a string
pub fn parse_str(text: &str) -> Result<Element, XmlError> {
    let text = normalize_line_endings(text);
    let mut reader = Reader::from_str(&text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Parse(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(start) => {
                ensure_single_root(&root)?;
                stack.push(start_element(&start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&root)?;
                let element = start_element(&start)?;
                close(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("unexpected closing tag".to_string()))?;
                close(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::Parse(e.to_string()))?;
                    parent.children.push(Node::Text(value.into_owned()));
                }
            }
            Event::CData(cdata) => {
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| XmlError::Parse("CDATA outside root element".to_string()))?;
                let value = String::from_utf8(cdata.into_inner().into_owned())
                    .map_err(|e| XmlError::Parse(e.to_string()))?;
                parent.children.push(Node::CData(value));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Parse(format!(
            "unclosed element <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| XmlError::Parse("document has no root element".to_string()))
}

/// `\r\n` and lone `\r` become `\n`; character references are untouched
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

fn ensure_single_root(root: &Option<Element>) -> Result<(), XmlError> {
    if root.is_some() {
        return Err(XmlError::Parse(
            "content after the root element".to_string(),
        ));
    }
    Ok(())
}

fn close(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn start_element(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| XmlError::Parse(e.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .to_string();
        let raw = std::str::from_utf8(&attr.value).map_err(|e| XmlError::Parse(e.to_string()))?;
        // Literal tabs and newlines in attribute values read as spaces
        let raw = raw.replace(['\t', '\n'], " ");
        let value = unescape(&raw)
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        element.attributes.push(Attribute { name, value });
    }
    Ok(element)
}
