//! Exclusive XML Canonicalization 1.0 (without comments)
//!
//! Implements `http://www.w3.org/2001/10/xml-exc-c14n#` with an empty
//! inclusive-prefix list:
//!
//! - a namespace declaration is emitted on an element only when the element
//!   or one of its attributes visibly uses the prefix and no output ancestor
//!   already emitted the same binding
//! - namespace declarations are sorted by prefix (default first), attributes
//!   by namespace URI then local name
//! - empty elements are written as start/end tag pairs
//! - CDATA sections become escaped character data

use super::tree::{split_qname, Element, NamespaceScope, Node};
use crate::domain::XmlError;
use std::collections::BTreeMap;

/// Algorithm identifier of exclusive canonicalization without comments
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// Canonical form of a whole document rooted at `root`
pub fn canonicalize(root: &Element) -> Result<Vec<u8>, XmlError> {
    canonicalize_subtree(root, &[])
}

/// Canonical form of the element at `path`, treating it as the apex of the
/// node set. Ancestor declarations are used only to resolve prefixes.
pub fn canonicalize_subtree(root: &Element, path: &[usize]) -> Result<Vec<u8>, XmlError> {
    let apex = root
        .at(path)
        .ok_or_else(|| XmlError::InvalidPath(path.to_vec()))?;
    let parent_scope = match path.split_last() {
        Some((_, parent)) => root.scope_at(parent)?,
        None => NamespaceScope::default(),
    };
    let mut out = String::new();
    write_element(apex, &parent_scope, &BTreeMap::new(), &mut out)?;
    Ok(out.into_bytes())
}

fn write_element(
    element: &Element,
    parent_scope: &NamespaceScope,
    rendered: &BTreeMap<String, String>,
    out: &mut String,
) -> Result<(), XmlError> {
    let scope = parent_scope.enter(element);

    // Visibly utilized prefixes: the element's own and those of its attributes.
    let mut utilized: Vec<&str> = vec![element.prefix().unwrap_or("")];
    for attr in element
        .attributes
        .iter()
        .filter(|a| !a.is_namespace_declaration())
    {
        if let (Some(prefix), _) = split_qname(&attr.name) {
            if prefix != "xml" && !utilized.contains(&prefix) {
                utilized.push(prefix);
            }
        }
    }

    let mut declarations: BTreeMap<String, String> = BTreeMap::new();
    for prefix in utilized {
        let uri = match scope.resolve(prefix) {
            Some(uri) => uri.to_string(),
            None if prefix.is_empty() => String::new(),
            None => return Err(XmlError::UnboundPrefix(prefix.to_string())),
        };
        let already = rendered.get(prefix).map(String::as_str).unwrap_or("");
        let needs_declaration = if prefix.is_empty() {
            already != uri
        } else {
            rendered.get(prefix) != Some(&uri)
        };
        if needs_declaration {
            declarations.insert(prefix.to_string(), uri);
        }
    }

    let mut attributes: Vec<(String, &str, &str, &str)> = Vec::new();
    for attr in element
        .attributes
        .iter()
        .filter(|a| !a.is_namespace_declaration())
    {
        let (prefix, local) = split_qname(&attr.name);
        let namespace = match prefix {
            Some(p) => scope
                .resolve(p)
                .ok_or_else(|| XmlError::UnboundPrefix(p.to_string()))?
                .to_string(),
            None => String::new(),
        };
        attributes.push((namespace, local, attr.name.as_str(), attr.value.as_str()));
    }
    attributes.sort_by(|a, b| (a.0.as_str(), a.1).cmp(&(b.0.as_str(), b.1)));

    out.push('<');
    out.push_str(&element.name);
    // BTreeMap orders the empty (default) prefix first.
    for (prefix, uri) in &declarations {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
    }
    for (_, _, name, value) in &attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    let child_rendered = if declarations.is_empty() {
        None
    } else {
        let mut merged = rendered.clone();
        merged.extend(declarations);
        Some(merged)
    };
    let child_rendered = child_rendered.as_ref().unwrap_or(rendered);

    for node in &element.children {
        match node {
            Node::Element(child) => write_element(child, &scope, child_rendered, out)?,
            Node::Text(text) | Node::CData(text) => escape_text(text, out),
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
    Ok(())
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::reader::parse;

    fn c14n(xml: &str) -> String {
        let root = parse(xml.as_bytes()).unwrap();
        String::from_utf8(canonicalize(&root).unwrap()).unwrap()
    }

    #[test]
    fn test_unused_namespaces_are_dropped() {
        assert_eq!(
            c14n(r#"<a:root xmlns:a="urn:a" xmlns:b="urn:b"><a:x/></a:root>"#),
            r#"<a:root xmlns:a="urn:a"><a:x></a:x></a:root>"#
        );
    }

    #[test]
    fn test_namespace_declared_where_first_used() {
        assert_eq!(
            c14n(r#"<root xmlns:b="urn:b"><b:x><b:y/></b:x></root>"#),
            r#"<root><b:x xmlns:b="urn:b"><b:y></b:y></b:x></root>"#
        );
    }

    #[test]
    fn test_attribute_ordering() {
        assert_eq!(
            c14n(r#"<r xmlns:z="urn:a" xmlns:a="urn:z" b="2" a:y="3" z:x="4" a="1"/>"#),
            r#"<r xmlns:a="urn:z" xmlns:z="urn:a" a="1" b="2" z:x="4" a:y="3"></r>"#
        );
    }

    #[test]
    fn test_default_namespace_and_undeclaration() {
        assert_eq!(
            c14n(r#"<r xmlns="urn:d"><c xmlns=""/></r>"#),
            r#"<r xmlns="urn:d"><c xmlns=""></c></r>"#
        );
    }

    #[test]
    fn test_text_and_cdata_escaping() {
        assert_eq!(
            c14n("<r a=\"x&#9;&quot;\">1 &gt; 0 &amp;<![CDATA[<&>]]></r>"),
            "<r a=\"x&#x9;&quot;\">1 &gt; 0 &amp;&lt;&amp;&gt;</r>"
        );
    }

    #[test]
    fn test_line_endings_as_a_parser_sees_them() {
        assert_eq!(
            c14n("<r a=\"1\r\n2\">x\r\ny\rz&#xD;</r>"),
            "<r a=\"1 2\">x\ny\nz&#xD;</r>"
        );
    }

    #[test]
    fn test_subtree_inherits_namespace_from_ancestors() {
        let root = parse(
            br#"<root xmlns:ds="urn:ds"><ds:Signature><ds:SignedInfo Id="s"/></ds:Signature></root>"#,
        )
        .unwrap();
        let out = canonicalize_subtree(&root, &[0, 0]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<ds:SignedInfo xmlns:ds="urn:ds" Id="s"></ds:SignedInfo>"#
        );
    }

    #[test]
    fn test_unbound_prefix_is_error() {
        let root = Element::new("x:root");
        assert!(matches!(
            canonicalize(&root),
            Err(XmlError::UnboundPrefix(p)) if p == "x"
        ));
    }
}
