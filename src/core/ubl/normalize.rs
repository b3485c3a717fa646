//! Post-build normalization of the UBL tree
//!
//! Optional fields are built unconditionally and left empty when the input
//! has no value for them. This pass removes what the schema would reject:
//!
//! 1. attributes with an empty value are dropped
//! 2. leaf elements without text are dropped, whatever attributes remain
//! 3. parents left without any content are dropped in turn
//!
//! Elements named in `keep` survive even when empty; the signature slot
//! relies on this.

use crate::xml::{Element, Node};

/// Normalize `root`, preserving empty elements whose qualified name is in `keep`
pub fn normalize(root: &Element, keep: &[&str]) -> Element {
    normalize_element(root, keep).unwrap_or_else(|| Element {
        name: root.name.clone(),
        attributes: Vec::new(),
        children: Vec::new(),
    })
}

fn normalize_element(element: &Element, keep: &[&str]) -> Option<Element> {
    let attributes: Vec<_> = element
        .attributes
        .iter()
        .filter(|a| !a.value.is_empty())
        .cloned()
        .collect();

    let had_child_elements = element
        .children
        .iter()
        .any(|n| matches!(n, Node::Element(_)));

    let mut children = Vec::with_capacity(element.children.len());
    for node in &element.children {
        match node {
            Node::Element(child) => {
                if let Some(child) = normalize_element(child, keep) {
                    children.push(Node::Element(child));
                }
            }
            Node::Text(t) | Node::CData(t) if t.is_empty() => {}
            other => children.push(other.clone()),
        }
    }

    let preserved = keep.contains(&element.name.as_str());
    let has_text = children
        .iter()
        .any(|n| matches!(n, Node::Text(_) | Node::CData(_)));

    if !preserved {
        if !had_child_elements && !has_text {
            return None;
        }
        if had_child_elements && children.is_empty() {
            return None;
        }
    }

    Some(Element {
        name: element.name.clone(),
        attributes,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::writer::to_string;

    #[test]
    fn test_drops_empty_attributes() {
        let root = Element::new("r").child(Element::new("a").attr("x", "").attr("y", "1").text("v"));
        assert_eq!(to_string(&normalize(&root, &[])), r#"<r><a y="1">v</a></r>"#);
    }

    #[test]
    fn test_drops_textless_leaves_even_with_attributes() {
        let root = Element::new("r")
            .child(Element::new("code").attr("listID", "UNSPSC").text(""))
            .child(Element::new("id").text("1"));
        assert_eq!(to_string(&normalize(&root, &[])), "<r><id>1</id></r>");
    }

    #[test]
    fn test_collapses_parents_left_empty() {
        let root = Element::new("r")
            .child(
                Element::new("cac:CommodityClassification").child(
                    Element::new("cbc:ItemClassificationCode")
                        .attr("listID", "UNSPSC")
                        .text(""),
                ),
            )
            .child(Element::new("cbc:ID").text("1"));
        assert_eq!(
            to_string(&normalize(&root, &[])),
            "<r><cbc:ID>1</cbc:ID></r>"
        );
    }

    #[test]
    fn test_keeps_preserved_slot() {
        let root = Element::new("r").child(
            Element::new("ext:UBLExtensions").child(
                Element::new("ext:UBLExtension").child(Element::new("ext:ExtensionContent")),
            ),
        );
        let normalized = normalize(&root, &["ext:ExtensionContent"]);
        assert_eq!(normalized, root);
    }

    #[test]
    fn test_keeps_cdata_content() {
        let root = Element::new("r").child(Element::new("cbc:Name").cdata("ACME"));
        assert_eq!(normalize(&root, &[]), root);
    }
}
