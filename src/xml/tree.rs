//! Immutable-style XML element tree
//!
//! Elements keep qualified names (`prefix:local`) and attributes exactly as
//! written, including `xmlns` declarations, so a parsed document can be
//! re-serialized and canonicalized without losing namespace information.
//! Edits are pure: [`Element::with_appended`] and [`Element::without`]
//! return new trees and leave the original untouched.

use crate::domain::XmlError;

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Child-index path from a root element to one of its descendants
pub type NodePath = Vec<usize>;

/// A node in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

/// An attribute with its qualified name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// Whether this attribute is a namespace declaration
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }

    /// Declared prefix for namespace declarations (`""` for the default namespace)
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// An XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder: add a child element
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: add every element of an iterator as a child
    pub fn children<I: IntoIterator<Item = Element>>(mut self, children: I) -> Self {
        self.children
            .extend(children.into_iter().map(Node::Element));
        self
    }

    /// Builder: add an optional child element
    pub fn child_opt(self, child: Option<Element>) -> Self {
        match child {
            Some(child) => self.child(child),
            None => self,
        }
    }

    /// Builder: add a text node
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Builder: add a CDATA section
    pub fn cdata(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::CData(text.into()));
        self
    }

    /// Prefix of the qualified name, if any
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// Local part of the qualified name
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Value of the attribute with the given qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child element with the given local name
    pub fn find_child(&self, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    /// Walk direct children by local name, e.g. `["Body", "Fault"]`
    pub fn find_path(&self, local_names: &[&str]) -> Option<&Element> {
        local_names
            .iter()
            .try_fold(self, |current, name| current.find_child(name))
    }

    /// First descendant (or self) with the given local name, depth-first
    pub fn find_descendant(&self, local_name: &str) -> Option<&Element> {
        if self.local_name() == local_name {
            return Some(self);
        }
        self.elements()
            .find_map(|child| child.find_descendant(local_name))
    }

    /// Concatenated text and CDATA of the direct children
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Whether the element has neither attributes nor non-empty content
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.children.iter().all(|node| match node {
                Node::Text(t) | Node::CData(t) => t.is_empty(),
                Node::Element(_) => false,
            })
    }

    /// Element addressed by a child-index path
    pub fn at(&self, path: &[usize]) -> Option<&Element> {
        path.iter().try_fold(self, |current, &index| {
            match current.children.get(index) {
                Some(Node::Element(e)) => Some(e),
                _ => None,
            }
        })
    }

    /// Namespace scope in effect at the element addressed by `path`,
    /// including that element's own declarations
    pub fn scope_at(&self, path: &[usize]) -> Result<NamespaceScope, XmlError> {
        let mut scope = NamespaceScope::default().enter(self);
        let mut current = self;
        for &index in path {
            current = match current.children.get(index) {
                Some(Node::Element(e)) => e,
                _ => return Err(XmlError::InvalidPath(path.to_vec())),
            };
            scope = scope.enter(current);
        }
        Ok(scope)
    }

    /// Paths of every element (including self) whose expanded name is
    /// `{namespace}local_name`, in document order
    pub fn find_all_ns(&self, namespace: &str, local_name: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_ns(
            self,
            &NamespaceScope::default(),
            namespace,
            local_name,
            &mut path,
            &mut found,
        );
        found
    }

    /// New tree with `child` appended to the element at `parent`
    pub fn with_appended(&self, parent: &[usize], child: Element) -> Result<Element, XmlError> {
        let mut tree = self.clone();
        let target =
            at_mut(&mut tree, parent).ok_or_else(|| XmlError::InvalidPath(parent.to_vec()))?;
        target.children.push(Node::Element(child));
        Ok(tree)
    }

    /// New tree with the element at `path` removed
    pub fn without(&self, path: &[usize]) -> Result<Element, XmlError> {
        let (last, parent) = path
            .split_last()
            .ok_or_else(|| XmlError::InvalidPath(path.to_vec()))?;
        let mut tree = self.clone();
        let target =
            at_mut(&mut tree, parent).ok_or_else(|| XmlError::InvalidPath(path.to_vec()))?;
        match target.children.get(*last) {
            Some(Node::Element(_)) => {
                target.children.remove(*last);
                Ok(tree)
            }
            _ => Err(XmlError::InvalidPath(path.to_vec())),
        }
    }
}

fn at_mut<'a>(element: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = element;
    for &index in path {
        current = match current.children.get_mut(index) {
            Some(Node::Element(e)) => e,
            _ => return None,
        };
    }
    Some(current)
}

fn collect_ns(
    element: &Element,
    parent_scope: &NamespaceScope,
    namespace: &str,
    local_name: &str,
    path: &mut NodePath,
    found: &mut Vec<NodePath>,
) {
    let scope = parent_scope.enter(element);
    if element.local_name() == local_name
        && scope.resolve(element.prefix().unwrap_or("")) == Some(namespace)
    {
        found.push(path.clone());
    }
    for (index, node) in element.children.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(index);
            collect_ns(child, &scope, namespace, local_name, path, found);
            path.pop();
        }
    }
}

/// Split `prefix:local` into its parts
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// In-scope namespace bindings
///
/// Later bindings shadow earlier ones. The empty prefix stands for the
/// default namespace; binding it to `""` undeclares it.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    bindings: Vec<(String, String)>,
}

impl NamespaceScope {
    /// Scope of `element`'s content: this scope plus the element's declarations
    pub fn enter(&self, element: &Element) -> NamespaceScope {
        let mut next = self.clone();
        for attr in &element.attributes {
            if let Some(prefix) = attr.declared_prefix() {
                next.bindings.push((prefix.to_string(), attr.value.clone()));
            }
        }
        next
    }

    /// Namespace URI bound to `prefix`, `None` when unbound
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty() || prefix.is_empty())
    }
}
