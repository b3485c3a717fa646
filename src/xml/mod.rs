//! Minimal XML toolkit used by the document builder, the signer and the
//! SOAP codec.
//!
//! - [`tree`] - element tree with pure edit operations
//! - [`reader`] - parsing via quick-xml
//! - [`writer`] - deterministic compact serialization
//! - [`c14n`] - exclusive canonicalization for digests and signatures

pub mod c14n;
pub mod reader;
pub mod tree;
pub mod writer;

pub use reader::parse;
pub use tree::{Attribute, Element, NamespaceScope, Node, NodePath};
