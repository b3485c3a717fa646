//! Enveloped XML digital signatures
//!
//! [`SignatureEmbedder::sign`] digests the exclusive-C14N form of the
//! unsigned document, signs the resulting `SignedInfo` with RSA-SHA256 and
//! places the `ds:Signature` block in the first `ext:ExtensionContent`.
//! [`verify_enveloped`] is the inverse check.

pub mod embedder;
pub mod keys;

pub use embedder::{verify_enveloped, SignatureEmbedder, SignedArtifact};
pub use keys::SigningKeys;
