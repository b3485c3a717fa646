//! Enveloped XMLDSig embedding and verification

use super::keys::SigningKeys;
use crate::core::ubl::{UnsignedArtifact, NS_DS, NS_EXT};
use crate::domain::{NaturalKey, SignatureError, XmlError};
use crate::xml::c14n::{canonicalize, canonicalize_subtree, EXC_C14N};
use crate::xml::{parse, writer, Element};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};

pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Signed document plus the values recorded for audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    pub key: NaturalKey,
    pub xml: Vec<u8>,
    /// Base64 SHA-256 digest of the canonical unsigned document
    pub digest_value: String,
    /// Base64 RSA signature over the canonical `SignedInfo`
    pub signature_value: String,
}

impl SignedArtifact {
    pub fn base_name(&self) -> String {
        self.key.base_name()
    }
}

/// Inserts an enveloped signature into the first extension slot
#[derive(Debug, Clone)]
pub struct SignatureEmbedder {
    signature_id: String,
}

impl Default for SignatureEmbedder {
    fn default() -> Self {
        Self::new("SignatureSP")
    }
}

fn c14n_error(e: XmlError) -> SignatureError {
    SignatureError::Canonicalization(e.to_string())
}

fn ds(name: &str) -> Element {
    Element::new(format!("ds:{name}"))
}

fn sha256_base64(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

impl SignatureEmbedder {
    pub fn new(signature_id: impl Into<String>) -> Self {
        Self {
            signature_id: signature_id.into(),
        }
    }

    /// Sign an unsigned artifact
    ///
    /// The input is never modified: the signature is inserted into a new tree
    /// which is then serialized.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::MissingExtensionSlot`] when there is no
    ///   `ext:ExtensionContent` to hold the signature
    /// - [`SignatureError::AlreadySigned`] when a `ds:Signature` is present
    /// - [`SignatureError::Crypto`] when RSA signing fails
    pub fn sign(
        &self,
        unsigned: &UnsignedArtifact,
        keys: &SigningKeys,
    ) -> Result<SignedArtifact, SignatureError> {
        let root = parse(&unsigned.xml)
            .map_err(|e| SignatureError::Malformed(format!("unsigned document: {e}")))?;

        if !root.find_all_ns(NS_DS, "Signature").is_empty() {
            return Err(SignatureError::AlreadySigned);
        }
        let slot = root
            .find_all_ns(NS_EXT, "ExtensionContent")
            .into_iter()
            .next()
            .ok_or(SignatureError::MissingExtensionSlot)?;

        let digest_value = sha256_base64(&canonicalize(&root).map_err(c14n_error)?);

        // SignedInfo is canonicalized at its final position in the tree.
        let placeholder = root
            .with_appended(&slot, self.signature_element(&digest_value, None, keys))
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;
        let mut signed_info_path = slot.clone();
        signed_info_path.push(
            placeholder
                .at(&slot)
                .map(|e| e.children.len() - 1)
                .ok_or(SignatureError::MissingExtensionSlot)?,
        );
        let signature_path = signed_info_path.clone();
        signed_info_path.push(0);

        let signed_info = canonicalize_subtree(&placeholder, &signed_info_path).map_err(c14n_error)?;
        let raw_signature = keys
            .private_key()
            .sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(&signed_info))
            .map_err(|e| SignatureError::Crypto(e.to_string()))?;
        let signature_value = STANDARD.encode(raw_signature);

        let signed = root
            .with_appended(
                &slot,
                self.signature_element(&digest_value, Some(&signature_value), keys),
            )
            .map_err(|e| SignatureError::Malformed(e.to_string()))?;
        let extracted = extract_values(&signed, &signature_path)?;

        tracing::debug!(
            natural_key = %unsigned.key,
            digest = %extracted.0,
            "Embedded enveloped signature"
        );

        Ok(SignedArtifact {
            key: unsigned.key.clone(),
            xml: writer::to_document_bytes(&signed),
            digest_value: extracted.0,
            signature_value: extracted.1,
        })
    }

    fn signature_element(
        &self,
        digest_value: &str,
        signature_value: Option<&str>,
        keys: &SigningKeys,
    ) -> Element {
        let signed_info = ds("SignedInfo")
            .child(ds("CanonicalizationMethod").attr("Algorithm", EXC_C14N))
            .child(ds("SignatureMethod").attr("Algorithm", RSA_SHA256))
            .child(
                ds("Reference")
                    .attr("URI", "")
                    .child(
                        ds("Transforms")
                            .child(ds("Transform").attr("Algorithm", ENVELOPED_SIGNATURE))
                            .child(ds("Transform").attr("Algorithm", EXC_C14N)),
                    )
                    .child(ds("DigestMethod").attr("Algorithm", SHA256))
                    .child(ds("DigestValue").text(digest_value)),
            );

        ds("Signature")
            .attr("xmlns:ds", NS_DS)
            .attr("Id", self.signature_id.as_str())
            .child(signed_info)
            .child(ds("SignatureValue").text(signature_value.unwrap_or_default()))
            .child(
                ds("KeyInfo").child(
                    ds("X509Data").child(ds("X509Certificate").text(keys.certificate_base64())),
                ),
            )
    }
}

/// Digest and signature values recorded in the signature at `path`
fn extract_values(tree: &Element, path: &[usize]) -> Result<(String, String), SignatureError> {
    let signature = tree
        .at(path)
        .ok_or_else(|| SignatureError::Malformed("signature element not found".to_string()))?;
    let digest = signature
        .find_path(&["SignedInfo", "Reference", "DigestValue"])
        .map(Element::text_content)
        .ok_or_else(|| SignatureError::Malformed("missing DigestValue".to_string()))?;
    let value = signature
        .find_child("SignatureValue")
        .map(Element::text_content)
        .ok_or_else(|| SignatureError::Malformed("missing SignatureValue".to_string()))?;
    Ok((digest, value))
}

/// Verify an enveloped signature
///
/// Excises the single `ds:Signature`, recomputes the document digest and
/// checks the RSA signature over the canonical `SignedInfo`. Returns the
/// verified digest value.
pub fn verify_enveloped(signed_xml: &[u8], public_key: &RsaPublicKey) -> Result<String, SignatureError> {
    let root = parse(signed_xml).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let signatures = root.find_all_ns(NS_DS, "Signature");
    let [signature_path] = signatures.as_slice() else {
        return Err(SignatureError::Malformed(format!(
            "expected exactly one signature, found {}",
            signatures.len()
        )));
    };

    let (expected, signature_value) = extract_values(&root, signature_path)?;

    let excised = root
        .without(signature_path)
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let computed = sha256_base64(&canonicalize(&excised).map_err(c14n_error)?);
    if computed != expected {
        return Err(SignatureError::DigestMismatch { expected, computed });
    }

    let signature = root
        .at(signature_path)
        .ok_or_else(|| SignatureError::Malformed("signature element not found".to_string()))?;
    let signed_info_index = signature
        .children
        .iter()
        .position(|node| matches!(node, crate::xml::Node::Element(e) if e.local_name() == "SignedInfo"))
        .ok_or_else(|| SignatureError::Malformed("missing SignedInfo".to_string()))?;
    let mut signed_info_path = signature_path.clone();
    signed_info_path.push(signed_info_index);

    let signed_info = canonicalize_subtree(&root, &signed_info_path).map_err(c14n_error)?;
    let raw_signature = STANDARD
        .decode(signature_value.trim())
        .map_err(|e| SignatureError::Malformed(format!("SignatureValue: {e}")))?;
    public_key
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(&signed_info),
            &raw_signature,
        )
        .map_err(|e| SignatureError::Crypto(e.to_string()))?;

    Ok(computed)
}
