//! SUNAT `billService` transmission
//!
//! A signed artifact is zipped as `<base>.XML` inside `<base>.ZIP`, wrapped
//! in a WS-Security `sendBill` envelope and posted. The response is either a
//! fault, reported as [`TransmissionError::Fault`], or a base64 receipt
//! archive returned as a [`ReceiptContainer`].

pub mod archive;
pub mod client;
pub mod envelope;

pub use client::SunatBillService;

use crate::config::{SecretString, SunatConfig};
use crate::core::signature::SignedArtifact;
use crate::domain::{Ruc, TransmissionError};
use async_trait::async_trait;

/// Static credentials embedded in the WS-Security header
#[derive(Debug, Clone)]
pub struct Credentials {
    pub ruc: Ruc,
    /// Secondary user registered under the RUC
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(ruc: Ruc, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            ruc,
            username: username.into(),
            password,
        }
    }

    /// Credentials of `ruc` from the service configuration
    pub fn from_config(ruc: Ruc, config: &SunatConfig) -> Self {
        Self::new(ruc, config.username.clone(), config.password.clone())
    }

    /// `Username` token value: RUC immediately followed by the secondary user
    pub fn soap_username(&self) -> String {
        format!("{}{}", self.ruc, self.username)
    }
}

/// Receipt archive returned for an accepted transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptContainer {
    /// `CDR-<base>.ZIP`
    pub file_name: String,
    /// Raw archive bytes as received
    pub bytes: Vec<u8>,
    /// Name of the XML entry inside the archive
    pub entry_name: String,
    /// Content of that entry
    pub entry: Vec<u8>,
}

/// Transmission seam of the pipeline
#[async_trait]
pub trait BillService: Send + Sync {
    /// Send a signed document and return its receipt archive
    async fn send(
        &self,
        signed: &SignedArtifact,
        credentials: &Credentials,
    ) -> Result<ReceiptContainer, TransmissionError>;
}
