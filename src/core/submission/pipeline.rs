//! Submitter - runs one document through every pipeline stage

use super::ledger::{Claim, SubmissionLedger};
use super::SubmissionResult;
use crate::adapters::sunat::{archive, BillService, Credentials, SunatBillService};
use crate::config::CpeConfig;
use crate::core::receipt::{ReceiptInterpreter, ReceiptRecord};
use crate::core::signature::{SignatureEmbedder, SignedArtifact, SigningKeys};
use crate::core::tax::{classify, TaxSummary};
use crate::core::ubl::{DocumentBuilder, UnsignedArtifact};
use crate::core::validation::{validate_document, validate_totals};
use crate::domain::{CanonicalDocument, NaturalKey, Result, Stage, TransmissionError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Validated, classified and built document, not yet signed
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub key: NaturalKey,
    pub summary: TaxSummary,
    pub unsigned: UnsignedArtifact,
}

/// Paths of the artifacts written for a signed document
#[derive(Debug, Default)]
struct WrittenArtifacts {
    xml_path: Option<PathBuf>,
    zip_path: Option<PathBuf>,
}

/// Pipeline orchestrator
///
/// Holds the explicit configuration and the stage implementations. The
/// transport is behind [`BillService`] so tests can substitute it.
pub struct Submitter {
    config: CpeConfig,
    builder: DocumentBuilder,
    embedder: SignatureEmbedder,
    interpreter: ReceiptInterpreter,
    service: Arc<dyn BillService>,
    ledger: SubmissionLedger,
}

impl Submitter {
    /// Create a submitter over an existing transport and ledger
    pub fn new(config: &CpeConfig, service: Arc<dyn BillService>, ledger: SubmissionLedger) -> Self {
        Self {
            builder: DocumentBuilder::new(config.signing.signature_id.clone()),
            embedder: SignatureEmbedder::new(config.signing.signature_id.clone()),
            interpreter: ReceiptInterpreter::new(config.receipt.code_comparison),
            config: config.clone(),
            service,
            ledger,
        }
    }

    /// Create a submitter with the HTTP transport and the ledger file under
    /// `output.directory`
    pub fn from_config(config: &CpeConfig) -> Result<Self> {
        let service = Arc::new(SunatBillService::new(config.sunat.clone())?);
        let ledger = SubmissionLedger::file(config.output.ledger_path());
        Ok(Self::new(config, service, ledger))
    }

    pub fn ledger(&self) -> &SubmissionLedger {
        &self.ledger
    }

    /// Validate, classify and build a document
    pub fn prepare(&self, document: &CanonicalDocument) -> Result<PreparedDocument> {
        let start = Instant::now();
        validate_document(document)?;
        let key = document.natural_key()?;
        crate::log_stage_complete!(Stage::Validation, key, start.elapsed());

        let start = Instant::now();
        let summary = classify(&document.items)?;
        validate_totals(document, &summary)?;
        crate::log_stage_complete!(Stage::Classification, key, start.elapsed());

        let start = Instant::now();
        let unsigned = self.builder.build(document, &summary)?;
        crate::log_stage_complete!(Stage::Build, key, start.elapsed());

        Ok(PreparedDocument {
            key,
            summary,
            unsigned,
        })
    }

    /// Sign a built document with the configured key material
    pub fn sign(&self, unsigned: &UnsignedArtifact) -> Result<SignedArtifact> {
        let start = Instant::now();
        let keys = SigningKeys::load(&self.config.signing)?;
        let signed = self.embedder.sign(unsigned, &keys)?;
        crate::log_stage_complete!(Stage::Signing, unsigned.key, start.elapsed());
        Ok(signed)
    }

    /// Run every stage except transmission
    ///
    /// The ledger is not consulted and nothing is written.
    pub fn dry_run(&self, document: &CanonicalDocument) -> Result<SignedArtifact> {
        let prepared = self.prepare(document)?;
        let signed = self.sign(&prepared.unsigned)?;
        tracing::info!(
            natural_key = %signed.key,
            digest = %signed.digest_value,
            "Dry run complete, document not sent"
        );
        Ok(signed)
    }

    /// Submit a document
    ///
    /// A key that was already acknowledged returns its stored result without
    /// signing or sending again.
    ///
    /// # Errors
    ///
    /// Any stage error aborts the submission. Errors raised before the
    /// document reaches the transport, remote faults and connection failures
    /// release the ledger claim; any other transport or receipt error leaves
    /// the key marked as sent.
    pub async fn submit(&self, document: &CanonicalDocument) -> Result<SubmissionResult> {
        let key = document.natural_key()?;

        let attempt_id = match self.ledger.claim(&key).await? {
            Claim::Acknowledged(result) => return Ok(*result),
            Claim::Claimed { attempt_id } => attempt_id,
        };

        let outcome = self.run(document, &key, attempt_id).await;
        if let Err(e) = &outcome {
            crate::log_error_with_context!(e, key.base_name().as_str());
        }
        outcome
    }

    async fn run(
        &self,
        document: &CanonicalDocument,
        key: &NaturalKey,
        attempt_id: Uuid,
    ) -> Result<SubmissionResult> {
        let (signed, written) = match self.prepare_and_write(document).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.ledger.release(key, attempt_id).await?;
                return Err(e);
            }
        };

        self.ledger.mark_sent(key, attempt_id).await?;

        let start = Instant::now();
        let credentials = Credentials::from_config(key.ruc().clone(), &self.config.sunat);
        let container = match self.service.send(&signed, &credentials).await {
            Ok(container) => container,
            Err(e) => {
                if e.never_reached_remote() || matches!(e, TransmissionError::Fault { .. }) {
                    self.ledger.release(key, attempt_id).await?;
                } else {
                    tracing::warn!(
                        natural_key = %key,
                        "Transmission outcome unknown, keeping submission marked as sent"
                    );
                }
                return Err(e.into());
            }
        };
        crate::log_stage_complete!(Stage::Transmission, key, start.elapsed());

        let start = Instant::now();
        let mut record = self.interpreter.interpret(&container)?;
        record.container_path = self.write_receipt(key, &record).await?;
        crate::log_stage_complete!(Stage::Receipt, key, start.elapsed());

        tracing::info!(
            natural_key = %key,
            status = %record.status,
            code = %record.code,
            "Submission complete"
        );

        let result = SubmissionResult {
            natural_key: key.base_name(),
            status: record.status,
            code: record.code,
            description: record.description,
            digest_value: signed.digest_value,
            signature_value: signed.signature_value,
            signed_xml: signed.xml,
            receipt_container: record.container_bytes,
            receipt_name: record.container_name,
            xml_path: written.xml_path,
            zip_path: written.zip_path,
            receipt_path: record.container_path,
        };
        self.ledger.acknowledge(key, attempt_id, &result).await?;
        Ok(result)
    }

    async fn prepare_and_write(
        &self,
        document: &CanonicalDocument,
    ) -> Result<(SignedArtifact, WrittenArtifacts)> {
        let prepared = self.prepare(document)?;
        let signed = self.sign(&prepared.unsigned)?;
        let written = self.write_signed(&signed).await?;
        Ok((signed, written))
    }

    /// Write `<base>.xml` and `<base>.ZIP` to the output directory
    async fn write_signed(&self, signed: &SignedArtifact) -> Result<WrittenArtifacts> {
        let output = &self.config.output;
        if !output.write_artifacts {
            return Ok(WrittenArtifacts::default());
        }

        let base_name = signed.base_name();
        tokio::fs::create_dir_all(&output.directory).await?;

        let xml_path = output.directory.join(format!("{base_name}.xml"));
        tokio::fs::write(&xml_path, &signed.xml).await?;

        let zip = archive::pack(&format!("{base_name}.XML"), &signed.xml)?;
        let zip_path = output.directory.join(format!("{base_name}.ZIP"));
        tokio::fs::write(&zip_path, zip).await?;

        tracing::debug!(
            xml_path = %xml_path.display(),
            zip_path = %zip_path.display(),
            "Wrote signed artifacts"
        );

        Ok(WrittenArtifacts {
            xml_path: Some(xml_path),
            zip_path: Some(zip_path),
        })
    }

    /// Write the receipt container to `<receipts>/<base>/CDR-<base>.ZIP`
    async fn write_receipt(&self, key: &NaturalKey, record: &ReceiptRecord) -> Result<Option<PathBuf>> {
        let output = &self.config.output;
        if !output.write_artifacts {
            return Ok(None);
        }

        let directory = output.receipts_directory.join(key.base_name());
        tokio::fs::create_dir_all(&directory).await?;
        let path = directory.join(&record.container_name);
        tokio::fs::write(&path, &record.container_bytes).await?;

        tracing::debug!(receipt_path = %path.display(), "Wrote receipt container");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sunat::ReceiptContainer;
    use crate::config::{secret_string, SigningConfig, SunatConfig};
    use async_trait::async_trait;

    struct UnreachableService;

    #[async_trait]
    impl BillService for UnreachableService {
        async fn send(
            &self,
            _signed: &SignedArtifact,
            _credentials: &Credentials,
        ) -> std::result::Result<ReceiptContainer, TransmissionError> {
            Err(TransmissionError::ConnectionFailed("refused".to_string()))
        }
    }

    fn config() -> CpeConfig {
        CpeConfig {
            application: Default::default(),
            environment: Default::default(),
            sunat: SunatConfig {
                username: "MODDATOS".to_string(),
                password: secret_string("moddatos".to_string()),
                ..SunatConfig::default()
            },
            signing: SigningConfig {
                private_key_path: PathBuf::from("/nonexistent/key.pem"),
                certificate_path: PathBuf::from("/nonexistent/cert.pem"),
                signature_id: "SignatureSP".to_string(),
            },
            output: Default::default(),
            receipt: Default::default(),
            logging: Default::default(),
        }
    }

    fn document() -> CanonicalDocument {
        CanonicalDocument::from_json(
            r#"{
                "series": "F001",
                "number": "1",
                "issueDate": "2024-03-15",
                "issueTime": "10:30:00",
                "documentType": "01",
                "currency": "PEN",
                "issuer": {
                    "ruc": "20123456789",
                    "legalName": "ACME SAC",
                    "address": {"ubigeo": "150101", "line": "AV. LIMA 123"}
                },
                "buyer": {"documentType": "6", "documentNumber": "20987654321", "legalName": "CLIENTE SAC"},
                "items": [{
                    "description": "Producto",
                    "quantity": "1",
                    "unitCode": "NIU",
                    "unitValue": "100",
                    "unitPrice": "118",
                    "lineTotal": "100",
                    "taxAmount": "18",
                    "affectationCode": "10"
                }],
                "totals": {
                    "taxed": "100",
                    "tax": "18",
                    "taxInclusive": "118",
                    "payable": "118"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_builds_unsigned_document() {
        let submitter = Submitter::new(
            &config(),
            Arc::new(UnreachableService),
            SubmissionLedger::in_memory(),
        );
        let prepared = submitter.prepare(&document()).unwrap();
        assert_eq!(prepared.key.base_name(), "20123456789-01-F001-1");
        assert!(String::from_utf8(prepared.unsigned.xml)
            .unwrap()
            .contains("<cbc:ID>F001-1</cbc:ID>"));
    }

    #[tokio::test]
    async fn test_signing_failure_releases_claim() {
        let submitter = Submitter::new(
            &config(),
            Arc::new(UnreachableService),
            SubmissionLedger::in_memory(),
        );
        let err = submitter.submit(&document()).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Signing);

        let key = document().natural_key().unwrap();
        assert!(submitter.ledger().lookup(&key).await.unwrap().is_none());
    }
}
