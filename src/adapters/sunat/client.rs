//! HTTP client for the SUNAT `billService`

use super::{archive, envelope, BillService, Credentials, ReceiptContainer};
use crate::config::{RetryConfig, SunatConfig};
use crate::core::signature::SignedArtifact;
use crate::domain::{CpeError, Result, TransmissionError};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// `billService` client over reqwest
///
/// One POST per attempt, bounded by `timeout_seconds`. Retries follow the
/// configured [`RetryConfig`] and only apply to connection failures and
/// non-SOAP 5xx responses.
///
/// # Example
///
/// ```no_run
/// use sunat_cpe::adapters::sunat::SunatBillService;
/// use sunat_cpe::config::SunatConfig;
///
/// # fn example() -> sunat_cpe::domain::Result<()> {
/// let service = SunatBillService::new(SunatConfig::default())?;
/// # Ok(())
/// # }
/// ```
pub struct SunatBillService {
    endpoint: String,
    client: Client,
    retry: RetryConfig,
}

impl SunatBillService {
    /// Create a client for the configured endpoint
    pub fn new(config: SunatConfig) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| CpeError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint,
            client,
            retry: config.retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: Vec<u8>) -> std::result::Result<Vec<u8>, TransmissionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", "\"\"")
            .body(body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransmissionError::InvalidResponse(e.to_string()))?
            .to_vec();

        // Faults usually arrive with a 500 status but are still SOAP documents.
        if !status.is_success() && !looks_like_soap(&bytes) {
            return Err(TransmissionError::Http {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).chars().take(200).collect(),
            });
        }

        Ok(bytes)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> std::result::Result<T, TransmissionError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, TransmissionError>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt > max_retries {
                        return Err(e);
                    }

                    let delay_ms = self.retry.delay_for_attempt(attempt);

                    crate::log_retry_attempt!(attempt, max_retries, e);
                    tracing::debug!(delay_ms = delay_ms, "Backing off before retry");

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

/// Classify a send failure by whether the request could have been written
///
/// Only errors raised before the connection was established are safe to
/// resend. Anything later may have delivered the full envelope.
fn send_error(e: reqwest::Error) -> TransmissionError {
    if e.is_timeout() {
        TransmissionError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_builder() {
        TransmissionError::ConnectionFailed(e.to_string())
    } else {
        TransmissionError::OutcomeUnknown(e.to_string())
    }
}

fn looks_like_soap(body: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&body[..body.len().min(512)]);
    head.contains("Envelope")
}

#[async_trait]
impl BillService for SunatBillService {
    async fn send(
        &self,
        signed: &SignedArtifact,
        credentials: &Credentials,
    ) -> std::result::Result<ReceiptContainer, TransmissionError> {
        let base_name = signed.base_name();
        let zip_name = format!("{base_name}.ZIP");
        let zip = archive::pack(&format!("{base_name}.XML"), &signed.xml)?;

        let request = envelope::send_bill(
            &credentials.soap_username(),
            credentials.password.expose_secret().as_ref(),
            &zip_name,
            &general_purpose::STANDARD.encode(&zip),
        );

        tracing::info!(
            natural_key = %signed.key,
            endpoint = %self.endpoint,
            archive_bytes = zip.len(),
            "Sending document"
        );

        let body = self.retry_request(|| self.post(request.clone())).await?;

        match envelope::parse_response(&body)? {
            envelope::BillResponse::Fault { code, description } => {
                tracing::warn!(natural_key = %signed.key, code = %code, "Service returned a fault");
                Err(TransmissionError::Fault { code, description })
            }
            envelope::BillResponse::Receipt(encoded) => {
                let bytes = general_purpose::STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    TransmissionError::InvalidResponse(format!("applicationResponse: {e}"))
                })?;
                // The request was delivered; an unreadable receipt must not release the claim
                let (entry_name, entry) =
                    archive::first_xml_entry(&bytes).map_err(|e| match e {
                        TransmissionError::Archive(message) => TransmissionError::InvalidResponse(
                            format!("receipt archive: {message}"),
                        ),
                        other => other,
                    })?;
                Ok(ReceiptContainer {
                    file_name: format!("CDR-{base_name}.ZIP"),
                    bytes,
                    entry_name,
                    entry,
                })
            }
        }
    }
}
