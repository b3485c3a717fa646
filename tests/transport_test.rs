//! Retry and failure classification of the billService transport
//!
//! Most cases use mockito; a raw `TcpListener` stands in when the server has
//! to misbehave at the socket level.

use mockito::Server;
use rsa::RsaPrivateKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sunat_cpe::adapters::sunat::{BillService, Credentials, SunatBillService};
use sunat_cpe::config::{secret_string, RetryConfig, SunatConfig};
use sunat_cpe::core::signature::{SignatureEmbedder, SignedArtifact, SigningKeys};
use sunat_cpe::core::tax::classify;
use sunat_cpe::core::ubl::DocumentBuilder;
use sunat_cpe::domain::{CanonicalDocument, Ruc, TransmissionError};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

const DOCUMENT: &str = r#"{
    "series": "F001",
    "number": "7",
    "issueDate": "2025-03-14",
    "issueTime": "11:00:00",
    "documentType": "01",
    "currency": "PEN",
    "issuer": {
        "ruc": "20123456789",
        "legalName": "ACME SAC",
        "address": {"ubigeo": "150101", "line": "AV. LIMA 123"}
    },
    "buyer": {"documentType": "6", "documentNumber": "20987654321", "legalName": "CLIENTE SAC"},
    "items": [{
        "description": "Widget",
        "quantity": "1",
        "unitCode": "NIU",
        "unitValue": "100",
        "unitPrice": "118",
        "lineTotal": "100",
        "taxAmount": "18",
        "affectationCode": "10"
    }],
    "totals": {"taxed": "100", "tax": "18", "taxInclusive": "118", "payable": "118"}
}"#;

fn signed() -> SignedArtifact {
    let document = CanonicalDocument::from_json(DOCUMENT).unwrap();
    let summary = classify(&document.items).unwrap();
    let unsigned = DocumentBuilder::default().build(&document, &summary).unwrap();
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let keys = SigningKeys::from_parts(key, b"test-certificate".to_vec());
    SignatureEmbedder::default().sign(&unsigned, &keys).unwrap()
}

fn credentials() -> Credentials {
    Credentials::new(
        Ruc::new("20123456789").unwrap(),
        "MODDATOS",
        secret_string("moddatos".to_string()),
    )
}

fn service(endpoint: String, timeout_seconds: u64, max_retries: u32) -> SunatBillService {
    SunatBillService::new(SunatConfig {
        endpoint,
        username: "MODDATOS".to_string(),
        password: secret_string("moddatos".to_string()),
        timeout_seconds,
        retry: RetryConfig {
            max_retries,
            initial_delay_ms: 50,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        },
        ..SunatConfig::default()
    })
    .unwrap()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn test_server_error_retried_up_to_max() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/billService")
        .with_status(503)
        .with_body("<html>Service Unavailable</html>")
        .expect(3)
        .create_async()
        .await;

    let service = service(format!("{}/billService", server.url()), 5, 2);
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    assert!(matches!(err, TransmissionError::Http { status: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/billService")
        .with_status(404)
        .with_body("not found")
        .expect(1)
        .create_async()
        .await;

    let service = service(format!("{}/billService", server.url()), 5, 2);
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    assert!(matches!(err, TransmissionError::Http { status: 404, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fault_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/billService")
        .with_status(500)
        .with_body(concat!(
            r#"<soap-env:Envelope xmlns:soap-env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<soap-env:Body><soap-env:Fault><faultcode>soap-env:Client.0102</faultcode>"#,
            r#"<faultstring>Usuario o contrasena incorrectos</faultstring>"#,
            r#"</soap-env:Fault></soap-env:Body></soap-env:Envelope>"#
        ))
        .expect(1)
        .create_async()
        .await;

    let service = service(format!("{}/billService", server.url()), 5, 2);
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    match err {
        TransmissionError::Fault { code, .. } => assert_eq!(code, "soap-env:Client.0102"),
        other => panic!("expected a fault, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_refused_connection_retried_with_backoff() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = service(format!("http://{addr}/billService"), 5, 2);
    let start = Instant::now();
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    assert!(matches!(err, TransmissionError::ConnectionFailed(_)));
    // 50ms then 100ms of backoff between the three attempts
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_timeout_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            held.push(socket);
        }
    });

    let service = service(format!("http://{addr}/billService"), 1, 2);
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    assert!(matches!(err, TransmissionError::Timeout(_)));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connection_dropped_after_request_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let delivered = Arc::new(AtomicUsize::new(0));

    let counter = delivered.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
                if contains(&request, b"</soapenv:Envelope>") {
                    counter.fetch_add(1, Ordering::SeqCst);
                    break;
                }
            }
            drop(socket);
        }
    });

    let service = service(format!("http://{addr}/billService"), 5, 2);
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    assert!(matches!(err, TransmissionError::OutcomeUnknown(_)));
    assert!(!err.is_retryable());
    assert!(!err.never_reached_remote());
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreadable_receipt_archive_counts_as_delivered() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/billService")
        .with_status(200)
        .with_body(concat!(
            r#"<soap-env:Envelope xmlns:soap-env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<soap-env:Body><br:sendBillResponse xmlns:br="http://service.sunat.gob.pe">"#,
            r#"<applicationResponse>bm90IGEgemlw</applicationResponse>"#,
            r#"</br:sendBillResponse></soap-env:Body></soap-env:Envelope>"#
        ))
        .create_async()
        .await;

    let service = service(format!("{}/billService", server.url()), 5, 0);
    let err = service.send(&signed(), &credentials()).await.unwrap_err();

    assert!(matches!(err, TransmissionError::InvalidResponse(_)));
    assert!(!err.never_reached_remote());
}
