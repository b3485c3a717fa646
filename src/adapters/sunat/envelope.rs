//! SOAP 1.1 envelopes for `billService`

use crate::domain::TransmissionError;
use crate::xml::{parse, writer, Element};

pub const NS_SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const NS_SERVICE: &str = "http://service.sunat.gob.pe";
pub const NS_WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// Build a `sendBill` request carrying the base64 archive
pub fn send_bill(username: &str, password: &str, file_name: &str, content_base64: &str) -> Vec<u8> {
    let envelope = Element::new("soapenv:Envelope")
        .attr("xmlns:soapenv", NS_SOAP_ENV)
        .attr("xmlns:ser", NS_SERVICE)
        .attr("xmlns:wsse", NS_WSSE)
        .child(
            Element::new("soapenv:Header").child(
                Element::new("wsse:Security").child(
                    Element::new("wsse:UsernameToken")
                        .child(Element::new("wsse:Username").text(username))
                        .child(Element::new("wsse:Password").text(password)),
                ),
            ),
        )
        .child(
            Element::new("soapenv:Body").child(
                Element::new("ser:sendBill")
                    .child(Element::new("fileName").text(file_name))
                    .child(Element::new("contentFile").text(content_base64)),
            ),
        );
    writer::to_document_bytes(&envelope)
}

/// Outcome carried by a response envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillResponse {
    /// Base64 receipt archive
    Receipt(String),
    Fault { code: String, description: String },
}

/// Classify a response body
///
/// Elements are matched by local name so any prefix the service picks is
/// accepted.
pub fn parse_response(body: &[u8]) -> Result<BillResponse, TransmissionError> {
    let root = parse(body).map_err(|e| TransmissionError::InvalidResponse(e.to_string()))?;
    if root.local_name() != "Envelope" {
        return Err(TransmissionError::InvalidResponse(format!(
            "expected a SOAP envelope, found <{}>",
            root.name
        )));
    }
    let soap_body = root
        .find_child("Body")
        .ok_or_else(|| TransmissionError::InvalidResponse("envelope has no Body".to_string()))?;

    if let Some(fault) = soap_body.find_child("Fault") {
        let text = |name: &str| {
            fault
                .find_child(name)
                .map(|e| e.text_content().trim().to_string())
                .unwrap_or_default()
        };
        return Ok(BillResponse::Fault {
            code: text("faultcode"),
            description: text("faultstring"),
        });
    }

    let receipt = soap_body
        .find_path(&["sendBillResponse", "applicationResponse"])
        .map(Element::text_content)
        .ok_or_else(|| {
            TransmissionError::InvalidResponse(
                "Body has neither a Fault nor an applicationResponse".to_string(),
            )
        })?;
    let receipt: String = receipt.split_whitespace().collect();
    if receipt.is_empty() {
        return Err(TransmissionError::InvalidResponse(
            "applicationResponse is empty".to_string(),
        ));
    }
    Ok(BillResponse::Receipt(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_bill_escapes_credentials() {
        let body = send_bill("20123456789MODDATOS", "p<&>", "X.ZIP", "UEsDBA==");
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("<wsse:Username>20123456789MODDATOS</wsse:Username>"));
        assert!(text.contains("<wsse:Password>p&lt;&amp;&gt;</wsse:Password>"));

        let parsed = parse(text.as_bytes()).unwrap();
        assert_eq!(
            parsed
                .find_path(&["Body", "sendBill", "contentFile"])
                .unwrap()
                .text_content(),
            "UEsDBA=="
        );
    }

    #[test]
    fn test_parses_success() {
        let body = br#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><br:sendBillResponse xmlns:br="http://service.sunat.gob.pe"><applicationResponse>UEsD
BA==</applicationResponse></br:sendBillResponse></soap:Body></soap:Envelope>"#;
        assert_eq!(
            parse_response(body).unwrap(),
            BillResponse::Receipt("UEsDBA==".to_string())
        );
    }

    #[test]
    fn test_parses_fault() {
        let body = br#"<soap-env:Envelope xmlns:soap-env="http://schemas.xmlsoap.org/soap/envelope/"><soap-env:Body><soap-env:Fault><faultcode>soap-env:Client.0102</faultcode><faultstring>Usuario o contrasena incorrectos</faultstring></soap-env:Fault></soap-env:Body></soap-env:Envelope>"#;
        assert_eq!(
            parse_response(body).unwrap(),
            BillResponse::Fault {
                code: "soap-env:Client.0102".to_string(),
                description: "Usuario o contrasena incorrectos".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_other_documents() {
        assert!(matches!(
            parse_response(b"<html><body>Bad gateway</body></html>"),
            Err(TransmissionError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(b"not xml <"),
            Err(TransmissionError::InvalidResponse(_))
        ));
    }
}
