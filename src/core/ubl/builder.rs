//! Maps a canonical document and its tax summary to a UBL 2.1 invoice tree

use super::normalize::normalize;
use super::{
    NS_CAC, NS_CBC, NS_CCTS, NS_DS, NS_EXT, NS_INVOICE, NS_QDT, NS_SAC, NS_UDT, NS_XSD, NS_XSI,
    SIGNATURE_SLOT,
};
use crate::core::tax::{
    classify_code, compute_perception, round_money, Classification, Perception, TaxCategory,
    TaxSummary,
};
use crate::domain::{
    Address, CanonicalDocument, CpeError, Currency, LineItem, NaturalKey, PaymentMethod, Result,
};
use crate::xml::{writer, Element};
use rust_decimal::Decimal;

const AGENCY_SUNAT: &str = "PE:SUNAT";
const AGENCY_UNECE: &str = "United Nations Economic Commission for Europe";
const CATALOG_01: &str = "urn:pe:gob:sunat:cpe:see:gem:catalogos:catalogo01";
const CATALOG_06: &str = "urn:pe:gob:sunat:cpe:see:gem:catalogos:catalogo06";
const CATALOG_07: &str = "urn:pe:gob:sunat:cpe:see:gem:catalogos:catalogo07";
const CATALOG_16: &str = "urn:pe:gob:sunat:cpe:see:gem:catalogos:catalogo16";
const CATALOG_51: &str = "urn:pe:gob:sunat:cpe:see:gem:catalogos:catalogo51";

/// Serialized document awaiting its signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedArtifact {
    pub key: NaturalKey,
    pub xml: Vec<u8>,
}

impl UnsignedArtifact {
    /// Base name shared by every artifact of this document
    pub fn base_name(&self) -> String {
        self.key.base_name()
    }
}

/// Builds UBL invoices
///
/// The builder is stateless apart from the signature id it references from
/// `cac:Signature`, which must match the `Id` the signer puts on
/// `ds:Signature`.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    signature_id: String,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new("SignatureSP")
    }
}

impl DocumentBuilder {
    pub fn new(signature_id: impl Into<String>) -> Self {
        Self {
            signature_id: signature_id.into(),
        }
    }

    /// Build the unsigned artifact
    ///
    /// Repeated builds from equal inputs are byte-identical.
    ///
    /// # Errors
    ///
    /// Returns [`CpeError::DocumentBuild`] for document types other than
    /// invoice and receipt, or when the document has no valid natural key.
    pub fn build(&self, document: &CanonicalDocument, summary: &TaxSummary) -> Result<UnsignedArtifact> {
        if !document.document_type.is_supported() {
            return Err(CpeError::DocumentBuild(format!(
                "document type {} is not supported",
                document.document_type
            )));
        }
        let key = document
            .natural_key()
            .map_err(|e| CpeError::DocumentBuild(e.to_string()))?;

        let tree = self.build_tree(document, summary)?;
        let tree = normalize(&tree, &[SIGNATURE_SLOT]);
        let xml = writer::to_document_bytes(&tree);

        tracing::debug!(
            natural_key = %key,
            bytes = xml.len(),
            lines = document.items.len(),
            "Built UBL document"
        );

        Ok(UnsignedArtifact { key, xml })
    }

    /// Build the element tree without normalizing it
    pub fn build_tree(&self, document: &CanonicalDocument, summary: &TaxSummary) -> Result<Element> {
        let currency = document.currency;
        let perception = compute_perception(
            document.document_type,
            document.perception.as_deref(),
            document.totals.payable,
        );

        let mut lines = Vec::with_capacity(document.items.len());
        for (index, item) in document.items.iter().enumerate() {
            lines.push(invoice_line(index + 1, item, currency)?);
        }

        let root = Element::new("Invoice")
            .attr("xmlns:xsi", NS_XSI)
            .attr("xmlns:xsd", NS_XSD)
            .attr("xmlns:cac", NS_CAC)
            .attr("xmlns:cbc", NS_CBC)
            .attr("xmlns:ccts", NS_CCTS)
            .attr("xmlns:ds", NS_DS)
            .attr("xmlns:ext", NS_EXT)
            .attr("xmlns:qdt", NS_QDT)
            .attr("xmlns:udt", NS_UDT)
            .attr("xmlns:sac", NS_SAC)
            .attr("xmlns", NS_INVOICE)
            .child(extensions(document, perception.as_ref()))
            .child(cbc("UBLVersionID").text("2.1"))
            .child(
                cbc("CustomizationID")
                    .attr("schemeAgencyName", AGENCY_SUNAT)
                    .text("2.0"),
            )
            .child(
                cbc("ProfileID")
                    .attr("schemeName", "Tipo de Operacion")
                    .attr("schemeAgencyName", AGENCY_SUNAT)
                    .attr("schemeURI", CATALOG_51)
                    .text(document.operation_type.as_str()),
            )
            .child(cbc("ID").text(document.document_id()))
            .child(cbc("IssueDate").text(document.issue_date.format("%Y-%m-%d").to_string()))
            .child(cbc("IssueTime").text(document.issue_time.format("%H:%M:%S").to_string()))
            .child_opt(
                document
                    .due_date
                    .map(|d| cbc("DueDate").text(d.format("%Y-%m-%d").to_string())),
            )
            .child(
                cbc("InvoiceTypeCode")
                    .attr("listAgencyName", AGENCY_SUNAT)
                    .attr("listName", "Tipo de Documento")
                    .attr("listURI", CATALOG_01)
                    .attr("listID", document.operation_type.as_str())
                    .text(document.document_type.code()),
            )
            .children(document.legends.iter().map(|legend| {
                cbc("Note")
                    .attr("languageLocaleID", legend.code.as_str())
                    .text(legend.description.as_str())
            }))
            .child(
                cbc("DocumentCurrencyCode")
                    .attr("listID", "ISO 4217 Alpha")
                    .attr("listName", "Currency")
                    .attr("listAgencyName", AGENCY_UNECE)
                    .text(currency.code()),
            )
            .child(cbc("LineCountNumeric").text(document.items.len().to_string()))
            .child(self.signature_reference(document))
            .child(cac("AccountingSupplierParty").child(supplier_party(document)))
            .child(cac("AccountingCustomerParty").child(customer_party(document)))
            .children(payment_terms(document))
            .child(document_tax_total(summary, currency))
            .child(
                cac("LegalMonetaryTotal")
                    .child(amount("LineExtensionAmount", summary.line_extension_total, currency))
                    .child(amount("TaxInclusiveAmount", summary.tax_inclusive_total, currency))
                    .child(amount("PayableAmount", document.totals.payable, currency)),
            )
            .children(lines);

        Ok(root)
    }

    fn signature_reference(&self, document: &CanonicalDocument) -> Element {
        cac("Signature")
            .child(cbc("ID").text(document.document_id()))
            .child(
                cac("SignatoryParty")
                    .child(
                        cac("PartyIdentification")
                            .child(cbc("ID").text(document.issuer.ruc.as_str())),
                    )
                    .child(
                        cac("PartyName")
                            .child(cbc("Name").cdata(document.issuer.legal_name.as_str())),
                    ),
            )
            .child(
                cac("DigitalSignatureAttachment").child(
                    cac("ExternalReference")
                        .child(cbc("URI").text(format!("#{}", self.signature_id))),
                ),
            )
    }
}

fn cbc(name: &str) -> Element {
    Element::new(format!("cbc:{name}"))
}

fn cac(name: &str) -> Element {
    Element::new(format!("cac:{name}"))
}

/// Render a monetary amount with exactly two decimals
pub fn format_amount(value: Decimal) -> String {
    round_money(value).to_string()
}

/// Render a quantity without trailing zeros
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

fn amount(name: &str, value: Decimal, currency: Currency) -> Element {
    cbc(name)
        .attr("currencyID", currency.code())
        .text(format_amount(value))
}

fn extensions(document: &CanonicalDocument, perception: Option<&Perception>) -> Element {
    let signature_slot = Element::new("ext:UBLExtension").child(Element::new(SIGNATURE_SLOT));

    let perception_extension = perception.map(|p| {
        let currency = document.currency;
        Element::new("ext:UBLExtension").child(
            Element::new(SIGNATURE_SLOT).child(
                Element::new("sac:SUNATPerception")
                    .child(Element::new("sac:SUNATPerceptionSystemCode").text(p.regime.as_str()))
                    .child(
                        Element::new("sac:SUNATPerceptionPercent")
                            .text(format_amount(p.percent)),
                    )
                    .child(sac_amount("TotalInvoiceAmount", p.base, currency))
                    .child(sac_amount("SUNATPerceptionAmount", p.amount, currency))
                    .child(
                        Element::new("sac:SUNATPerceptionDate")
                            .text(document.issue_date.format("%Y-%m-%d").to_string()),
                    )
                    .child(sac_amount("SUNATNetTotalCashed", p.net_total, currency)),
            ),
        )
    });

    Element::new("ext:UBLExtensions")
        .child(signature_slot)
        .child_opt(perception_extension)
}

fn sac_amount(name: &str, value: Decimal, currency: Currency) -> Element {
    Element::new(format!("sac:{name}"))
        .attr("currencyID", currency.code())
        .text(format_amount(value))
}

fn identity(tag: &str, scheme_name: &str, scheme_id: &str, value: &str) -> Element {
    cbc(tag)
        .attr("schemeID", scheme_id)
        .attr("schemeName", scheme_name)
        .attr("schemeAgencyName", AGENCY_SUNAT)
        .attr("schemeURI", CATALOG_06)
        .text(value)
}

fn registration_address(address: &Address) -> Element {
    cac("RegistrationAddress")
        .child(
            cbc("ID")
                .attr("schemeName", "Ubigeos")
                .attr("schemeAgencyName", "PE:INEI")
                .text(address.ubigeo.as_str()),
        )
        .child(
            cbc("AddressTypeCode")
                .attr("listAgencyName", AGENCY_SUNAT)
                .attr("listName", "Establecimientos anexos")
                .text("0000"),
        )
        .child(cbc("CityName").cdata(address.province.as_str()))
        .child(cbc("CountrySubentity").cdata(address.department.as_str()))
        .child(cbc("District").cdata(address.district.as_str()))
        .child(cac("AddressLine").child(cbc("Line").cdata(address.line.as_str())))
        .child(
            cac("Country").child(
                cbc("IdentificationCode")
                    .attr("listID", "ISO 3166-1")
                    .attr("listAgencyName", AGENCY_UNECE)
                    .attr("listName", "Country")
                    .text(address.country_code.as_str()),
            ),
        )
}

fn party(
    scheme_id: &str,
    document_number: &str,
    name: &str,
    trade_name: &str,
    address: &Address,
) -> Element {
    let display_name = if trade_name.is_empty() { name } else { trade_name };
    cac("Party")
        .child(cac("PartyIdentification").child(identity(
            "ID",
            "Documento de Identidad",
            scheme_id,
            document_number,
        )))
        .child(cac("PartyName").child(cbc("Name").cdata(display_name)))
        .child(
            cac("PartyTaxScheme")
                .child(cbc("RegistrationName").cdata(name))
                .child(identity(
                    "CompanyID",
                    "SUNAT:Identificador de Documento de Identidad",
                    scheme_id,
                    document_number,
                ))
                .child(cac("TaxScheme").child(identity(
                    "ID",
                    "SUNAT:Identificador de Documento de Identidad",
                    scheme_id,
                    document_number,
                ))),
        )
        .child(
            cac("PartyLegalEntity")
                .child(cbc("RegistrationName").cdata(name))
                .child(registration_address(address)),
        )
}

fn supplier_party(document: &CanonicalDocument) -> Element {
    let issuer = &document.issuer;
    party(
        "6",
        &issuer.ruc,
        &issuer.legal_name,
        &issuer.trade_name,
        &issuer.address,
    )
    .child(
        cac("Contact")
            .child(cbc("ElectronicMail").text(issuer.email.as_deref().unwrap_or_default())),
    )
}

fn customer_party(document: &CanonicalDocument) -> Element {
    let buyer = &document.buyer;
    party(
        &buyer.document_type,
        &buyer.document_number,
        &buyer.legal_name,
        "",
        &buyer.address,
    )
    .child(
        cac("Contact")
            .child(cbc("ElectronicMail").text(buyer.email.as_deref().unwrap_or_default())),
    )
}

fn payment_terms(document: &CanonicalDocument) -> Vec<Element> {
    let Some(payment) = &document.payment else {
        return Vec::new();
    };
    let currency = document.currency;

    let mut terms = vec![cac("PaymentTerms")
        .child(cbc("ID").text("FormaPago"))
        .child(cbc("PaymentMeansID").text(payment.method.as_str()))
        .child(amount("Amount", document.totals.payable, currency))];

    if payment.method == PaymentMethod::Credit {
        terms.extend(payment.installments.iter().map(|installment| {
            cac("PaymentTerms")
                .child(cbc("ID").text("FormaPago"))
                .child(cbc("PaymentMeansID").text(installment.number.as_str()))
                .child(amount("Amount", installment.amount, currency))
                .child(
                    cbc("PaymentDueDate")
                        .text(installment.due_date.format("%Y-%m-%d").to_string()),
                )
        }));
    }

    terms
}

fn tax_category(category: &TaxCategory, code: Option<&str>) -> Element {
    cac("TaxCategory")
        .child(
            cbc("ID")
                .attr("schemeID", "UN/ECE 5305")
                .attr("schemeName", "Tax Category Identifier")
                .attr("schemeAgencyName", AGENCY_UNECE)
                .text(category.category_id),
        )
        .child_opt(code.map(|_| cbc("Percent").text(format_amount(category.percent()))))
        .child_opt(code.map(|code| {
            cbc("TaxExemptionReasonCode")
                .attr("listAgencyName", AGENCY_SUNAT)
                .attr("listName", "Afectacion del IGV")
                .attr("listURI", CATALOG_07)
                .text(code)
        }))
        .child(
            cac("TaxScheme")
                .child(
                    cbc("ID")
                        .attr("schemeID", "UN/ECE 5153")
                        .attr("schemeAgencyName", AGENCY_SUNAT)
                        .text(category.scheme_id),
                )
                .child(cbc("Name").text(category.scheme_name))
                .child(cbc("TaxTypeCode").text(category.type_code)),
        )
}

fn document_tax_total(summary: &TaxSummary, currency: Currency) -> Element {
    cac("TaxTotal")
        .child(amount("TaxAmount", summary.total_tax, currency))
        .children(summary.buckets.iter().map(|bucket| {
            cac("TaxSubtotal")
                .child(amount("TaxableAmount", bucket.base, currency))
                .child(amount("TaxAmount", bucket.tax, currency))
                .child(tax_category(bucket.category, None))
        }))
}

fn invoice_line(number: usize, item: &LineItem, currency: Currency) -> Result<Element> {
    let category = match classify_code(&item.affectation_code) {
        Classification::Classified(category) => category,
        Classification::UnknownCode(code) => {
            return Err(CpeError::DocumentBuild(format!(
                "line {number} has unknown affectation code '{code}'"
            )))
        }
    };

    // Free transfers carry their unit value as the reference price and sell at zero.
    let (reference_price, price) = if item.is_free_transfer() {
        (item.unit_value, Decimal::ZERO)
    } else {
        (item.unit_price, item.unit_value)
    };

    Ok(cac("InvoiceLine")
        .child(cbc("ID").text(number.to_string()))
        .child(
            cbc("InvoicedQuantity")
                .attr("unitCode", item.unit_code.as_str())
                .attr("unitCodeListID", "UN/ECE rec 20")
                .attr("unitCodeListAgencyName", AGENCY_UNECE)
                .text(format_quantity(item.quantity)),
        )
        .child(amount("LineExtensionAmount", item.line_total, currency))
        .child(
            cac("PricingReference").child(
                cac("AlternativeConditionPrice")
                    .child(amount("PriceAmount", reference_price, currency))
                    .child(
                        cbc("PriceTypeCode")
                            .attr("listName", "Tipo de Precio")
                            .attr("listAgencyName", AGENCY_SUNAT)
                            .attr("listURI", CATALOG_16)
                            .text(item.price_type()),
                    ),
            ),
        )
        .child(
            cac("TaxTotal")
                .child(amount("TaxAmount", item.tax_amount, currency))
                .child(
                    cac("TaxSubtotal")
                        .child(amount("TaxableAmount", item.line_total, currency))
                        .child(amount("TaxAmount", item.tax_amount, currency))
                        .child(tax_category(category, Some(&item.affectation_code))),
                ),
        )
        .child(
            cac("Item")
                .child(cbc("Description").cdata(item.description.as_str()))
                .child(
                    cac("SellersItemIdentification")
                        .child(cbc("ID").text(item.product_code.as_str())),
                )
                .child(
                    cac("CommodityClassification").child(
                        cbc("ItemClassificationCode")
                            .attr("listID", "UNSPSC")
                            .attr("listAgencyName", "GS1 US")
                            .attr("listName", "Item Classification")
                            .text(item.classification.as_deref().unwrap_or_default()),
                    ),
                ),
        )
        .child(cac("Price").child(amount("PriceAmount", price, currency))))
}
