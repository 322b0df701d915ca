//! The fixed WS-Security envelope skeleton and its insertion points.
//!
//! Only the body payload and the body id vary between messages. The digest
//! and signature slots start empty and are filled into fresh copies of the
//! document, so a template can be signed any number of times.

use crate::crypto::SignerCertificate;
use crate::soap::wsse::{BODY_INCLUSIVE_PREFIXES, SIGNED_INFO_INCLUSIVE_PREFIXES, algorithms};
use crate::soap::{Element, Error, Result, XmlNode, ns, prefix};

/// Named insertion points of the envelope skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    DigestValue,
    SignatureValue,
}

impl Slot {
    pub fn local_name(self) -> &'static str {
        match self {
            Slot::DigestValue => "DigestValue",
            Slot::SignatureValue => "SignatureValue",
        }
    }

    fn matches(self, element: &Element) -> bool {
        element.prefix() == Some(prefix::DS) && element.local_name() == self.local_name()
    }
}

/// An unsigned envelope: header skeleton with empty slots and the wrapped payload
#[derive(Debug, Clone)]
pub struct EnvelopeTemplate {
    document: Element,
    body_id: String,
}

impl EnvelopeTemplate {
    /// Wrap `payload` with a freshly generated body id
    pub fn new(payload: Element, signer: &SignerCertificate) -> Self {
        let body_id = format!("Body-{}", uuid::Uuid::new_v4());
        Self::with_body_id(payload, signer, body_id)
    }

    pub fn with_body_id(
        payload: Element,
        signer: &SignerCertificate,
        body_id: impl Into<String>,
    ) -> Self {
        let body_id = body_id.into();
        let document = Element::new(qualified(prefix::SOAP, "Envelope"))
            .with_ns(prefix::SOAP, ns::SOAP_ENV)
            .with_ns(prefix::WSSE, ns::WSSE)
            .with_ns(prefix::WSU, ns::WSU)
            .with_ns(prefix::DS, ns::DS)
            .with_ns(prefix::ONECLICK, ns::ONECLICK)
            .with_child(
                Element::new(qualified(prefix::SOAP, "Header"))
                    .with_child(security_header(&body_id, signer)),
            )
            .with_child(
                Element::new(qualified(prefix::SOAP, "Body"))
                    .with_attr(qualified(prefix::WSU, "Id"), body_id.as_str())
                    .with_child(payload),
            );

        Self { document, body_id }
    }

    pub fn document(&self) -> &Element {
        &self.document
    }

    /// The id carried by `soap:Body` and referenced from `ds:Reference`
    pub fn body_id(&self) -> &str {
        &self.body_id
    }
}

/// Copy `document` with the text of `slot` set to `value`.
pub fn fill(document: &Element, slot: Slot, value: &str) -> Result<Element> {
    let mut filled = document.clone();
    let target = filled
        .find_mut(&|e: &Element| slot.matches(e))
        .ok_or_else(|| Error::MissingElement(qualified(prefix::DS, slot.local_name())))?;
    target.children.clear();
    target.children.push(XmlNode::Text(value.to_owned()));
    Ok(filled)
}

fn security_header(body_id: &str, signer: &SignerCertificate) -> Element {
    let ds = |local: &str| Element::new(qualified(prefix::DS, local));

    let signed_info = ds("SignedInfo")
        .with_child(
            ds("CanonicalizationMethod")
                .with_attr("Algorithm", algorithms::EXCLUSIVE_C14N)
                .with_child(inclusive_namespaces(SIGNED_INFO_INCLUSIVE_PREFIXES)),
        )
        .with_child(ds("SignatureMethod").with_attr("Algorithm", algorithms::RSA_SHA1))
        .with_child(
            ds("Reference")
                .with_attr("URI", format!("#{body_id}"))
                .with_child(
                    ds("Transforms").with_child(
                        ds("Transform")
                            .with_attr("Algorithm", algorithms::EXCLUSIVE_C14N)
                            .with_child(inclusive_namespaces(BODY_INCLUSIVE_PREFIXES)),
                    ),
                )
                .with_child(ds("DigestMethod").with_attr("Algorithm", algorithms::SHA1))
                .with_child(ds(Slot::DigestValue.local_name())),
        );

    let key_info = ds("KeyInfo").with_child(
        Element::new(qualified(prefix::WSSE, "SecurityTokenReference")).with_child(
            ds("X509Data").with_child(
                ds("X509IssuerSerial")
                    .with_child(ds("X509IssuerName").with_text(signer.issuer()))
                    .with_child(ds("X509SerialNumber").with_text(signer.serial_number())),
            ),
        ),
    );

    Element::new(qualified(prefix::WSSE, "Security"))
        .with_attr(qualified(prefix::SOAP, "mustUnderstand"), "1")
        .with_child(
            ds("Signature")
                .with_child(signed_info)
                .with_child(ds(Slot::SignatureValue.local_name()))
                .with_child(key_info),
        )
}

fn inclusive_namespaces(prefixes: &[&str]) -> Element {
    Element::new(qualified(prefix::EC, "InclusiveNamespaces"))
        .with_ns(prefix::EC, ns::EC)
        .with_attr("PrefixList", prefixes.join(" "))
}

fn qualified(prefix: &str, local: &str) -> String {
    format!("{prefix}:{local}")
}
