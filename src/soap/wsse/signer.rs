use crate::crypto::{self, KeyMaterial};
use crate::soap::envelope::{self, EnvelopeTemplate, Slot};
use crate::soap::wsse::{
    BODY_INCLUSIVE_PREFIXES, CanonicalizationContext, SIGNED_INFO_INCLUSIVE_PREFIXES, c14n,
};
use crate::soap::{Element, Error, Result, XmlConfig, prefix};

/// A signed document ready for the transport
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub xml: String,
    pub body_id: String,
    pub digest_value: String,
    pub signature_value: String,
}

/// Wrap `payload` in a new envelope and sign it.
pub fn sign_envelope(payload: Element, key: &KeyMaterial) -> Result<SignedEnvelope> {
    let template = EnvelopeTemplate::new(payload, key.certificate());
    sign_template(&template, key)
}

/// Sign an assembled envelope.
///
/// The body digest has to be inside `SignedInfo` before `SignedInfo` is
/// canonicalized, so the two passes cannot be reordered.
pub fn sign_template(template: &EnvelopeTemplate, key: &KeyMaterial) -> Result<SignedEnvelope> {
    let config = XmlConfig::default();

    // Work on a re-parsed copy so both passes see exactly what is sent
    let stable = Element::parse(&template.document().to_xml(&config)?)?;

    let body = stable
        .find_by_id(template.body_id())
        .ok_or_else(|| Error::MissingElement(format!("Body with Id '{}'", template.body_id())))?;
    let body_c14n = c14n::canonicalize(&CanonicalizationContext::new(
        body,
        BODY_INCLUSIVE_PREFIXES,
    ))?;
    let digest_value = crypto::digest(body_c14n.as_bytes())?;
    let digested = envelope::fill(&stable, Slot::DigestValue, &digest_value)?;

    let signed_info = digested
        .find_scoped(|e| e.prefix() == Some(prefix::DS) && e.local_name() == "SignedInfo")
        .ok_or_else(|| Error::MissingElement("ds:SignedInfo".into()))?;
    let signed_info_c14n = c14n::canonicalize(&CanonicalizationContext::new(
        signed_info,
        SIGNED_INFO_INCLUSIVE_PREFIXES,
    ))?;
    let signature_value = crypto::sign(signed_info_c14n.as_bytes(), key.private_key())?;
    let signed = envelope::fill(&digested, Slot::SignatureValue, &signature_value)?;

    tracing::debug!(
        body_id = template.body_id(),
        digest = %digest_value,
        "Signed SOAP envelope"
    );

    Ok(SignedEnvelope {
        xml: signed.to_xml(&config)?,
        body_id: template.body_id().to_owned(),
        digest_value,
        signature_value,
    })
}
