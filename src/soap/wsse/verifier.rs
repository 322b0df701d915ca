use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::crypto::HashAlg;
use crate::soap::wsse::{CanonicalizationContext, algorithms, c14n};
use crate::soap::{Element, Result, Scoped, ns};

/// Whether a response may be handed to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The envelope body matches the digest the response asserts
    Trusted,
    /// The envelope body is a SOAP fault; only the fault may be read
    Fault,
    Untrusted,
}

impl Verification {
    pub fn is_trusted(self) -> bool {
        matches!(self, Verification::Trusted | Verification::Fault)
    }
}

/// The single `Body` directly under the SOAP `Envelope` root, with the
/// root's declarations in scope.
///
/// Verification and translation both go through this, so the element that
/// is digested is the element that is read.
pub fn envelope_body(document: &Element) -> Option<Scoped<'_>> {
    if !is_soap_element(document, document, "Envelope") {
        return None;
    }
    let mut bodies = document
        .elements()
        .filter(|e| is_soap_element(e, document, "Body"));
    let body = bodies.next()?;
    if bodies.next().is_some() {
        return None;
    }

    let mut inherited = BTreeMap::new();
    document.declare_into(&mut inherited);
    Some(Scoped {
        element: body,
        inherited,
    })
}

/// The `Fault` element directly under the envelope body, if any
pub fn body_fault(body: &Element) -> Option<&Element> {
    body.child("Fault")
}

/// Check the body digest asserted by a response.
///
/// A SOAP fault carries no signature and comes back as `Fault`. Otherwise
/// the single reference in `Header/Security/Signature/SignedInfo` must
/// point at the envelope body, which is canonicalized with the prefix list
/// the response itself declares. Its digest must equal the asserted one.
/// Only malformed markup is an error; every failed check is `Untrusted`.
pub fn verify_response(document: &Element) -> Result<Verification> {
    let Some(body) = envelope_body(document) else {
        tracing::warn!("Response has no single SOAP body under the envelope");
        return Ok(Verification::Untrusted);
    };

    if body_fault(body.element).is_some() {
        tracing::debug!("Response is a SOAP fault, skipping digest check");
        return Ok(Verification::Fault);
    }

    let Some(reference) = signature_reference(document) else {
        tracing::warn!("Response carries no single signature reference");
        return Ok(Verification::Untrusted);
    };

    let digest_method = reference
        .child("DigestMethod")
        .and_then(|e| e.attribute("Algorithm"));
    let Some(hash_alg) = digest_method.and_then(digest_algorithm) else {
        tracing::warn!(?digest_method, "Unsupported digest method in response");
        return Ok(Verification::Untrusted);
    };

    let asserted: String = reference
        .child("DigestValue")
        .map(|e| e.text().split_whitespace().collect())
        .unwrap_or_default();
    if asserted.is_empty() {
        tracing::warn!("Response carries an empty digest value");
        return Ok(Verification::Untrusted);
    }
    let Ok(asserted) = BASE64.decode(&asserted) else {
        tracing::warn!("Response digest value is not valid base64");
        return Ok(Verification::Untrusted);
    };

    // No URI means the body; otherwise it has to name the body's own Id
    let uri = reference.attribute("URI");
    if let Some(uri) = uri {
        let body_id = body.element.attribute_local("Id");
        let target = uri.strip_prefix('#');
        if target.is_none() || target != body_id {
            tracing::warn!(uri, ?body_id, "Signature reference does not point at the body");
            return Ok(Verification::Untrusted);
        }
    }

    let prefix_list = reference
        .find("InclusiveNamespaces")
        .and_then(|e| e.attribute("PrefixList"))
        .unwrap_or_default();
    let prefixes: Vec<&str> = prefix_list.split_whitespace().collect();

    let canonical = c14n::canonicalize(&CanonicalizationContext::new(body, &prefixes))?;
    let computed = hash_alg.hash(canonical.as_bytes())?;

    if computed == asserted {
        Ok(Verification::Trusted)
    } else {
        tracing::warn!(%hash_alg, "Response digest mismatch");
        Ok(Verification::Untrusted)
    }
}

/// The one `ds:Reference` of the security header's `SignedInfo`
fn signature_reference(document: &Element) -> Option<&Element> {
    let signed_info = document
        .elements()
        .find(|e| is_soap_element(e, document, "Header"))?
        .child("Security")?
        .child("Signature")?
        .child("SignedInfo")?;

    let mut references = signed_info
        .elements()
        .filter(|e| e.local_name() == "Reference");
    let reference = references.next()?;
    references.next().is_none().then_some(reference)
}

fn digest_algorithm(uri: &str) -> Option<HashAlg> {
    match uri {
        algorithms::SHA1 => Some(HashAlg::Sha1),
        algorithms::SHA256 => Some(HashAlg::Sha256),
        _ => None,
    }
}

/// `element` is `local_name` in the SOAP envelope namespace. Only the root
/// and its direct children are checked, so declarations on `element` and
/// `root` are the whole scope.
fn is_soap_element(element: &Element, root: &Element, local_name: &str) -> bool {
    let prefix = element.prefix().unwrap_or_default();
    let uri = element.declared(prefix).or_else(|| root.declared(prefix));
    element.local_name() == local_name && uri == Some(ns::SOAP_ENV)
}
