mod c14n;
mod signer;
mod verifier;

pub use c14n::{CanonicalizationContext, canonicalize, canonicalize_str};
pub use signer::{SignedEnvelope, sign_envelope, sign_template};
pub use verifier::{Verification, body_fault, envelope_body, verify_response};

// Algorithm URIs required by the remote service
pub mod algorithms {
    // Digest algorithms
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

    // Signature algorithms
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";

    // Canonicalization algorithms
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
}

/// Prefixes declared inclusively when canonicalizing the referenced body
pub const BODY_INCLUSIVE_PREFIXES: &[&str] = &["soap", "ns1"];

/// Prefixes declared inclusively when canonicalizing `ds:SignedInfo`
pub const SIGNED_INFO_INCLUSIVE_PREFIXES: &[&str] = &["soap", "wsse"];
