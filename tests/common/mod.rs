#![allow(dead_code)]

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509NameBuilder};

use oneclick_wsse::crypto::{Credentials, KeyMaterial};
use oneclick_wsse::soap::Element;
use oneclick_wsse::soap::wsse::sign_envelope;

/// A PEM private key and the DER certificate it signs for
pub struct TestIdentity {
    pub key_pem: Vec<u8>,
    pub cert_der: Vec<u8>,
}

impl TestIdentity {
    pub fn generate(common_name: &str, serial: u32) -> Self {
        let rsa = Rsa::generate(2048).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("C", "CL").unwrap();
        name.append_entry_by_text("CN", common_name).unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = Asn1Integer::from_bn(&BigNum::from_u32(serial).unwrap()).unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();

        Self {
            key_pem: pkey.private_key_to_pem_pkcs8().unwrap(),
            cert_der: builder.build().to_der().unwrap(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.key_pem.clone(), self.cert_der.clone())
    }

    pub fn key_material(&self) -> KeyMaterial {
        KeyMaterial::from_bytes(&self.key_pem, &self.cert_der).unwrap()
    }
}

/// A response document signed the way the service signs its answers
pub fn signed_response(server: &TestIdentity, payload: Element) -> String {
    sign_envelope(payload, &server.key_material()).unwrap().xml
}

/// `<ns1:<name>><return>…</return></ns1:<name>>` with one child per field
pub fn response_payload(name: &str, fields: &[(&str, &str)]) -> Element {
    let ret = fields.iter().fold(Element::new("return"), |ret, (key, value)| {
        ret.with_child(Element::new(*key).with_text(*value))
    });
    Element::new(format!("ns1:{name}")).with_child(ret)
}

pub fn boolean_payload(name: &str, value: bool) -> Element {
    Element::new(format!("ns1:{name}"))
        .with_child(Element::new("return").with_text(value.to_string()))
}
