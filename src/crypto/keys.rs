use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use openssl::x509::X509;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::crypto::errors::{CryptoResult, Error};
use crate::crypto::rsa::RsaPrivateKey;

const PEM_MARKER: &[u8] = b"-----BEGIN";

fn is_pem(bytes: &[u8]) -> bool {
    bytes
        .windows(PEM_MARKER.len())
        .any(|window| window == PEM_MARKER)
}

/// An X.509 certificate reduced to what the signature header needs
#[derive(Debug, Clone)]
pub struct SignerCertificate {
    der: Vec<u8>,
    issuer: String,
    serial_number: String,
}

impl SignerCertificate {
    /// Parse a DER-encoded certificate
    pub fn from_der(der: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let der_bytes = der.as_ref();
        let (_, cert) = X509Certificate::from_der(der_bytes)?;

        Ok(Self {
            der: der_bytes.to_vec(),
            issuer: cert.issuer().to_string(),
            serial_number: cert.tbs_certificate.serial.to_string(),
        })
    }

    /// Parse a PEM-encoded certificate
    pub fn from_pem(pem: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let cert = X509::from_pem(pem.as_ref())?;
        Self::from_der(cert.to_der()?)
    }

    /// Parse a certificate in either PEM or DER form
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let bytes = bytes.as_ref();
        if is_pem(bytes) {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    /// Issuer distinguished name, as written into `ds:X509IssuerName`
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Decimal serial number, as written into `ds:X509SerialNumber`
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// The signing key and the certificate that identifies it to the remote party
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    private_key: RsaPrivateKey,
    certificate: SignerCertificate,
}

impl KeyMaterial {
    /// Parse key and certificate (each PEM or DER) and check that they belong together.
    pub fn from_bytes(private_key: &[u8], certificate: &[u8]) -> CryptoResult<Self> {
        let private_key = if is_pem(private_key) {
            RsaPrivateKey::from_pem(private_key)?
        } else {
            RsaPrivateKey::from_der(private_key)?
        };
        let certificate = SignerCertificate::from_bytes(certificate)?;
        Self::new(private_key, certificate)
    }

    pub fn new(private_key: RsaPrivateKey, certificate: SignerCertificate) -> CryptoResult<Self> {
        let cert_key = X509::from_der(certificate.der())?.public_key()?;
        if !cert_key.public_eq(private_key.pkey()) {
            return Err(Error::Invalid(
                "Private key does not match the certificate public key".into(),
            ));
        }
        Ok(Self {
            private_key,
            certificate,
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn certificate(&self) -> &SignerCertificate {
        &self.certificate
    }
}

/// Raw key material, parsed on first use and then shared read-only.
///
/// Concurrent first calls may both parse; only one result is kept.
pub struct Credentials {
    private_key: Vec<u8>,
    certificate: Vec<u8>,
    remote_certificate: Option<Vec<u8>>,
    material: OnceLock<KeyMaterial>,
    remote: OnceLock<SignerCertificate>,
}

impl Credentials {
    pub fn new(private_key: impl Into<Vec<u8>>, certificate: impl Into<Vec<u8>>) -> Self {
        Self {
            private_key: private_key.into(),
            certificate: certificate.into(),
            remote_certificate: None,
            material: OnceLock::new(),
            remote: OnceLock::new(),
        }
    }

    /// Attach the remote party's certificate. It is kept for reference only.
    pub fn with_remote_certificate(mut self, certificate: impl Into<Vec<u8>>) -> Self {
        self.remote_certificate = Some(certificate.into());
        self
    }

    /// Read key material from disk. Parsing is deferred to first use.
    pub fn from_files(
        private_key_path: &Path,
        certificate_path: &Path,
        remote_certificate_path: Option<&Path>,
    ) -> CryptoResult<Self> {
        let mut credentials = Self::new(read(private_key_path)?, read(certificate_path)?);
        if let Some(path) = remote_certificate_path {
            credentials.remote_certificate = Some(read(path)?);
        }
        Ok(credentials)
    }

    /// The parsed signing key and certificate
    pub fn key_material(&self) -> CryptoResult<&KeyMaterial> {
        if let Some(material) = self.material.get() {
            return Ok(material);
        }
        let parsed = KeyMaterial::from_bytes(&self.private_key, &self.certificate)?;
        tracing::debug!(
            issuer = parsed.certificate().issuer(),
            serial = parsed.certificate().serial_number(),
            "Loaded signing certificate"
        );
        Ok(self.material.get_or_init(|| parsed))
    }

    /// The parsed remote certificate, if one was configured
    pub fn remote_certificate(&self) -> CryptoResult<Option<&SignerCertificate>> {
        let Some(raw) = &self.remote_certificate else {
            return Ok(None);
        };
        if let Some(cert) = self.remote.get() {
            return Ok(Some(cert));
        }
        let parsed = SignerCertificate::from_bytes(raw)?;
        tracing::debug!(
            issuer = parsed.issuer(),
            serial = parsed.serial_number(),
            "Loaded remote certificate"
        );
        Ok(Some(self.remote.get_or_init(|| parsed)))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("loaded", &self.material.get().is_some())
            .field("remote_certificate", &self.remote_certificate.is_some())
            .finish()
    }
}

fn read(path: &Path) -> CryptoResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::self_signed;
    use super::*;

    #[test]
    fn test_certificate_identity() {
        let (_, der) = self_signed(4242);
        let cert = SignerCertificate::from_der(&der).unwrap();
        assert_eq!(cert.serial_number(), "4242");
        assert!(cert.issuer().contains("CN=597020000547"));
        assert!(cert.issuer().contains("C=CL"));
    }

    #[test]
    fn test_pem_and_der_agree() {
        let (_, der) = self_signed(7);
        let pem = X509::from_der(&der).unwrap().to_pem().unwrap();
        let from_pem = SignerCertificate::from_bytes(&pem).unwrap();
        let from_der = SignerCertificate::from_bytes(&der).unwrap();
        assert_eq!(from_pem.der(), from_der.der());
        assert_eq!(from_pem.issuer(), from_der.issuer());
    }

    #[test]
    fn test_mismatched_key_is_rejected() {
        let (_, der) = self_signed(1);
        let (other_key, _) = self_signed(2);
        let cert = SignerCertificate::from_der(&der).unwrap();
        let result = KeyMaterial::new(other_key, cert);
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_credentials_parse_once() {
        let (key, der) = self_signed(99);
        let credentials = Credentials::new(key.to_pem().unwrap(), der);

        let first = credentials.key_material().unwrap() as *const KeyMaterial;
        let second = credentials.key_material().unwrap() as *const KeyMaterial;
        assert_eq!(first, second);
        assert!(credentials.remote_certificate().unwrap().is_none());
    }

    #[test]
    fn test_credentials_report_bad_key_at_first_use() {
        let (_, der) = self_signed(5);
        let credentials = Credentials::new(b"garbage".to_vec(), der.clone())
            .with_remote_certificate(der);
        assert!(credentials.key_material().is_err());
        assert_eq!(
            credentials.remote_certificate().unwrap().unwrap().serial_number(),
            "5"
        );
    }
}
