mod errors;
mod keys;
pub mod rsa;

pub use errors::Error;
pub use keys::{Credentials, KeyMaterial, SignerCertificate};

#[cfg(test)]
pub(crate) use keys::test_support;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use errors::CryptoResult;
use openssl::hash::{Hasher, MessageDigest as Digest};
use std::fmt;

/// Hash algorithms used by the XML signature layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
}

impl HashAlg {
    /// Hash the given data with this hash algorithm
    pub fn hash(&self, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        let mut hasher = Hasher::new(self.into())?;
        hasher.update(data.as_ref())?;
        Ok(hasher.finish()?.to_vec())
    }
}

impl From<&HashAlg> for Digest {
    fn from(hash_alg: &HashAlg) -> Self {
        match hash_alg {
            HashAlg::Sha1 => Digest::sha1(),
            HashAlg::Sha256 => Digest::sha256(),
        }
    }
}

impl From<HashAlg> for Digest {
    fn from(hash_alg: HashAlg) -> Self {
        (&hash_alg).into()
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlg::Sha1 => "SHA-1",
            HashAlg::Sha256 => "SHA-256",
        };
        write!(f, "{name}")
    }
}

/// SHA-1 digest of `data`, base64 encoded as carried in `ds:DigestValue`.
pub fn digest(data: impl AsRef<[u8]>) -> CryptoResult<String> {
    Ok(BASE64.encode(HashAlg::Sha1.hash(data)?))
}

/// RSA-SHA1 signature of `data`, base64 encoded as carried in `ds:SignatureValue`.
pub fn sign(data: impl AsRef<[u8]>, private_key: &rsa::RsaPrivateKey) -> CryptoResult<String> {
    let signature = rsa::sign(private_key, data, HashAlg::Sha1)?;
    Ok(BASE64.encode(signature.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_data() {
        let data = b"test_data";

        assert_eq!(HashAlg::Sha1.hash(data).unwrap().len(), 20);
        assert_eq!(HashAlg::Sha256.hash(data).unwrap().len(), 32);
    }

    #[test]
    fn test_digest_known_value() {
        // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        assert_eq!(digest("abc").unwrap(), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
        assert_eq!(digest("").unwrap(), "2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
    }

    #[test]
    fn test_sign_is_deterministic_and_verifiable() {
        let key = rsa::RsaPrivateKey::generate(rsa::RsaKeySize::Rsa2048).unwrap();
        let first = sign(b"payload", &key).unwrap();
        let second = sign(b"payload", &key).unwrap();
        // PKCS#1 v1.5 has no randomness
        assert_eq!(first, second);

        let raw = BASE64.decode(&first).unwrap();
        let sig = rsa::RsaSignature::new(key.key_size(), raw);
        let public_key = key.public_key().unwrap();
        assert!(rsa::verify(&public_key, b"payload", &sig, HashAlg::Sha1).unwrap());
        assert!(!rsa::verify(&public_key, b"payl0ad", &sig, HashAlg::Sha1).unwrap());
    }
}
