//! Responder signing identity
//!
//! The certificate and RSA key this service signs every OCSP response with.
//! Loaded once at startup and shared read-only afterwards.

use crate::certificate::CertificateInfo;
use crate::der::{der_explicit_context, der_null, der_oid, der_sequence};
use crate::error::{OcspError, OcspResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;

/// sha256WithRSAEncryption (1.2.840.113549.1.1.11)
const SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];

/// Signing certificate plus private key
pub struct ResponderIdentity {
    certificate: CertificateInfo,
    signing_key: SigningKey<Sha256>,
    verifying_key: VerifyingKey<Sha256>,
}

impl ResponderIdentity {
    /// Build an identity from a parsed certificate and an RSA key
    ///
    /// Fails with [`OcspError::KeyMismatch`] when the key is not the one
    /// certified by `certificate`.
    pub fn new(certificate: CertificateInfo, private_key: RsaPrivateKey) -> OcspResult<Self> {
        let public_key = RsaPublicKey::from(&private_key);
        let public_key_der = public_key
            .to_pkcs1_der()
            .map_err(|e| OcspError::KeyError(format!("Failed to encode public key: {}", e)))?;
        if public_key_der.as_bytes() != certificate.public_key() {
            return Err(OcspError::KeyMismatch);
        }

        Ok(Self {
            certificate,
            verifying_key: VerifyingKey::new(public_key),
            signing_key: SigningKey::new(private_key),
        })
    }

    /// Load from a PEM certificate and a PEM RSA key (PKCS#1 or PKCS#8)
    pub fn from_pem(certificate_pem: &[u8], key_pem: &str) -> OcspResult<Self> {
        let certificate = CertificateInfo::from_pem(certificate_pem)?;
        Self::new(certificate, parse_private_key(key_pem)?)
    }

    pub fn certificate(&self) -> &CertificateInfo {
        &self.certificate
    }

    /// ResponderID byName: `[1] EXPLICIT Name`
    pub fn responder_id(&self) -> Vec<u8> {
        der_explicit_context(1, self.certificate.subject_der())
    }

    /// AlgorithmIdentifier of the signatures produced by [`Self::sign`]
    pub fn signature_algorithm(&self) -> Vec<u8> {
        let mut content = der_oid(SHA256_WITH_RSA);
        content.extend_from_slice(&der_null());
        der_sequence(&content)
    }

    /// RSASSA-PKCS1-v1_5 with SHA-256 over `data`
    pub fn sign(&self, data: &[u8]) -> OcspResult<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| OcspError::SigningError(e.to_string()))?;
        Ok(signature.to_vec())
    }

    /// Verification half of the signing key
    pub fn verifying_key(&self) -> &VerifyingKey<Sha256> {
        &self.verifying_key
    }
}

impl fmt::Debug for ResponderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponderIdentity")
            .field("subject", &self.certificate.common_name())
            .finish_non_exhaustive()
    }
}

/// Parse an RSA private key, PKCS#1 (`RSA PRIVATE KEY`) first, then PKCS#8
pub fn parse_private_key(key_pem: &str) -> OcspResult<RsaPrivateKey> {
    match RsaPrivateKey::from_pkcs1_pem(key_pem) {
        Ok(key) => Ok(key),
        Err(pkcs1_err) => RsaPrivateKey::from_pkcs8_pem(key_pem).map_err(|pkcs8_err| {
            OcspError::KeyError(format!(
                "not a PKCS#1 ({}) or PKCS#8 ({}) RSA key",
                pkcs1_err, pkcs8_err
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::signature::Verifier;

    const RESPONDER_PEM: &[u8] = include_bytes!("../../../testdata/responder.pem");
    const RESPONDER_KEY: &str = include_str!("../../../testdata/responder-key.pem");
    const CA_PEM: &[u8] = include_bytes!("../../../testdata/ca.pem");

    #[test]
    fn test_load_pkcs1_identity() {
        let identity = ResponderIdentity::from_pem(RESPONDER_PEM, RESPONDER_KEY).unwrap();
        assert_eq!(identity.certificate().common_name(), Some("Test OCSP Responder"));
    }

    #[test]
    fn test_key_mismatch_rejected() {
        // The CA certificate does not certify the responder key
        let result = ResponderIdentity::from_pem(CA_PEM, RESPONDER_KEY);
        assert!(matches!(result, Err(OcspError::KeyMismatch)));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let result = ResponderIdentity::from_pem(RESPONDER_PEM, "-----BEGIN NOTHING-----");
        assert!(matches!(result, Err(OcspError::KeyError(_))));
    }

    #[test]
    fn test_sign_verifies() {
        let identity = ResponderIdentity::from_pem(RESPONDER_PEM, RESPONDER_KEY).unwrap();
        let signature = identity.sign(b"tbsResponseData").unwrap();
        assert_eq!(signature.len(), 256);

        let signature = rsa::pkcs1v15::Signature::try_from(signature.as_slice()).unwrap();
        assert!(identity
            .verifying_key()
            .verify(b"tbsResponseData", &signature)
            .is_ok());
    }

    #[test]
    fn test_responder_id_by_name() {
        let identity = ResponderIdentity::from_pem(RESPONDER_PEM, RESPONDER_KEY).unwrap();
        let responder_id = identity.responder_id();
        assert_eq!(responder_id[0], 0xA1);
        assert!(responder_id.ends_with(identity.certificate().subject_der()));
    }
}
