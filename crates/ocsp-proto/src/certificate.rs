//! X.509 certificate handling for CertID hashing and expiry checks

use crate::error::{OcspError, OcspResult};
use crate::request::{CertId, HashAlgorithm};
use crate::serial::SerialNumber;
use chrono::{DateTime, TimeZone, Utc};
use x509_parser::prelude::*;

/// The parts of a certificate the responder works with
///
/// Owns the DER so it can live for the process lifetime without borrowing
/// from a parse buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    der: Vec<u8>,
    subject: Vec<u8>,
    public_key: Vec<u8>,
    common_name: Option<String>,
    serial_number: SerialNumber,
    not_after: DateTime<Utc>,
}

impl CertificateInfo {
    /// Parse a DER-encoded certificate
    pub fn from_der(der: Vec<u8>) -> OcspResult<Self> {
        let (subject, public_key, common_name, serial_number, not_after) = {
            let (_, cert) = parse_x509_certificate(&der).map_err(|e| {
                OcspError::CertificateError(format!("Failed to parse certificate: {}", e))
            })?;

            let common_name = cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .map(str::to_string);
            let not_after_secs = cert.validity().not_after.timestamp();
            let not_after = Utc.timestamp_opt(not_after_secs, 0).single().ok_or_else(|| {
                OcspError::CertificateError(format!("notAfter out of range: {}", not_after_secs))
            })?;

            (
                cert.subject().as_raw().to_vec(),
                cert.public_key().subject_public_key.data.to_vec(),
                common_name,
                SerialNumber::from_bytes_be(cert.raw_serial()),
                not_after,
            )
        };

        Ok(Self {
            der,
            subject,
            public_key,
            common_name,
            serial_number,
            not_after,
        })
    }

    /// Parse the first CERTIFICATE block of PEM data
    pub fn from_pem(pem_data: &[u8]) -> OcspResult<Self> {
        Self::from_der(pem_to_der(pem_data)?)
    }

    /// Full DER encoding
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DER encoding of the subject Name
    pub fn subject_der(&self) -> &[u8] {
        &self.subject
    }

    /// Contents of the subjectPublicKey BIT STRING
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// First subject common name, if any
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial_number
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether the certificate's validity period ended before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after < now
    }

    /// Hash of this certificate's subject name, as used in a CertID it issued
    pub fn name_hash(&self, algorithm: HashAlgorithm) -> Vec<u8> {
        algorithm.digest(&self.subject)
    }

    /// Hash of this certificate's public key, as used in a CertID it issued
    pub fn key_hash(&self, algorithm: HashAlgorithm) -> Vec<u8> {
        algorithm.digest(&self.public_key)
    }

    /// CertID for `serial_number` issued by this certificate
    pub fn cert_id(&self, serial_number: SerialNumber, hash_algorithm: HashAlgorithm) -> CertId {
        CertId {
            hash_algorithm,
            issuer_name_hash: self.name_hash(hash_algorithm),
            issuer_key_hash: self.key_hash(hash_algorithm),
            serial_number,
        }
    }
}

/// Extract the DER contents of the first CERTIFICATE PEM block
pub fn pem_to_der(pem_data: &[u8]) -> OcspResult<Vec<u8>> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem_data)
        .map_err(|e| OcspError::CertificateError(format!("Failed to decode PEM data: {}", e)))?;

    if pem.label != "CERTIFICATE" {
        return Err(OcspError::CertificateError(format!(
            "Unexpected PEM block '{}', expected CERTIFICATE",
            pem.label
        )));
    }

    Ok(pem.contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CA_PEM: &[u8] = include_bytes!("../../../testdata/ca.pem");
    const CA_DER: &[u8] = include_bytes!("../../../testdata/ca.der");
    const GOOD_PEM: &[u8] = include_bytes!("../../../testdata/good-cert.pem");
    const EXPIRED_PEM: &[u8] = include_bytes!("../../../testdata/expired-cert.pem");

    #[test]
    fn test_pem_and_der_agree() {
        let from_pem = CertificateInfo::from_pem(CA_PEM).unwrap();
        let from_der = CertificateInfo::from_der(CA_DER.to_vec()).unwrap();
        assert_eq!(from_pem, from_der);
        assert_eq!(from_pem.common_name(), Some("Test Issuing CA"));
    }

    #[test]
    fn test_leaf_serials() {
        let good = CertificateInfo::from_pem(GOOD_PEM).unwrap();
        assert_eq!(good.serial_number(), &SerialNumber::from(101));

        let expired = CertificateInfo::from_pem(EXPIRED_PEM).unwrap();
        assert_eq!(expired.serial_number(), &SerialNumber::from(4095));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(CertificateInfo::from_pem(EXPIRED_PEM).unwrap().is_expired_at(now));
        assert!(!CertificateInfo::from_pem(GOOD_PEM).unwrap().is_expired_at(now));
    }

    #[test]
    fn test_rejects_non_certificate_pem() {
        let key_pem = include_bytes!("../../../testdata/responder-key.pem");
        assert!(matches!(
            pem_to_der(key_pem),
            Err(OcspError::CertificateError(_))
        ));
        assert!(CertificateInfo::from_pem(b"garbage").is_err());
        assert!(CertificateInfo::from_der(b"garbage".to_vec()).is_err());
    }
}
