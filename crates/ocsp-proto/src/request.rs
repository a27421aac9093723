//! OCSP request decoding and building - RFC 6960 Section 4.1
//!
//! ```asn1
//! OCSPRequest ::= SEQUENCE {
//!     tbsRequest          TBSRequest,
//!     optionalSignature   [0] EXPLICIT Signature OPTIONAL
//! }
//!
//! TBSRequest ::= SEQUENCE {
//!     version             [0] EXPLICIT Version DEFAULT v1,
//!     requestorName       [1] EXPLICIT GeneralName OPTIONAL,
//!     requestList         SEQUENCE OF Request,
//!     requestExtensions   [2] EXPLICIT Extensions OPTIONAL
//! }
//!
//! Request ::= SEQUENCE {
//!     reqCert                     CertID,
//!     singleRequestExtensions     [0] EXPLICIT Extensions OPTIONAL
//! }
//!
//! CertID ::= SEQUENCE {
//!     hashAlgorithm       AlgorithmIdentifier,
//!     issuerNameHash      OCTET STRING,
//!     issuerKeyHash       OCTET STRING,
//!     serialNumber        CertificateSerialNumber
//! }
//! ```
//!
//! Only the first entry of `requestList` is answered. Version, requestor name,
//! extensions and the optional signature are skipped.

use crate::certificate::CertificateInfo;
use crate::der::{der_explicit_context, der_integer, der_null, der_octet_string, der_oid, der_sequence};
use crate::error::{OcspError, OcspResult};
use crate::serial::SerialNumber;
use der_parser::ber::BerObjectContent;
use der_parser::der::DerObject;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// Hash algorithm used to build a CertID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Look up an algorithm by its dotted OID
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.3.14.3.2.26" => Some(Self::Sha1),
            "2.16.840.1.101.3.4.2.1" => Some(Self::Sha256),
            "2.16.840.1.101.3.4.2.2" => Some(Self::Sha384),
            "2.16.840.1.101.3.4.2.3" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// OID arcs for DER encoding
    pub fn oid_components(&self) -> &'static [u64] {
        match self {
            Self::Sha1 => &[1, 3, 14, 3, 2, 26],
            Self::Sha256 => &[2, 16, 840, 1, 101, 3, 4, 2, 1],
            Self::Sha384 => &[2, 16, 840, 1, 101, 3, 4, 2, 2],
            Self::Sha512 => &[2, 16, 840, 1, 101, 3, 4, 2, 3],
        }
    }

    /// AlgorithmIdentifier with NULL parameters
    pub fn algorithm_identifier(&self) -> Vec<u8> {
        let mut content = der_oid(self.oid_components());
        content.extend_from_slice(&der_null());
        der_sequence(&content)
    }

    /// Hash `data` with this algorithm
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}

/// Certificate identifier carried in requests and echoed in responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertId {
    pub hash_algorithm: HashAlgorithm,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial_number: SerialNumber,
}

impl CertId {
    /// DER encoding of the CertID SEQUENCE
    pub fn to_der(&self) -> Vec<u8> {
        let mut cert_id = self.hash_algorithm.algorithm_identifier();
        cert_id.extend_from_slice(&der_octet_string(&self.issuer_name_hash));
        cert_id.extend_from_slice(&der_octet_string(&self.issuer_key_hash));
        cert_id.extend_from_slice(&der_integer(&self.serial_number.to_bytes_be()));
        der_sequence(&cert_id)
    }

    fn from_der_object(object: &DerObject<'_>) -> OcspResult<Self> {
        let fields = object
            .as_sequence()
            .map_err(|_| malformed("CertID is not a SEQUENCE"))?;
        if fields.len() != 4 {
            return Err(malformed(format!("CertID has {} fields, expected 4", fields.len())));
        }

        let algorithm_identifier = fields[0]
            .as_sequence()
            .map_err(|_| malformed("hashAlgorithm is not a SEQUENCE"))?;
        let oid = algorithm_identifier
            .first()
            .ok_or_else(|| malformed("hashAlgorithm is empty"))?
            .as_oid()
            .map_err(|_| malformed("hashAlgorithm has no OID"))?
            .to_id_string();
        let hash_algorithm =
            HashAlgorithm::from_oid(&oid).ok_or(OcspError::UnsupportedHashAlgorithm(oid))?;

        let issuer_name_hash = fields[1]
            .as_slice()
            .map_err(|_| malformed("issuerNameHash is not an OCTET STRING"))?
            .to_vec();
        let issuer_key_hash = fields[2]
            .as_slice()
            .map_err(|_| malformed("issuerKeyHash is not an OCTET STRING"))?
            .to_vec();

        let serial_number = match &fields[3].content {
            BerObjectContent::Integer(bytes) => {
                if bytes.first().is_some_and(|b| b & 0x80 != 0) {
                    return Err(malformed("serialNumber is negative"));
                }
                SerialNumber::from_bytes_be(bytes)
            }
            _ => return Err(malformed("serialNumber is not an INTEGER")),
        };

        Ok(Self {
            hash_algorithm,
            issuer_name_hash,
            issuer_key_hash,
            serial_number,
        })
    }
}

/// Decoded OCSP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspRequest {
    /// Identifier of the certificate whose status is requested
    pub cert_id: CertId,
}

impl OcspRequest {
    /// Decode a DER-encoded OCSPRequest
    pub fn parse(der_bytes: &[u8]) -> OcspResult<Self> {
        let (rest, ocsp_request) = der_parser::parse_der(der_bytes)
            .map_err(|e| malformed(format!("Failed to parse OCSP request: {:?}", e)))?;
        if !rest.is_empty() {
            return Err(malformed("trailing data after OCSPRequest"));
        }

        let ocsp_request = ocsp_request
            .as_sequence()
            .map_err(|_| malformed("OCSPRequest is not a SEQUENCE"))?;
        let tbs_request = ocsp_request
            .first()
            .ok_or_else(|| malformed("OCSPRequest is empty"))?
            .as_sequence()
            .map_err(|_| malformed("tbsRequest is not a SEQUENCE"))?;

        // Tagged optional fields decode as opaque content, so the only
        // universal SEQUENCE in TBSRequest is requestList
        let request_list = tbs_request
            .iter()
            .find_map(|field| field.as_sequence().ok())
            .ok_or_else(|| malformed("tbsRequest has no requestList"))?;

        let request = request_list
            .first()
            .ok_or_else(|| malformed("requestList is empty"))?
            .as_sequence()
            .map_err(|_| malformed("Request is not a SEQUENCE"))?;
        let cert_id = request
            .first()
            .ok_or_else(|| malformed("Request has no reqCert"))?;

        Ok(Self {
            cert_id: CertId::from_der_object(cert_id)?,
        })
    }

    /// Serial number of the queried certificate
    pub fn serial_number(&self) -> &SerialNumber {
        &self.cert_id.serial_number
    }

    /// Hash algorithm the client used for the CertID
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.cert_id.hash_algorithm
    }

    /// Issuer key hash presented by the client
    pub fn issuer_key_hash(&self) -> &[u8] {
        &self.cert_id.issuer_key_hash
    }
}

/// OCSP request builder
///
/// Builds an unsigned single-certificate request. Used by clients and tests;
/// the responder itself only decodes requests.
pub struct OcspRequestBuilder {
    cert_id: CertId,
    nonce: Option<Vec<u8>>,
}

impl OcspRequestBuilder {
    /// Create a SHA-1 request for `serial` issued by `issuer`
    pub fn new(issuer: &CertificateInfo, serial: SerialNumber) -> Self {
        Self {
            cert_id: issuer.cert_id(serial, HashAlgorithm::Sha1),
            nonce: None,
        }
    }

    /// Create a builder for `serial` issued by the DER-encoded `issuer`
    pub fn from_issuer_der(issuer: &[u8], serial: SerialNumber) -> OcspResult<Self> {
        let issuer = CertificateInfo::from_der(issuer.to_vec())?;
        Ok(Self::new(&issuer, serial))
    }

    /// Recompute the CertID hashes with another algorithm
    pub fn hash_algorithm(mut self, issuer: &CertificateInfo, algorithm: HashAlgorithm) -> Self {
        self.cert_id = issuer.cert_id(self.cert_id.serial_number, algorithm);
        self
    }

    /// Override the issuer key hash (for building deliberately mismatched requests)
    pub fn issuer_key_hash(mut self, hash: Vec<u8>) -> Self {
        self.cert_id.issuer_key_hash = hash;
        self
    }

    /// Add a nonce extension
    pub fn with_nonce(mut self, nonce: Vec<u8>) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Build the OCSP request as DER-encoded bytes
    pub fn build(&self) -> Vec<u8> {
        let request = der_sequence(&self.cert_id.to_der());
        let mut tbs = der_sequence(&request);

        if let Some(ref nonce_value) = self.nonce {
            tbs.extend_from_slice(&der_explicit_context(2, &build_nonce_extension(nonce_value)));
        }

        der_sequence(&der_sequence(&tbs))
    }
}

/// Nonce extension (OID 1.3.6.1.5.5.7.48.1.2) wrapped as `Extensions`
fn build_nonce_extension(nonce: &[u8]) -> Vec<u8> {
    let mut ext = der_oid(&[1, 3, 6, 1, 5, 5, 7, 48, 1, 2]);
    ext.extend_from_slice(&der_octet_string(&der_octet_string(nonce)));
    der_sequence(&der_sequence(&ext))
}

fn malformed(message: impl Into<String>) -> OcspError {
    OcspError::MalformedRequest(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CA_DER: &[u8] = include_bytes!("../../../testdata/ca.der");
    const OPENSSL_REQUEST: &[u8] = include_bytes!("../../../testdata/request-100.der");

    #[test]
    fn test_parse_openssl_request() {
        let request = OcspRequest::parse(OPENSSL_REQUEST).unwrap();
        assert_eq!(request.hash_algorithm(), HashAlgorithm::Sha1);
        assert_eq!(request.serial_number(), &SerialNumber::from(100));
        assert_eq!(
            request.cert_id.issuer_name_hash,
            [
                0x66, 0x97, 0xC1, 0x86, 0x20, 0x45, 0x7D, 0x28, 0xC3, 0xE8, 0x75, 0x35, 0x2F, 0xE8,
                0x29, 0x14, 0x1A, 0x4E, 0xA9, 0xB5
            ]
        );
    }

    #[test]
    fn test_key_hash_matches_openssl() {
        let ca = CertificateInfo::from_der(CA_DER.to_vec()).unwrap();
        let request = OcspRequest::parse(OPENSSL_REQUEST).unwrap();
        assert_eq!(ca.key_hash(HashAlgorithm::Sha1), request.issuer_key_hash());
        assert_eq!(ca.name_hash(HashAlgorithm::Sha1), request.cert_id.issuer_name_hash);
    }

    #[test]
    fn test_builder_matches_openssl_encoding() {
        let built = OcspRequestBuilder::from_issuer_der(CA_DER, SerialNumber::from(100))
            .unwrap()
            .build();
        assert_eq!(built, OPENSSL_REQUEST);
    }

    #[test]
    fn test_parse_request_with_nonce_and_sha256() {
        let ca = CertificateInfo::from_der(CA_DER.to_vec()).unwrap();
        let built = OcspRequestBuilder::new(&ca, SerialNumber::from(4095))
            .hash_algorithm(&ca, HashAlgorithm::Sha256)
            .with_nonce(vec![0x42; 16])
            .build();

        let request = OcspRequest::parse(&built).unwrap();
        assert_eq!(request.hash_algorithm(), HashAlgorithm::Sha256);
        assert_eq!(request.serial_number().to_decimal(), "4095");
        assert_eq!(request.issuer_key_hash(), ca.key_hash(HashAlgorithm::Sha256));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            OcspRequest::parse(b"not der at all"),
            Err(OcspError::MalformedRequest(_))
        ));
        assert!(OcspRequest::parse(&[]).is_err());
    }

    #[test]
    fn test_parse_rejects_trailing_data() {
        let mut bytes = OPENSSL_REQUEST.to_vec();
        bytes.push(0x00);
        assert!(OcspRequest::parse(&bytes).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_hash() {
        // MD5 (1.2.840.113549.2.5) in place of SHA-1
        let mut cert_id = der_sequence(&[der_oid(&[1, 2, 840, 113549, 2, 5]), der_null()].concat());
        cert_id.extend_from_slice(&der_octet_string(&[0u8; 16]));
        cert_id.extend_from_slice(&der_octet_string(&[0u8; 16]));
        cert_id.extend_from_slice(&der_integer(&[0x01]));
        let request = der_sequence(&der_sequence(&der_sequence(&der_sequence(&der_sequence(
            &cert_id,
        )))));

        assert!(matches!(
            OcspRequest::parse(&request),
            Err(OcspError::UnsupportedHashAlgorithm(_))
        ));
    }

    #[test]
    fn test_hash_algorithm_oids() {
        for algorithm in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let dotted = algorithm
                .oid_components()
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(".");
            assert_eq!(HashAlgorithm::from_oid(&dotted), Some(algorithm));
        }
    }
}
