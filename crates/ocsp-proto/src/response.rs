//! OCSP response encoding and signing - RFC 6960 Section 4.2
//!
//! ```asn1
//! OCSPResponse ::= SEQUENCE {
//!     responseStatus      OCSPResponseStatus,
//!     responseBytes       [0] EXPLICIT ResponseBytes OPTIONAL
//! }
//!
//! ResponseBytes ::= SEQUENCE {
//!     responseType        OBJECT IDENTIFIER,   -- id-pkix-ocsp-basic
//!     response            OCTET STRING         -- DER of BasicOCSPResponse
//! }
//!
//! BasicOCSPResponse ::= SEQUENCE {
//!     tbsResponseData     ResponseData,
//!     signatureAlgorithm  AlgorithmIdentifier,
//!     signature           BIT STRING,
//!     certs               [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL
//! }
//!
//! ResponseData ::= SEQUENCE {
//!     version             [0] EXPLICIT Version DEFAULT v1,
//!     responderID         ResponderID,
//!     producedAt          GeneralizedTime,
//!     responses           SEQUENCE OF SingleResponse,
//!     responseExtensions  [1] EXPLICIT Extensions OPTIONAL
//! }
//!
//! SingleResponse ::= SEQUENCE {
//!     certID              CertID,
//!     certStatus          CertStatus,
//!     thisUpdate          GeneralizedTime,
//!     nextUpdate          [0] EXPLICIT GeneralizedTime OPTIONAL,
//!     singleExtensions    [1] EXPLICIT Extensions OPTIONAL
//! }
//!
//! CertStatus ::= CHOICE {
//!     good                [0] IMPLICIT NULL,
//!     revoked             [1] IMPLICIT RevokedInfo,
//!     unknown             [2] IMPLICIT UnknownInfo
//! }
//! ```
//!
//! Responses are always signed by the responder identity, never by the
//! issuing CA, and carry the responder certificate in `certs` so clients can
//! chain it to the CA.

use crate::certificate::CertificateInfo;
use crate::der::{
    der_bit_string, der_enumerated, der_explicit_context, der_generalized_time,
    der_implicit_primitive, der_octet_string, der_oid, der_sequence, der_sequence_of,
};
use crate::error::OcspResult;
use crate::identity::ResponderIdentity;
use crate::request::HashAlgorithm;
use crate::serial::SerialNumber;
use chrono::{DateTime, Utc};

/// id-pkix-ocsp-basic (1.3.6.1.5.5.7.48.1.1)
const OCSP_BASIC: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1, 1];

/// OCSP response status (RFC 6960 Section 2.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Response has valid confirmations
    Successful = 0,
    /// Illegal confirmation request
    MalformedRequest = 1,
    /// Internal error in issuer
    InternalError = 2,
    /// Try again later
    TryLater = 3,
    /// Must sign the request
    SigRequired = 5,
    /// Request unauthorized
    Unauthorized = 6,
}

impl ResponseStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Successful),
            1 => Some(Self::MalformedRequest),
            2 => Some(Self::InternalError),
            3 => Some(Self::TryLater),
            5 => Some(Self::SigRequired),
            6 => Some(Self::Unauthorized),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// CRLReason (RFC 5280 Section 5.3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationReason {
    #[default]
    Unspecified = 0,
    KeyCompromise = 1,
    CaCompromise = 2,
    AffiliationChanged = 3,
    Superseded = 4,
    CessationOfOperation = 5,
    CertificateHold = 6,
    RemoveFromCrl = 8,
    PrivilegeWithdrawn = 9,
    AaCompromise = 10,
}

impl RevocationReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::KeyCompromise),
            2 => Some(Self::CaCompromise),
            3 => Some(Self::AffiliationChanged),
            4 => Some(Self::Superseded),
            5 => Some(Self::CessationOfOperation),
            6 => Some(Self::CertificateHold),
            8 => Some(Self::RemoveFromCrl),
            9 => Some(Self::PrivilegeWithdrawn),
            10 => Some(Self::AaCompromise),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Status asserted for one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertStatus {
    Good,
    Revoked {
        revoked_at: DateTime<Utc>,
        reason: RevocationReason,
    },
    Unknown,
}

impl CertStatus {
    fn to_der(&self) -> Vec<u8> {
        match self {
            Self::Good => der_implicit_primitive(0, &[]),
            Self::Revoked { revoked_at, reason } => {
                // RevokedInfo ::= SEQUENCE {
                //     revocationTime      GeneralizedTime,
                //     revocationReason    [0] EXPLICIT CRLReason OPTIONAL
                // }
                let mut content = der_generalized_time(revoked_at);
                if *reason != RevocationReason::Unspecified {
                    content.extend_from_slice(&der_explicit_context(
                        0,
                        &der_enumerated(reason.code()),
                    ));
                }
                der_explicit_context(1, &content)
            }
            Self::Unknown => der_implicit_primitive(2, &[]),
        }
    }
}

/// Everything that varies between two signed responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTemplate {
    pub serial_number: SerialNumber,
    pub status: CertStatus,
    pub hash_algorithm: HashAlgorithm,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

impl ResponseTemplate {
    /// Template hashed with SHA-1 and without a next update
    pub fn new(serial_number: SerialNumber, status: CertStatus, this_update: DateTime<Utc>) -> Self {
        Self {
            serial_number,
            status,
            hash_algorithm: HashAlgorithm::Sha1,
            this_update,
            next_update: None,
        }
    }

    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    pub fn with_next_update(mut self, next_update: DateTime<Utc>) -> Self {
        self.next_update = Some(next_update);
        self
    }
}

/// Wire bytes of a complete `OCSPResponse`
///
/// Signed responses remember their update window so the HTTP layer can
/// derive caching headers without decoding the DER again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    status: ResponseStatus,
    der: Vec<u8>,
    this_update: Option<DateTime<Utc>>,
    next_update: Option<DateTime<Utc>>,
}

impl EncodedResponse {
    /// Unsigned response carrying only a non-successful status
    ///
    /// Encodes as `30 03 0A 01 <status>`.
    pub fn error(status: ResponseStatus) -> Self {
        Self {
            status,
            der: der_sequence(&der_enumerated(status.code())),
            this_update: None,
            next_update: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::error(ResponseStatus::Unauthorized)
    }

    pub fn malformed_request() -> Self {
        Self::error(ResponseStatus::MalformedRequest)
    }

    pub fn internal_error() -> Self {
        Self::error(ResponseStatus::InternalError)
    }

    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn into_der(self) -> Vec<u8> {
        self.der
    }

    pub fn this_update(&self) -> Option<DateTime<Utc>> {
        self.this_update
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        self.next_update
    }
}

/// Build and sign a successful response for one certificate of `issuer`
///
/// The CertID is recomputed from the issuer with the template's hash
/// algorithm, so it matches what a client derives from the same CA.
/// `producedAt` equals `thisUpdate`.
pub fn build_response(
    template: &ResponseTemplate,
    issuer: &CertificateInfo,
    identity: &ResponderIdentity,
) -> OcspResult<EncodedResponse> {
    let cert_id = issuer.cert_id(template.serial_number.clone(), template.hash_algorithm);

    let mut single = cert_id.to_der();
    single.extend_from_slice(&template.status.to_der());
    single.extend_from_slice(&der_generalized_time(&template.this_update));
    if let Some(next_update) = &template.next_update {
        single.extend_from_slice(&der_explicit_context(0, &der_generalized_time(next_update)));
    }
    let single_response = der_sequence(&single);

    let mut response_data = identity.responder_id();
    response_data.extend_from_slice(&der_generalized_time(&template.this_update));
    response_data.extend_from_slice(&der_sequence(&single_response));
    let tbs_response_data = der_sequence(&response_data);

    let signature = identity.sign(&tbs_response_data)?;

    let mut basic = tbs_response_data;
    basic.extend_from_slice(&identity.signature_algorithm());
    basic.extend_from_slice(&der_bit_string(&signature));
    basic.extend_from_slice(&der_explicit_context(
        0,
        &der_sequence_of(&[identity.certificate().der()]),
    ));
    let basic_response = der_sequence(&basic);

    let mut response_bytes = der_oid(OCSP_BASIC);
    response_bytes.extend_from_slice(&der_octet_string(&basic_response));

    let mut ocsp_response = der_enumerated(ResponseStatus::Successful.code());
    ocsp_response.extend_from_slice(&der_explicit_context(0, &der_sequence(&response_bytes)));

    Ok(EncodedResponse {
        status: ResponseStatus::Successful,
        der: der_sequence(&ocsp_response),
        this_update: Some(template.this_update),
        next_update: template.next_update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_error_responses() {
        assert_eq!(EncodedResponse::unauthorized().der(), &[0x30, 0x03, 0x0A, 0x01, 0x06]);
        assert_eq!(EncodedResponse::malformed_request().der(), &[0x30, 0x03, 0x0A, 0x01, 0x01]);
        assert_eq!(EncodedResponse::internal_error().der(), &[0x30, 0x03, 0x0A, 0x01, 0x02]);
        assert_eq!(
            EncodedResponse::error(ResponseStatus::TryLater).der(),
            &[0x30, 0x03, 0x0A, 0x01, 0x03]
        );
        assert_eq!(EncodedResponse::unauthorized().this_update(), None);
    }

    #[test]
    fn test_status_codes() {
        for code in 0..=7u8 {
            match ResponseStatus::from_u8(code) {
                Some(status) => assert_eq!(status.code(), code),
                None => assert!(code == 4 || code == 7),
            }
        }
        assert_eq!(RevocationReason::from_u8(7), None);
        assert_eq!(RevocationReason::from_u8(10), Some(RevocationReason::AaCompromise));
    }

    #[test]
    fn test_cert_status_encoding() {
        assert_eq!(CertStatus::Good.to_der(), vec![0x80, 0x00]);
        assert_eq!(CertStatus::Unknown.to_der(), vec![0x82, 0x00]);

        let revoked_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let unspecified = CertStatus::Revoked {
            revoked_at,
            reason: RevocationReason::Unspecified,
        }
        .to_der();
        let mut expected = vec![0xA1, 0x11, 0x18, 0x0F];
        expected.extend_from_slice(b"20240301120000Z");
        assert_eq!(unspecified, expected);

        let key_compromise = CertStatus::Revoked {
            revoked_at,
            reason: RevocationReason::KeyCompromise,
        }
        .to_der();
        assert_eq!(key_compromise[1], 0x16);
        assert!(key_compromise.ends_with(&[0xA0, 0x03, 0x0A, 0x01, 0x01]));
    }

    #[test]
    fn test_template_builder() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let template = ResponseTemplate::new(SerialNumber::from(5), CertStatus::Good, now)
            .with_hash_algorithm(HashAlgorithm::Sha256)
            .with_next_update(now + chrono::Duration::hours(1));
        assert_eq!(template.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(template.next_update, Some(now + chrono::Duration::hours(1)));
    }
}
