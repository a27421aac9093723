//! OCSP Protocol Implementation
//!
//! Request decoding and signed response encoding for an OCSP responder, as
//! defined in RFC 6960.
//!
//! # Features
//!
//! - OCSPRequest decoding (first CertID of the request list)
//! - CertID hashing with SHA-1, SHA-256, SHA-384 and SHA-512
//! - BasicOCSPResponse encoding, signed with sha256WithRSAEncryption
//! - Fixed unsigned error responses
//! - Responder identity loading from PEM (PKCS#1 or PKCS#8 keys)
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use ocsp_proto::{
//!     build_response, CertStatus, CertificateInfo, OcspRequest, ResponderIdentity,
//!     ResponseTemplate,
//! };
//!
//! # fn example(request_der: &[u8], ca_der: Vec<u8>, cert_pem: &[u8], key_pem: &str)
//! #     -> ocsp_proto::OcspResult<()> {
//! let identity = ResponderIdentity::from_pem(cert_pem, key_pem)?;
//! let issuer = CertificateInfo::from_der(ca_der)?;
//!
//! let request = OcspRequest::parse(request_der)?;
//! let template = ResponseTemplate::new(
//!     request.serial_number().clone(),
//!     CertStatus::Good,
//!     Utc::now(),
//! )
//! .with_hash_algorithm(request.hash_algorithm());
//!
//! let response = build_response(&template, &issuer, &identity)?;
//! let wire_bytes = response.der();
//! # let _ = wire_bytes;
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod der;
pub mod error;
pub mod identity;
pub mod request;
pub mod response;
pub mod serial;

pub use certificate::{pem_to_der, CertificateInfo};
pub use error::{OcspError, OcspResult};
pub use identity::{parse_private_key, ResponderIdentity};
pub use request::{CertId, HashAlgorithm, OcspRequest, OcspRequestBuilder};
pub use response::{
    build_response, CertStatus, EncodedResponse, ResponseStatus, ResponseTemplate,
    RevocationReason,
};
pub use serial::SerialNumber;
