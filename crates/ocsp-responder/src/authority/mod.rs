//! Authority backend abstraction
//!
//! An authority is the PKI backend that owns the CA certificates and the
//! revocation state for every mount. The responder only ever reads from it.
//!
//! # Implementations
//!
//! - [`VaultAuthority`]: HTTP reads against Vault PKI secrets engines
//! - [`MemoryAuthority`]: in-process store for tests and local runs
//!
//! # Serial lookup form
//!
//! Certificates are addressed by the hyphenated byte-pair hex form of their
//! serial number, the form Vault prints and accepts:
//!
//! ```text
//! 4095  -> fff -> 0fff -> 0f-ff
//! 255   -> ff          -> ff
//! ```

pub mod error;
pub mod memory;
pub mod vault;

pub use error::{AuthorityError, AuthorityResult};
pub use memory::MemoryAuthority;
pub use vault::VaultAuthority;

use async_trait::async_trait;
use ocsp_proto::SerialNumber;

/// The authority's view of one certificate
///
/// `revocation_time` is a Unix timestamp in seconds; `Some(0)` means the
/// certificate is known and not revoked, `None` means the backend had no
/// revocation data at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevocationRecord {
    pub revocation_time: Option<i64>,
    pub certificate_pem: Option<String>,
}

impl RevocationRecord {
    /// Record for a revoked certificate
    pub fn revoked(revocation_time: i64) -> Self {
        Self {
            revocation_time: Some(revocation_time),
            certificate_pem: None,
        }
    }

    /// Record for a certificate that has not been revoked
    pub fn issued(certificate_pem: impl Into<String>) -> Self {
        Self {
            revocation_time: Some(0),
            certificate_pem: Some(certificate_pem.into()),
        }
    }
}

/// Read-only access to a PKI backend
///
/// Implementations must be thread-safe; one client is shared by every mount.
/// Failures are returned as errors and never retried internally.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// DER encoding of the CA certificate of `mount`
    async fn get_ca(&self, mount: &str) -> AuthorityResult<Vec<u8>>;

    /// Revocation record of the certificate `lookup_serial` issued by `mount`
    ///
    /// `lookup_serial` is in the form produced by [`lookup_serial`].
    async fn get_cert_status(
        &self,
        mount: &str,
        lookup_serial: &str,
    ) -> AuthorityResult<RevocationRecord>;
}

/// Convert a serial number into the authority's lookup form
pub fn lookup_serial(serial: &SerialNumber) -> String {
    let mut hex = serial.to_hex();
    if hex.len() % 2 == 1 {
        hex.insert(0, '0');
    }

    let mut lookup = String::with_capacity(hex.len() * 3 / 2);
    for (i, digit) in hex.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            lookup.push('-');
        }
        lookup.push(digit);
    }
    lookup
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_serial_padding() {
        assert_eq!(lookup_serial(&SerialNumber::from(4095)), "0f-ff");
        assert_eq!(lookup_serial(&SerialNumber::from(255)), "ff");
        assert_eq!(lookup_serial(&SerialNumber::from(16)), "10");
        assert_eq!(lookup_serial(&SerialNumber::from(100)), "64");
        assert_eq!(lookup_serial(&SerialNumber::from(0)), "00");
    }

    #[test]
    fn test_lookup_serial_long() {
        let serial = SerialNumber::from_bytes_be(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x10]);
        assert_eq!(lookup_serial(&serial), "01-23-45-67-89-ab-cd-ef-10");
    }

    #[test]
    fn test_record_constructors() {
        assert_eq!(RevocationRecord::revoked(1700000000).revocation_time, Some(1700000000));
        let issued = RevocationRecord::issued("pem");
        assert_eq!(issued.revocation_time, Some(0));
        assert_eq!(issued.certificate_pem.as_deref(), Some("pem"));
        assert_eq!(RevocationRecord::default().revocation_time, None);
    }
}
