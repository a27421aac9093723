//! In-memory authority implementation

use super::{AuthorityClient, AuthorityError, AuthorityResult, RevocationRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory authority
///
/// Holds CA certificates and revocation records in local maps. Every read is
/// counted, and the whole backend can be switched offline to simulate an
/// outage.
///
/// # Use Cases
///
/// - Exercising the decision engine without a Vault server
/// - Asserting how often the backend is consulted
#[derive(Debug)]
pub struct MemoryAuthority {
    cas: DashMap<String, Vec<u8>>,
    records: DashMap<(String, String), RevocationRecord>,
    reachable: AtomicBool,
    ca_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl Default for MemoryAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthority {
    /// Create an empty, reachable authority
    pub fn new() -> Self {
        Self {
            cas: DashMap::new(),
            records: DashMap::new(),
            reachable: AtomicBool::new(true),
            ca_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Register the DER CA certificate of `mount`
    pub fn insert_ca(&self, mount: impl Into<String>, ca_der: Vec<u8>) {
        self.cas.insert(mount.into(), ca_der);
    }

    /// Store the record for `lookup_serial` under `mount`, replacing any previous one
    pub fn insert_record(
        &self,
        mount: impl Into<String>,
        lookup_serial: impl Into<String>,
        record: RevocationRecord,
    ) {
        self.records
            .insert((mount.into(), lookup_serial.into()), record);
    }

    /// Simulate the backend going down or coming back
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of `get_ca` calls so far, failed ones included
    pub fn ca_calls(&self) -> usize {
        self.ca_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_cert_status` calls so far, failed ones included
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> AuthorityResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AuthorityError::Transport(
                "authority unreachable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl AuthorityClient for MemoryAuthority {
    async fn get_ca(&self, mount: &str) -> AuthorityResult<Vec<u8>> {
        self.ca_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        self.cas
            .get(mount)
            .map(|ca| ca.value().clone())
            .ok_or_else(|| AuthorityError::MountNotFound(mount.to_string()))
    }

    async fn get_cert_status(
        &self,
        mount: &str,
        lookup_serial: &str,
    ) -> AuthorityResult<RevocationRecord> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        // Unknown serials read as an empty record, like a Vault 404
        Ok(self
            .records
            .get(&(mount.to_string(), lookup_serial.to_string()))
            .map(|record| record.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ca_lookup() {
        let authority = MemoryAuthority::new();
        authority.insert_ca("pki", vec![0x30, 0x00]);

        assert_eq!(authority.get_ca("pki").await.unwrap(), vec![0x30, 0x00]);
        assert!(matches!(
            authority.get_ca("other").await,
            Err(AuthorityError::MountNotFound(_))
        ));
        assert_eq!(authority.ca_calls(), 2);
    }

    #[tokio::test]
    async fn test_records_scoped_by_mount() {
        let authority = MemoryAuthority::new();
        authority.insert_record("pkiA", "64", RevocationRecord::revoked(1700000000));

        let record = authority.get_cert_status("pkiA", "64").await.unwrap();
        assert_eq!(record.revocation_time, Some(1700000000));

        let missing = authority.get_cert_status("pkiB", "64").await.unwrap();
        assert_eq!(missing, RevocationRecord::default());
        assert_eq!(authority.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let authority = MemoryAuthority::new();
        authority.insert_ca("pki", vec![0x30, 0x00]);
        authority.set_reachable(false);

        assert!(matches!(
            authority.get_ca("pki").await,
            Err(AuthorityError::Transport(_))
        ));
        assert!(authority.get_cert_status("pki", "01").await.is_err());

        authority.set_reachable(true);
        assert!(authority.get_ca("pki").await.is_ok());
        assert_eq!(authority.ca_calls(), 2);
        assert_eq!(authority.status_calls(), 1);
    }
}
