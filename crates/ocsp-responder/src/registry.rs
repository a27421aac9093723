//! Mount source registry
//!
//! Maps mount identifiers to their [`MountSource`], creating sources lazily
//! on first use. Each mount gets an async once-cell so concurrent first
//! requests for the same mount share a single construction and a single CA
//! fetch. A failed construction removes the cell again, so unknown mounts
//! leave nothing behind and the next request for that mount tries again.

use crate::authority::AuthorityClient;
use crate::source::{MountSource, SourceError};
use dashmap::DashMap;
use ocsp_proto::ResponderIdentity;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error};

type SourceCell = Arc<OnceCell<Arc<MountSource>>>;

/// Thread-safe mount identifier to [`MountSource`] map
pub struct MountRegistry {
    authority: Arc<dyn AuthorityClient>,
    identity: Arc<ResponderIdentity>,
    sources: DashMap<String, SourceCell>,
}

impl MountRegistry {
    pub fn new(authority: Arc<dyn AuthorityClient>, identity: Arc<ResponderIdentity>) -> Self {
        Self {
            authority,
            identity,
            sources: DashMap::new(),
        }
    }

    /// Return the source for `mount`, creating it if this is the first request
    pub async fn resolve(&self, mount: &str) -> Result<Arc<MountSource>, SourceError> {
        // Clone the cell out so no map shard lock is held across the await
        let cell = self.sources.entry(mount.to_string()).or_default().clone();

        let source = cell
            .get_or_try_init(|| async {
                debug!(mount = %mount, "Creating mount source");
                MountSource::create(mount, self.authority.clone(), self.identity.clone())
                    .await
                    .map(Arc::new)
                    .map_err(|e| {
                        error!(mount = %mount, error = %e, "Failed to create mount source");
                        e
                    })
            })
            .await;

        match source {
            Ok(source) => Ok(source.clone()),
            Err(e) => {
                // Drop the empty cell unless another request has since filled it
                self.sources
                    .remove_if(mount, |_, held| Arc::ptr_eq(held, &cell) && !held.initialized());
                Err(e)
            }
        }
    }

    /// Source for `mount` if it has already been created
    pub fn get(&self, mount: &str) -> Option<Arc<MountSource>> {
        self.sources
            .get(mount)
            .and_then(|cell| cell.get().cloned())
    }

    /// Whether a source for `mount` has been created
    pub fn contains(&self, mount: &str) -> bool {
        self.get(mount).is_some()
    }

    /// Number of created sources
    pub fn len(&self) -> usize {
        self.sources
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of all created mounts, sorted
    pub fn mounts(&self) -> Vec<String> {
        let mut mounts: Vec<String> = self
            .sources
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        mounts.sort();
        mounts
    }
}

impl std::fmt::Debug for MountRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountRegistry")
            .field("mounts", &self.mounts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::MemoryAuthority;

    const CA_DER: &[u8] = include_bytes!("../../../testdata/ca.der");
    const OTHER_CA_DER: &[u8] = include_bytes!("../../../testdata/other-ca.der");
    const RESPONDER_PEM: &[u8] = include_bytes!("../../../testdata/responder.pem");
    const RESPONDER_KEY: &str = include_str!("../../../testdata/responder-key.pem");

    fn registry(authority: Arc<MemoryAuthority>) -> MountRegistry {
        let identity = ResponderIdentity::from_pem(RESPONDER_PEM, RESPONDER_KEY).unwrap();
        MountRegistry::new(authority, Arc::new(identity))
    }

    #[tokio::test]
    async fn test_resolve_memoizes() {
        let authority = Arc::new(MemoryAuthority::new());
        authority.insert_ca("pkiA", CA_DER.to_vec());
        authority.insert_ca("pkiB", OTHER_CA_DER.to_vec());
        let registry = registry(authority.clone());
        assert!(registry.is_empty());

        let first = registry.resolve("pkiA").await.unwrap();
        let second = registry.resolve("pkiA").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(authority.ca_calls(), 1);

        let other = registry.resolve("pkiB").await.unwrap();
        assert_eq!(other.issuer().common_name(), Some("Unrelated CA"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.mounts(), vec!["pkiA".to_string(), "pkiB".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_creation_is_retried() {
        let authority = Arc::new(MemoryAuthority::new());
        authority.insert_ca("pkiZ", CA_DER.to_vec());
        authority.set_reachable(false);
        let registry = registry(authority.clone());

        assert!(registry.resolve("pkiZ").await.is_err());
        assert!(!registry.contains("pkiZ"));
        assert_eq!(registry.len(), 0);

        authority.set_reachable(true);
        let source = registry.resolve("pkiZ").await.unwrap();
        assert_eq!(source.mount(), "pkiZ");
        assert!(registry.contains("pkiZ"));
        assert_eq!(authority.ca_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_creation_leaves_no_entry() {
        let authority = Arc::new(MemoryAuthority::new());
        let registry = registry(authority.clone());

        for i in 0..100 {
            assert!(registry.resolve(&format!("missing-{}", i)).await.is_err());
        }

        assert_eq!(registry.sources.len(), 0);
        assert!(registry.mounts().is_empty());
        assert_eq!(authority.ca_calls(), 100);
    }

    #[tokio::test]
    async fn test_concurrent_resolve_single_winner() {
        let authority = Arc::new(MemoryAuthority::new());
        authority.insert_ca("pki", CA_DER.to_vec());
        let registry = Arc::new(registry(authority.clone()));

        let mut handles = vec![];
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.resolve("pki").await.unwrap() }));
        }

        let mut sources = vec![];
        for handle in handles {
            sources.push(handle.await.unwrap());
        }

        assert!(sources.iter().all(|s| Arc::ptr_eq(s, &sources[0])));
        assert_eq!(authority.ca_calls(), 1);
        assert_eq!(registry.len(), 1);
    }
}
