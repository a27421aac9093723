//! Terminal response cache
//!
//! Holds signed responses whose status can never change again (revoked or
//! expired certificates). Entries live for the process lifetime: there is no
//! TTL, no eviction and no update.

use dashmap::DashMap;
use ocsp_proto::EncodedResponse;

/// Per-mount store of terminal responses keyed by decimal serial number
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, EncodedResponse>,
}

impl ResponseCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached response for `serial`, if any
    pub fn get(&self, serial: &str) -> Option<EncodedResponse> {
        self.entries.get(serial).map(|entry| entry.value().clone())
    }

    /// Store `response` under `serial` unless an entry already exists
    ///
    /// Returns the stored entry, so concurrent callers for the same serial
    /// all hand out the first response that was inserted.
    pub fn insert(&self, serial: impl Into<String>, response: EncodedResponse) -> EncodedResponse {
        self.entries
            .entry(serial.into())
            .or_insert(response)
            .value()
            .clone()
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.entries.contains_key(serial)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
