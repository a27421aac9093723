//! Multi-mount OCSP Responder
//!
//! This crate serves OCSP for any number of Vault PKI mounts from a single
//! endpoint, built on top of the `ocsp-proto` protocol implementation.
//!
//! # Features
//!
//! - Mount selection from leading path segments, or one fixed mount
//! - Lazy, single-flight creation of per-mount sources
//! - Permanent caching of terminal (revoked, expired) responses
//! - Pluggable authority backends (Vault, in-memory)
//! - JSON configuration with command-line overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use ocsp_responder::{AppState, MountRegistry, MountSelector, OcspServer, VaultAuthority};
//! use ocsp_proto::ResponderIdentity;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let identity = ResponderIdentity::from_pem(
//!         &std::fs::read("responder.pem")?,
//!         &std::fs::read_to_string("responder-key.pem")?,
//!     )?;
//!     let vault = VaultAuthority::new("https://127.0.0.1:8200", None, Duration::from_secs(60))?;
//!
//!     let registry = Arc::new(MountRegistry::new(Arc::new(vault), Arc::new(identity)));
//!     let state = AppState::new(MountSelector::Path { levels: 1 }, registry);
//!
//!     let server = OcspServer::new("0.0.0.0:8080".parse()?, state).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod authority;
pub mod cache;
pub mod config;
pub mod registry;
pub mod router;
pub mod server;
pub mod source;

pub use authority::{
    lookup_serial, AuthorityClient, AuthorityError, MemoryAuthority, RevocationRecord,
    VaultAuthority,
};
pub use cache::ResponseCache;
pub use config::{Config, ConfigError};
pub use registry::MountRegistry;
pub use router::{extract_mount, MountRoute, MountSelector, RoutingError};
pub use server::{app, AppState, OcspServer, ServerError};
pub use source::{Decision, MountSource, SourceError};
