//! Mount routing
//!
//! Decides which mount answers a request. In fixed mode every request goes to
//! one configured mount. In path mode the first `levels` path segments name
//! the mount and the rest of the path is handed on:
//!
//! ```text
//! levels = 1:  GET  /pkiA/MEIwQDA+...   -> mount "pkiA", residual "MEIwQDA+..."
//! levels = 2:  POST /team/pki           -> mount "team/pki", residual ""
//! ```
//!
//! GET carries the base64 request in the path, so it needs at least one
//! segment past the mount. POST carries it in the body, so the path must be
//! exactly the mount.

use axum::http::{Method, StatusCode};
use thiserror::Error;

/// Request rejected before any mount was resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(Method),
}

impl RoutingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RoutingError::NotFound(_) => StatusCode::NOT_FOUND,
            RoutingError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// A request path split into mount and residual
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRoute {
    pub mount: String,
    /// Remaining segments joined with `/`
    pub residual: String,
}

/// How the mount of a request is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSelector {
    /// Every request is served by this mount
    Fixed(String),
    /// The mount is the first `levels` path segments
    Path { levels: usize },
}

impl MountSelector {
    /// Build a selector from the auto-mount setting; `0` means fixed mode
    pub fn from_levels(levels: usize, fixed_mount: impl Into<String>) -> Self {
        if levels == 0 {
            MountSelector::Fixed(fixed_mount.into())
        } else {
            MountSelector::Path { levels }
        }
    }

    /// Route one request
    pub fn route(&self, method: &Method, path: &str) -> Result<MountRoute, RoutingError> {
        match self {
            MountSelector::Fixed(mount) => {
                if method != Method::GET && method != Method::POST {
                    return Err(RoutingError::MethodNotAllowed(method.clone()));
                }
                Ok(MountRoute {
                    mount: mount.clone(),
                    residual: path.trim_matches('/').to_string(),
                })
            }
            MountSelector::Path { levels } => extract_mount(method, path, *levels),
        }
    }
}

/// Split `path` into a mount of `levels` segments and the residual path
///
/// Leading and trailing slashes are ignored, so `/pki/` names the same mount
/// as `/pki`.
pub fn extract_mount(method: &Method, path: &str, levels: usize) -> Result<MountRoute, RoutingError> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let valid = if method == Method::GET {
        segments.len() > levels
    } else if method == Method::POST {
        segments.len() == levels
    } else {
        return Err(RoutingError::MethodNotAllowed(method.clone()));
    };

    if !valid {
        return Err(RoutingError::NotFound(format!(
            "{} {} has {} path segments, mount needs {}",
            method,
            path,
            segments.len(),
            levels
        )));
    }

    Ok(MountRoute {
        mount: segments[..levels].join("/"),
        residual: segments[levels..].join("/"),
    })
}
