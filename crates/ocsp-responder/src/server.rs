//! HTTP front end
//!
//! One fallback handler serves every path: the [`MountSelector`] picks the
//! mount, the [`MountRegistry`] supplies its source, and the source's
//! decision is written back as an `application/ocsp-response` body.
//!
//! | situation                              | HTTP | body              |
//! |----------------------------------------|------|-------------------|
//! | decision with a response               | 200  | signed response   |
//! | indeterminate, issuer mismatch         | 200  | unauthorized      |
//! | request DER undecodable                | 200  | malformedRequest  |
//! | GET payload not base64                 | 400  | empty             |
//! | wrong segment count, mount unavailable | 404  | empty             |
//! | method other than GET/POST             | 405  | empty             |
//! | authority or signing failure           | 500  | internalError     |

use crate::registry::MountRegistry;
use crate::router::{MountSelector, RoutingError};
use crate::source::SourceError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Utc};
use ocsp_proto::{EncodedResponse, OcspRequest};
use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

const PADDING_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state of the HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<MountSelector>,
    pub registry: Arc<MountRegistry>,
}

impl AppState {
    pub fn new(selector: MountSelector, registry: Arc<MountRegistry>) -> Self {
        Self {
            selector: Arc::new(selector),
            registry,
        }
    }
}

/// Build the axum application
pub fn app(state: AppState) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OCSP HTTP server bound to a TCP listener
pub struct OcspServer {
    listener: TcpListener,
    state: AppState,
}

impl OcspServer {
    /// Bind the listener
    pub async fn new(bind_addr: SocketAddr, state: AppState) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(bind_addr).await?;
        info!("OCSP responder listening on {}", listener.local_addr()?);
        Ok(Self { listener, state })
    }

    /// Get the local address the server is listening on
    ///
    /// Useful when binding to port 0 (OS-assigned port)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::from)
    }

    /// Serve requests until the process stops
    pub async fn run(self) -> Result<(), ServerError> {
        axum::serve(self.listener, app(self.state)).await?;
        Ok(())
    }
}

async fn handle_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    info!(method = %method, path = %uri.path(), "OCSP request");

    let route = match state.selector.route(&method, uri.path()) {
        Ok(route) => route,
        Err(e) => {
            warn!(method = %method, path = %uri.path(), error = %e, "Rejected request");
            return routing_failure(&e);
        }
    };
    debug!(mount = %route.mount, residual = %route.residual, "Routed request");

    let source = match state.registry.resolve(&route.mount).await {
        Ok(source) => source,
        Err(e) => {
            warn!(mount = %route.mount, error = %e, "Mount unavailable");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let request_der = if method == Method::GET {
        match decode_get_payload(&route.residual) {
            Some(der) => der,
            None => {
                warn!(mount = %route.mount, "GET payload is not valid base64");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    } else {
        body.to_vec()
    };

    let request = match OcspRequest::parse(&request_der) {
        Ok(request) => request,
        Err(e) => {
            warn!(mount = %route.mount, error = %e, "Malformed OCSP request");
            return ocsp_response(StatusCode::OK, EncodedResponse::malformed_request());
        }
    };

    match source.respond(&request).await {
        Ok(decision) => ocsp_response(StatusCode::OK, decision.into_response()),
        Err(SourceError::IssuerMismatch { mount }) => {
            warn!(mount = %mount, serial = %request.serial_number(), "Issuer key hash mismatch");
            ocsp_response(StatusCode::OK, EncodedResponse::unauthorized())
        }
        Err(e) => {
            error!(
                mount = %route.mount,
                serial = %request.serial_number(),
                error = %e,
                "Failed to answer OCSP request"
            );
            ocsp_response(StatusCode::INTERNAL_SERVER_ERROR, EncodedResponse::internal_error())
        }
    }
}

fn routing_failure(err: &RoutingError) -> Response {
    let mut response = err.status_code().into_response();
    if let RoutingError::MethodNotAllowed(_) = err {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
    }
    response
}

/// Percent-decode then base64-decode a GET payload
///
/// Accepts the standard and URL-safe alphabets, with or without padding.
pub fn decode_get_payload(residual: &str) -> Option<Vec<u8>> {
    let decoded = percent_decode_str(residual).decode_utf8().ok()?;
    let payload = decoded.trim();
    if payload.is_empty() {
        return None;
    }

    STANDARD_LENIENT
        .decode(payload)
        .or_else(|_| URL_SAFE_LENIENT.decode(payload))
        .ok()
}

fn ocsp_response(status: StatusCode, response: EncodedResponse) -> Response {
    let headers = response_headers(&response, Utc::now());
    (status, headers, response.into_der()).into_response()
}

/// Headers for an OCSP response body
///
/// Signed responses get caching headers derived from their update window.
pub fn response_headers(response: &EncodedResponse, now: DateTime<Utc>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(OCSP_RESPONSE_CONTENT_TYPE),
    );

    if let Some(this_update) = response.this_update() {
        let etag = format!("\"{}\"", hex::encode(Sha256::digest(response.der())));
        insert_header(&mut headers, header::ETAG, &etag);
        insert_header(&mut headers, header::LAST_MODIFIED, &http_date(this_update));
    }

    if let Some(next_update) = response.next_update() {
        let max_age = (next_update - now).num_seconds().max(0);
        insert_header(&mut headers, header::EXPIRES, &http_date(next_update));
        insert_header(
            &mut headers,
            header::CACHE_CONTROL,
            &format!(
                "max-age={}, public, no-transform, must-revalidate",
                max_age
            ),
        );
    }

    headers
}

fn insert_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

/// RFC 7231 IMF-fixdate
fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
