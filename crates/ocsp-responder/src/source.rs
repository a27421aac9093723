//! Per-mount response source and revocation decision engine
//!
//! A [`MountSource`] is the unit of per-tenant state: the mount's CA
//! certificate, a handle to the authority, the shared responder identity and
//! a private [`ResponseCache`]. It is built once per mount and never refreshed.
//!
//! # Decision flow
//!
//! 1. Issuer key hash in the request must match the mount CA, otherwise the
//!    request is rejected before any cache or authority access
//! 2. Cached terminal response for the serial is returned as-is
//! 3. The authority record decides the outcome:
//!
//! | revocation time | certificate      | outcome                         |
//! |-----------------|------------------|---------------------------------|
//! | absent          | -                | indeterminate                   |
//! | non-zero        | -                | revoked, cached                 |
//! | zero            | absent           | indeterminate                   |
//! | zero            | expired          | unauthorized, cached            |
//! | zero            | valid            | good for one hour, not cached   |

use crate::authority::{lookup_serial, AuthorityClient, AuthorityError};
use crate::cache::ResponseCache;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ocsp_proto::{
    build_response, CertStatus, CertificateInfo, EncodedResponse, OcspError, OcspRequest,
    ResponderIdentity, ResponseTemplate, RevocationReason,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// How long a good response stays valid
const GOOD_RESPONSE_LIFETIME_HOURS: i64 = 1;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Issuer key hash does not match the CA of mount {mount}")]
    IssuerMismatch { mount: String },
    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),
    #[error("Invalid CA certificate for mount {mount}: {source}")]
    InvalidCaCertificate { mount: String, source: OcspError },
    #[error("Invalid certificate for serial {serial}: {source}")]
    InvalidCertificate { serial: String, source: OcspError },
    #[error("Revocation time out of range: {0}")]
    InvalidRevocationTime(i64),
    #[error("Failed to build response: {0}")]
    Build(OcspError),
}

/// Outcome of answering one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Certificate is valid; response is fresh and was not cached
    Good(EncodedResponse),
    /// Certificate is revoked; response was cached
    Revoked(EncodedResponse),
    /// Certificate has expired; the unauthorized response was cached
    Expired(EncodedResponse),
    /// Served from the cache without consulting the authority
    Cached(EncodedResponse),
    /// Authority had no usable data for the serial
    Indeterminate,
}

impl Decision {
    /// Response to send, if the decision produced one
    pub fn response(&self) -> Option<&EncodedResponse> {
        match self {
            Decision::Good(response)
            | Decision::Revoked(response)
            | Decision::Expired(response)
            | Decision::Cached(response) => Some(response),
            Decision::Indeterminate => None,
        }
    }

    /// Response to send, with indeterminate answered as unauthorized
    pub fn into_response(self) -> EncodedResponse {
        match self {
            Decision::Good(response)
            | Decision::Revoked(response)
            | Decision::Expired(response)
            | Decision::Cached(response) => response,
            Decision::Indeterminate => EncodedResponse::unauthorized(),
        }
    }
}

/// Response source for one authority mount
pub struct MountSource {
    mount: String,
    issuer: CertificateInfo,
    authority: Arc<dyn AuthorityClient>,
    identity: Arc<ResponderIdentity>,
    cache: ResponseCache,
}

impl MountSource {
    /// Fetch and parse the CA of `mount` and build an empty source for it
    pub async fn create(
        mount: impl Into<String>,
        authority: Arc<dyn AuthorityClient>,
        identity: Arc<ResponderIdentity>,
    ) -> Result<Self, SourceError> {
        let mount = mount.into();
        debug!(mount = %mount, "Fetching CA certificate");

        let ca_der = authority.get_ca(&mount).await?;
        let issuer = CertificateInfo::from_der(ca_der).map_err(|source| {
            SourceError::InvalidCaCertificate {
                mount: mount.clone(),
                source,
            }
        })?;

        info!(
            mount = %mount,
            ca = issuer.common_name().unwrap_or("(no CN)"),
            "Mount source created"
        );

        Ok(Self {
            mount,
            issuer,
            authority,
            identity,
            cache: ResponseCache::new(),
        })
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// CA certificate of this mount
    pub fn issuer(&self) -> &CertificateInfo {
        &self.issuer
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Answer `request` as of now
    pub async fn respond(&self, request: &OcspRequest) -> Result<Decision, SourceError> {
        self.respond_at(request, Utc::now()).await
    }

    /// Answer `request` with `now` as the response time
    pub async fn respond_at(
        &self,
        request: &OcspRequest,
        now: DateTime<Utc>,
    ) -> Result<Decision, SourceError> {
        let expected_key_hash = self.issuer.key_hash(request.hash_algorithm());
        if expected_key_hash != request.issuer_key_hash() {
            return Err(SourceError::IssuerMismatch {
                mount: self.mount.clone(),
            });
        }

        let serial = request.serial_number();
        let cache_key = serial.to_decimal();
        if let Some(response) = self.cache.get(&cache_key) {
            debug!(mount = %self.mount, serial = %cache_key, "Cache hit");
            return Ok(Decision::Cached(response));
        }

        let lookup = lookup_serial(serial);
        info!(mount = %self.mount, serial = %lookup, "Looking up certificate");
        let record = self.authority.get_cert_status(&self.mount, &lookup).await?;

        let revocation_time = match record.revocation_time {
            Some(time) => time,
            None => {
                debug!(mount = %self.mount, serial = %lookup, "No revocation data");
                return Ok(Decision::Indeterminate);
            }
        };

        if revocation_time != 0 {
            let revoked_at = Utc
                .timestamp_opt(revocation_time, 0)
                .single()
                .ok_or(SourceError::InvalidRevocationTime(revocation_time))?;
            info!(mount = %self.mount, serial = %lookup, revoked_at = %revoked_at, "Certificate revoked");

            let template = ResponseTemplate::new(
                serial.clone(),
                CertStatus::Revoked {
                    revoked_at,
                    reason: RevocationReason::Unspecified,
                },
                now,
            )
            .with_hash_algorithm(request.hash_algorithm());
            let response = self.build(&template)?;
            return Ok(Decision::Revoked(self.cache.insert(cache_key, response)));
        }

        let certificate_pem = match record.certificate_pem {
            Some(pem) => pem,
            None => {
                debug!(mount = %self.mount, serial = %lookup, "No certificate body");
                return Ok(Decision::Indeterminate);
            }
        };

        let certificate = CertificateInfo::from_pem(certificate_pem.as_bytes()).map_err(|source| {
            SourceError::InvalidCertificate {
                serial: lookup.clone(),
                source,
            }
        })?;

        if certificate.is_expired_at(now) {
            info!(
                mount = %self.mount,
                serial = %lookup,
                not_after = %certificate.not_after(),
                "Certificate expired"
            );
            let response = self
                .cache
                .insert(cache_key, EncodedResponse::unauthorized());
            return Ok(Decision::Expired(response));
        }

        info!(mount = %self.mount, serial = %lookup, "Certificate valid");
        let template = ResponseTemplate::new(serial.clone(), CertStatus::Good, now)
            .with_hash_algorithm(request.hash_algorithm())
            .with_next_update(now + Duration::hours(GOOD_RESPONSE_LIFETIME_HOURS));
        Ok(Decision::Good(self.build(&template)?))
    }

    fn build(&self, template: &ResponseTemplate) -> Result<EncodedResponse, SourceError> {
        build_response(template, &self.issuer, &self.identity).map_err(SourceError::Build)
    }
}

impl std::fmt::Debug for MountSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountSource")
            .field("mount", &self.mount)
            .field("ca", &self.issuer.common_name())
            .field("cached", &self.cache.len())
            .finish()
    }
}
