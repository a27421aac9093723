//! Vault PKI authority implementation

use super::{AuthorityClient, AuthorityError, AuthorityResult, RevocationRecord};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Header carrying the Vault client token
const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Vault PKI secrets engine backend
///
/// Reads CA certificates and certificate records through the Vault HTTP API:
///
/// - `GET {addr}/v1/{mount}/ca` returns the raw DER CA certificate
/// - `GET {addr}/v1/{mount}/cert/{serial}` returns the certificate record
///
/// # Example
///
/// ```no_run
/// use ocsp_responder::authority::{AuthorityClient, VaultAuthority};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let vault = VaultAuthority::new(
///     "https://vault.example.com:8200",
///     Some("s.token".to_string()),
///     Duration::from_secs(60),
/// )?;
/// let ca_der = vault.get_ca("pki").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VaultAuthority {
    http_client: Client,
    address: String,
    token: Option<String>,
}

/// Envelope of a Vault logical read
#[derive(Debug, Deserialize)]
struct SecretResponse {
    data: Option<CertificateData>,
}

/// `data` of a `{mount}/cert/{serial}` read
#[derive(Debug, Deserialize)]
struct CertificateData {
    #[serde(default)]
    certificate: Option<String>,
    #[serde(default)]
    revocation_time: Option<Value>,
}

impl VaultAuthority {
    /// Create a client for the Vault server at `address`
    ///
    /// # Arguments
    /// * `address` - Base URL, e.g. `https://127.0.0.1:8200`
    /// * `token` - Client token sent with every read, if any
    /// * `timeout` - Bound on each HTTP request
    pub fn new(
        address: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> AuthorityResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorityError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            address: address.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn read(&self, path: &str) -> AuthorityResult<reqwest::Response> {
        let url = format!("{}/v1/{}", self.address, path);
        debug!(url = %url, "Vault read");

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(VAULT_TOKEN_HEADER, token);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl AuthorityClient for VaultAuthority {
    async fn get_ca(&self, mount: &str) -> AuthorityResult<Vec<u8>> {
        let path = format!("{}/ca", mount);
        let response = self.read(&path).await?;

        if !response.status().is_success() {
            return Err(AuthorityError::UnexpectedStatus {
                path,
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(AuthorityError::InvalidResponse {
                path,
                message: "empty CA certificate".to_string(),
            });
        }
        Ok(body.to_vec())
    }

    async fn get_cert_status(
        &self,
        mount: &str,
        lookup_serial: &str,
    ) -> AuthorityResult<RevocationRecord> {
        let path = format!("{}/cert/{}", mount, lookup_serial);
        let response = self.read(&path).await?;

        // Vault answers 404 for serials it never issued
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RevocationRecord::default());
        }
        if !response.status().is_success() {
            return Err(AuthorityError::UnexpectedStatus {
                path,
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        let secret: SecretResponse =
            serde_json::from_slice(&body).map_err(|e| AuthorityError::InvalidResponse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        match secret.data {
            Some(data) => decode_record(data),
            None => Ok(RevocationRecord::default()),
        }
    }
}

fn decode_record(data: CertificateData) -> AuthorityResult<RevocationRecord> {
    let revocation_time = match data.revocation_time {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => Some(number.as_i64().ok_or_else(|| {
            AuthorityError::MalformedRecord(format!(
                "revocation_time is not an integer: {}",
                number
            ))
        })?),
        Some(other) => {
            return Err(AuthorityError::MalformedRecord(format!(
                "revocation_time has unexpected type: {}",
                other
            )))
        }
    };

    Ok(RevocationRecord {
        revocation_time,
        certificate_pem: data.certificate.filter(|pem| !pem.is_empty()),
    })
}
