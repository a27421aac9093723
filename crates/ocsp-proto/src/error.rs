//! OCSP codec error types

/// Errors raised while decoding requests or building signed responses
#[derive(Debug, thiserror::Error)]
pub enum OcspError {
    /// The request DER could not be decoded
    #[error("Malformed OCSP request: {0}")]
    MalformedRequest(String),

    /// The CertID names a hash algorithm this responder does not implement
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// Certificate could not be parsed
    #[error("Certificate parsing error: {0}")]
    CertificateError(String),

    /// Private key could not be parsed
    #[error("Private key error: {0}")]
    KeyError(String),

    /// Signing key does not belong to the signing certificate
    #[error("Responder key does not match responder certificate public key")]
    KeyMismatch,

    /// Signature generation failed
    #[error("Signing failed: {0}")]
    SigningError(String),
}

/// Result type for OCSP codec operations
pub type OcspResult<T> = Result<T, OcspError>;
