use crate::router::MountSelector;
use ocsp_proto::{OcspError, ResponderIdentity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Responder identity error: {0}")]
    Identity(#[from] OcspError),
}

/// Responder configuration
///
/// Every field has a default except the responder certificate and key, so a
/// JSON file only needs to list what differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen address (default: 0.0.0.0:8080)
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Path to the PEM responder certificate
    #[serde(default)]
    pub responder_cert: Option<String>,

    /// Path to the PEM responder key (PKCS#1 or PKCS#8 RSA)
    #[serde(default)]
    pub responder_key: Option<String>,

    /// Mount served in fixed mode (default: pki)
    #[serde(default = "default_pki_mount")]
    pub pki_mount: String,

    /// Number of leading path segments naming the mount; 0 = fixed mode
    #[serde(default)]
    pub auto_mount: usize,

    /// Vault server address (default: https://127.0.0.1:8200)
    #[serde(default = "default_vault_addr")]
    pub vault_addr: String,

    /// Vault client token
    #[serde(default)]
    pub vault_token: Option<String>,

    /// Timeout for each Vault request in seconds (default: 60)
    #[serde(default = "default_vault_timeout")]
    pub vault_timeout_secs: u64,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_pki_mount() -> String {
    "pki".to_string()
}

fn default_vault_addr() -> String {
    "https://127.0.0.1:8200".to_string()
}

fn default_vault_timeout() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: default_server_addr(),
            responder_cert: None,
            responder_key: None,
            pki_mount: default_pki_mount(),
            auto_mount: 0,
            vault_addr: default_vault_addr(),
            vault_token: None,
            vault_timeout_secs: default_vault_timeout(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// The result is not validated yet, since command-line flags may still
    /// fill in required settings.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server_addr
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid server address: {}", self.server_addr)))
    }

    pub fn vault_timeout(&self) -> Duration {
        Duration::from_secs(self.vault_timeout_secs)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Mount selection derived from `auto_mount` and `pki_mount`
    pub fn mount_selector(&self) -> MountSelector {
        MountSelector::from_levels(self.auto_mount, self.pki_mount.clone())
    }

    /// Read and check the responder certificate and key
    pub fn load_identity(&self) -> Result<ResponderIdentity, ConfigError> {
        let (cert_path, key_path) = match (&self.responder_cert, &self.responder_key) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                return Err(ConfigError::Invalid(
                    "responder certificate and key are required".to_string(),
                ))
            }
        };

        let cert_pem = fs::read(cert_path)?;
        let key_pem = fs::read_to_string(key_path)?;
        Ok(ResponderIdentity::from_pem(&cert_pem, &key_pem)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.responder_cert.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Invalid(
                "Responder certificate path is required".to_string(),
            ));
        }
        if self.responder_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Invalid(
                "Responder key path is required".to_string(),
            ));
        }

        if self.auto_mount == 0 && self.pki_mount.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(
                "PKI mount cannot be empty in fixed mode".to_string(),
            ));
        }

        if !self.vault_addr.starts_with("http://") && !self.vault_addr.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "Vault address must be an http(s) URL: {}",
                self.vault_addr
            )));
        }

        if self.vault_timeout_secs == 0 {
            return Err(ConfigError::Invalid("Vault timeout cannot be 0".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> Config {
        Config {
            responder_cert: Some("responder.pem".to_string()),
            responder_key: Some("responder-key.pem".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_addr, "0.0.0.0:8080");
        assert_eq!(config.pki_mount, "pki");
        assert_eq!(config.auto_mount, 0);
        assert_eq!(config.vault_timeout(), Duration::from_secs(60));
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.mount_selector(), MountSelector::Fixed("pki".to_string()));
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_err());

        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.server_addr = "not an address".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.vault_addr = "vault:8200".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.vault_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.pki_mount = String::new();
        assert!(config.validate().is_err());
        config.auto_mount = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"auto_mount": 2, "vault_addr": "http://vault:8200", "responder_cert": "/etc/ocsp/cert.pem"}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.auto_mount, 2);
        assert_eq!(config.vault_addr, "http://vault:8200");
        assert_eq!(config.server_addr, "0.0.0.0:8080");
        assert_eq!(config.mount_selector(), MountSelector::Path { levels: 2 });
        assert!(config.responder_key.is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = valid_config();
        config.to_file(file.path()).unwrap();
        assert_eq!(Config::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_file("/nonexistent/config.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_load_identity() {
        let testdata = concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata");
        let config = Config {
            responder_cert: Some(format!("{}/responder.pem", testdata)),
            responder_key: Some(format!("{}/responder-key.pem", testdata)),
            ..Config::default()
        };
        let identity = config.load_identity().unwrap();
        assert_eq!(identity.certificate().common_name(), Some("Test OCSP Responder"));

        let mismatched = Config {
            responder_cert: Some(format!("{}/ca.pem", testdata)),
            ..config
        };
        assert!(matches!(
            mismatched.load_identity(),
            Err(ConfigError::Identity(OcspError::KeyMismatch))
        ));
        assert!(matches!(
            Config::default().load_identity(),
            Err(ConfigError::Invalid(_))
        ));
    }
}
