use clap::Parser;
use ocsp_responder::{
    AppState, Config, MountRegistry, MountSelector, OcspServer, VaultAuthority,
};
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Vault OCSP Responder - RFC 6960 OCSP for Vault PKI mounts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "vault_ocsp")]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address [default: 0.0.0.0:8080]
    #[arg(long, value_name = "ADDR")]
    server_addr: Option<String>,

    /// Responder certificate (PEM)
    #[arg(long, value_name = "FILE")]
    responder_cert: Option<String>,

    /// Responder private key (PEM, PKCS#1 or PKCS#8 RSA)
    #[arg(long, value_name = "FILE")]
    responder_key: Option<String>,

    /// PKI mount served when auto-mount is 0 [default: pki]
    #[arg(long, value_name = "MOUNT")]
    pki_mount: Option<String>,

    /// Number of leading path segments naming the mount; 0 serves --pki-mount only
    #[arg(long, value_name = "LEVELS")]
    auto_mount: Option<usize>,

    /// Vault address [default: https://127.0.0.1:8200]
    #[arg(long, env = "VAULT_ADDR", value_name = "URL")]
    vault_addr: Option<String>,

    /// Vault token
    #[arg(long, env = "VAULT_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    vault_token: Option<String>,

    /// Timeout for each Vault request, in seconds [default: 60]
    #[arg(long, value_name = "SECS")]
    vault_timeout: Option<u64>,

    /// Log level when RUST_LOG is unset [default: info]
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layer command-line flags over `config`
    fn apply(self, config: &mut Config) {
        if let Some(server_addr) = self.server_addr {
            config.server_addr = server_addr;
        }
        if let Some(cert) = self.responder_cert {
            config.responder_cert = Some(cert);
        }
        if let Some(key) = self.responder_key {
            config.responder_key = Some(key);
        }
        if let Some(mount) = self.pki_mount {
            config.pki_mount = mount;
        }
        if let Some(levels) = self.auto_mount {
            config.auto_mount = levels;
        }
        if let Some(addr) = self.vault_addr {
            config.vault_addr = addr;
        }
        if let Some(token) = self.vault_token {
            config.vault_token = Some(token);
        }
        if let Some(timeout) = self.vault_timeout {
            config.vault_timeout_secs = timeout;
        }
        if let Some(level) = self.log_level {
            config.log_level = Some(level);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration from {}: {}", path, e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };
    let config_path = cli.config.clone();
    cli.apply(&mut config);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Vault OCSP Responder v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = config_path {
        info!("Loaded configuration from: {}", path);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    let bind_addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let identity = match config.load_identity() {
        Ok(identity) => Arc::new(identity),
        Err(e) => {
            error!("Failed to load responder identity: {}", e);
            process::exit(1);
        }
    };
    info!(
        "Responder certificate: {}",
        identity.certificate().common_name().unwrap_or("(no CN)")
    );

    let vault = match VaultAuthority::new(
        config.vault_addr.clone(),
        config.vault_token.clone(),
        config.vault_timeout(),
    ) {
        Ok(vault) => vault,
        Err(e) => {
            error!("Failed to create Vault client: {}", e);
            process::exit(1);
        }
    };
    info!("Vault address: {}", vault.address());

    let registry = Arc::new(MountRegistry::new(Arc::new(vault), identity));
    let selector = config.mount_selector();

    match &selector {
        MountSelector::Fixed(mount) => {
            // Fixed mode serves exactly one mount, so it must exist up front
            if let Err(e) = registry.resolve(mount).await {
                error!("Failed to initialize PKI mount {}: {}", mount, e);
                process::exit(1);
            }
            info!("Serving fixed PKI mount: {}", mount);
        }
        MountSelector::Path { levels } => {
            info!("Auto-mount enabled: {} path segment(s) name the mount", levels);
        }
    }

    let server = match OcspServer::new(bind_addr, AppState::new(selector, registry)).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "vault_ocsp",
            "--auto-mount",
            "2",
            "--responder-cert",
            "cert.pem",
            "--vault-timeout",
            "5",
        ])
        .unwrap();

        let mut config = Config {
            auto_mount: 1,
            pki_mount: "intermediate".to_string(),
            ..Config::default()
        };
        cli.apply(&mut config);

        assert_eq!(config.auto_mount, 2);
        assert_eq!(config.pki_mount, "intermediate");
        assert_eq!(config.responder_cert.as_deref(), Some("cert.pem"));
        assert_eq!(config.vault_timeout_secs, 5);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
