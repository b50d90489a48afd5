//! Command-line flags.
//!
//! Flags override whatever the optional `--config` file sets, so a bare
//! invocation behaves like the built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{normalize_bind_address, read_config, ConfigError};
use crate::config::schema::{ServiceConfig, TlsConfig};
use crate::config::validation::validate_config;

#[derive(Parser, Debug, Default)]
#[command(name = "ipecho")]
#[command(about = "Shows callers their IP address, hostname and location")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to static files and templates
    #[arg(long = "static")]
    pub static_dir: Option<String>,

    /// Path to GeoIP databases
    #[arg(long)]
    pub geoip: Option<String>,

    /// Address to listen on
    #[arg(long)]
    pub addr: Option<String>,

    /// Enable TLS
    #[arg(long)]
    pub tls: bool,

    /// TLS certificate file
    #[arg(long)]
    pub cert: Option<String>,

    /// TLS key file
    #[arg(long)]
    pub key: Option<String>,
}

impl Cli {
    /// Build the effective configuration: file (if any), then flags, then validation.
    pub fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServiceConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply(self, config: &mut ServiceConfig) {
        if let Some(dir) = self.static_dir {
            config.paths.static_dir = dir;
        }
        if let Some(dir) = self.geoip {
            config.paths.geoip_dir = dir;
        }
        if let Some(addr) = self.addr {
            config.listener.bind_address = addr;
        }
        config.listener.bind_address = normalize_bind_address(&config.listener.bind_address);

        // Certificate flags only matter together with --tls.
        if self.tls {
            let tls = config.listener.tls.get_or_insert_with(TlsConfig::default);
            if let Some(cert) = self.cert {
                tls.cert_path = cert;
            }
            if let Some(key) = self.key {
                tls.key_path = key;
            }
        }
    }
}
