//! Provider configuration: TOML file + built-in defaults.
//!
//! The AES-256 token key is deliberately not part of the file — it comes
//! from the environment at process start and its absence is fatal (see
//! [`dynagate_core::TokenCipher::from_env`]).

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use dynagate_core::{GateError, GateResult};

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: ProviderSection,
}

/// `[provider]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_ticket_ttl")]
    pub ticket_ttl: u64,
    #[serde(default = "default_connection_max_age")]
    pub connection_max_age: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            ticket_ttl: default_ticket_ttl(),
            connection_max_age: default_connection_max_age(),
        }
    }
}

fn default_ticket_ttl() -> u64 {
    86400
}
fn default_connection_max_age() -> u64 {
    3600
}

/// Resolved provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Session ticket time-to-live in seconds.
    pub ticket_ttl: u64,
    /// Age in seconds beyond which the sweeper drops a connection.
    pub connection_max_age: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            ticket_ttl: default_ticket_ttl(),
            connection_max_age: default_connection_max_age(),
        }
    }
}

impl ProviderConfig {
    /// Load config from a TOML file; a missing file means defaults.
    pub fn load(config_path: Option<&Path>) -> GateResult<Self> {
        let file_config = if let Some(path) = config_path {
            if path.exists() {
                info!(path = %path.display(), "loading config file");
                let content = std::fs::read_to_string(path)
                    .map_err(|e| GateError::Config(format!("cannot read config: {e}")))?;
                toml::from_str::<ConfigFile>(&content)
                    .map_err(|e| GateError::Config(format!("config parse error: {e}")))?
            } else {
                info!(path = %path.display(), "config file not found, using defaults");
                ConfigFile::default()
            }
        } else {
            ConfigFile::default()
        };

        Ok(Self {
            ticket_ttl: file_config.provider.ticket_ttl,
            connection_max_age: file_config.provider.connection_max_age,
        })
    }
}
