//! Process-wide assembly of the provisioning subsystem.
//!
//! One registry and one gateway, constructed at startup and threaded by
//! handle into everything that needs them — never ambient globals.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dynagate_core::{ConnectionId, GateResult, TokenCipher};

use crate::config::ProviderConfig;
use crate::directory::ConnectionDirectory;
use crate::gateway::AuthenticationGateway;
use crate::registry::ConnectionRegistry;

/// The dynamic-connection provider a host embeds.
pub struct DynamicConnectionProvider {
    registry: Arc<ConnectionRegistry>,
    gateway: AuthenticationGateway,
    config: ProviderConfig,
}

impl DynamicConnectionProvider {
    /// Assemble the provider from explicit parts.
    pub fn new(config: ProviderConfig, cipher: TokenCipher) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let gateway = AuthenticationGateway::new(registry.clone(), cipher, &config);
        Self {
            registry,
            gateway,
            config,
        }
    }

    /// Assemble the provider at process start: optional TOML config plus
    /// the encryption key from the environment. Key problems are fatal.
    pub fn from_env(config_path: Option<&Path>) -> GateResult<Self> {
        let config = ProviderConfig::load(config_path)?;
        let cipher = TokenCipher::from_env()?;
        Ok(Self::new(config, cipher))
    }

    /// The authentication entry point for the host's SPI.
    pub fn gateway(&self) -> &AuthenticationGateway {
        &self.gateway
    }

    /// The shared registry handle. The proxy/tunnel layer reads full
    /// descriptors (credentials included) here — the single point where
    /// stored secrets leave the subsystem.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// A fresh directory for one host session. Views cached inside it live
    /// as long as the session keeps the directory.
    pub fn directory(&self) -> ConnectionDirectory {
        ConnectionDirectory::new(self.registry.clone())
    }

    /// Drop connections older than the configured maximum age. Intended to
    /// be called periodically by the host's housekeeping task.
    pub async fn sweep(&self) -> Vec<ConnectionId> {
        self.registry
            .sweep(Duration::from_secs(self.config.connection_max_age))
            .await
    }
}
