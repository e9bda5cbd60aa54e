//! Command implementations.

pub mod create_ca;
pub mod create_device;

use std::time::Duration;

use fleetca_ca::ProvisioningConfig;
use fleetca_client::RegistryClient;

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Registry base URL
    pub registry_url: Option<String>,

    /// Registry bearer token
    pub registry_token: Option<String>,

    /// Registry request timeout
    pub timeout: Option<Duration>,

    /// Workflow settings
    pub provisioning: ProvisioningConfig,

    /// Output format
    pub output_format: OutputFormat,
}

impl Context {
    /// Get the registry URL, returning an error if not set.
    pub fn require_registry_url(&self) -> anyhow::Result<&str> {
        self.registry_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "Registry URL required.\n\n\
                 Set it with one of:\n  \
                 1. --registry-url <URL>\n  \
                 2. FLEETCA_REGISTRY_URL environment variable\n  \
                 3. [registry] url = \"...\" in the config file"
            )
        })
    }

    /// Create a registry client from the configured settings.
    pub fn registry(&self) -> anyhow::Result<RegistryClient> {
        let mut builder = RegistryClient::builder(self.require_registry_url()?);
        if let Some(token) = &self.registry_token {
            builder = builder.token(token);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}
