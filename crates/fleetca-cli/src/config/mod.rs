//! Configuration management.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use fleetca_ca::ProvisioningConfig;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// CLI configuration.
///
/// ```toml
/// output_format = "pretty"
///
/// [registry]
/// url = "https://registry.example.com/api"
/// timeout_secs = 30
///
/// [provisioning]
/// output_dir = "/var/lib/fleetca"
/// validity_days = 365
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Registry connection settings.
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Settings shared by both workflows.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Registry connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Base URL of the registry API.
    pub url: Option<String>,

    /// Bearer token. Prefer `FLEETCA_REGISTRY_TOKEN` over storing it here.
    pub token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the default config file path.
    pub fn path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "fleetca")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config
            .provisioning
            .validate()
            .with_context(|| format!("invalid [provisioning] section in {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetca_ca::{KeySpec, TrustRootPolicy};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("none.toml"))).unwrap();
        assert!(config.registry.url.is_none());
        assert_eq!(config.provisioning.validity_days, 365);
    }

    #[test]
    fn test_load_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
output_format = "json"

[registry]
url = "https://registry.example.com"
timeout_secs = 5

[provisioning]
trust_root_policy = "warn"

[provisioning.key]
algorithm = "ecdsa-p256"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.output_format, Some(OutputFormat::Json));
        assert_eq!(config.registry.url.as_deref(), Some("https://registry.example.com"));
        assert_eq!(config.registry.timeout_secs, Some(5));
        assert_eq!(config.provisioning.trust_root_policy, TrustRootPolicy::Warn);
        assert_eq!(config.provisioning.key, KeySpec::EcdsaP256);
    }

    #[test]
    fn test_invalid_provisioning_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provisioning]\nvalidity_days = 0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
