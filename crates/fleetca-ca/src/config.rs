//! Provisioning configuration.

use std::path::{Path, PathBuf};

use fleetca_core::{EndpointType, Identity, ProvisionError, Result, DEFAULT_DEVICE_PORT};
use serde::{Deserialize, Serialize};

use crate::keys::KeySpec;
use crate::layout::ArtifactLayout;
use crate::signer::DEFAULT_VALIDITY_DAYS;

/// What device provisioning does when no trust root is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustRootPolicy {
    /// Fail with `NoTrustRoot` before any key is generated
    #[default]
    Require,
    /// Record a warning and continue; signing fails later without an issuer
    Warn,
}

impl std::str::FromStr for TrustRootPolicy {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "require" => Ok(Self::Require),
            "warn" => Ok(Self::Warn),
            other => Err(ProvisionError::Config(format!(
                "unknown trust root policy '{other}' (expected require or warn)"
            ))),
        }
    }
}

/// Settings shared by both provisioning workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Directory holding keys, certificates and issuer state
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Key algorithm for every generated key
    #[serde(default)]
    pub key: KeySpec,

    /// Certificate lifetime in days
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    /// Subject of the self-signed CA
    #[serde(default = "default_ca_identity")]
    pub ca_identity: Identity,

    /// Organisational fields for verification and device subjects; the CN
    /// is replaced per certificate
    #[serde(default)]
    pub subject_template: Identity,

    #[serde(default)]
    pub trust_root_policy: TrustRootPolicy,

    /// Endpoint devices connect to
    #[serde(default)]
    pub endpoint_type: EndpointType,

    #[serde(default = "default_device_port")]
    pub device_port: u16,

    /// Topic prefix; a device publishes to `<prefix>/<device id>`
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            key: KeySpec::default(),
            validity_days: default_validity_days(),
            ca_identity: default_ca_identity(),
            subject_template: Identity::default(),
            trust_root_policy: TrustRootPolicy::default(),
            endpoint_type: EndpointType::default(),
            device_port: default_device_port(),
            topic_prefix: default_topic_prefix(),
        }
    }
}

impl ProvisioningConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| ProvisionError::Config(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would only fail deep inside a workflow
    pub fn validate(&self) -> Result<()> {
        self.key
            .validate()
            .map_err(|e| ProvisionError::Config(e.to_string()))?;
        if self.validity_days == 0 {
            return Err(ProvisionError::Config(
                "validity_days must be at least 1".to_string(),
            ));
        }
        self.ca_identity
            .validate()
            .map_err(|e| ProvisionError::Config(format!("ca_identity: {e}")))?;
        Ok(())
    }

    /// Artifact layout rooted at the output directory
    #[must_use]
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.output_dir)
    }

    /// Publish topic for a device
    #[must_use]
    pub fn device_topic(&self, device_id: &str) -> String {
        format!("{}/{device_id}", self.topic_prefix.trim_end_matches('/'))
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

const fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

fn default_ca_identity() -> Identity {
    Identity::default().with_common_name("MyRootCA")
}

const fn default_device_port() -> u16 {
    DEFAULT_DEVICE_PORT
}

fn default_topic_prefix() -> String {
    String::from("devices")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ProvisioningConfig::default();
        assert_eq!(config.key, KeySpec::rsa(2048));
        assert_eq!(config.validity_days, 365);
        assert_eq!(config.ca_identity.common_name, "MyRootCA");
        assert_eq!(config.ca_identity.organization, "MyCompany");
        assert_eq!(config.trust_root_policy, TrustRootPolicy::Require);
        assert_eq!(config.endpoint_type, EndpointType::DataPlane);
        assert_eq!(config.device_port, 8443);
        assert_eq!(config.device_topic("sensor-42"), "devices/sensor-42");
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ProvisioningConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.validity_days, 365);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fleetca.toml");
        std::fs::write(
            &path,
            r#"
validity_days = 90
trust_root_policy = "warn"
topic_prefix = "fleet/"

[key]
algorithm = "ecdsa-p256"

[ca_identity]
organization = "Acme"
common_name = "Acme Root"
"#,
        )
        .unwrap();

        let config = ProvisioningConfig::load(&path).unwrap();
        assert_eq!(config.validity_days, 90);
        assert_eq!(config.key, KeySpec::EcdsaP256);
        assert_eq!(config.trust_root_policy, TrustRootPolicy::Warn);
        assert_eq!(config.ca_identity.organization, "Acme");
        assert!(config.ca_identity.country.is_empty());
        assert_eq!(config.device_topic("s1"), "fleet/s1");
        assert_eq!(config.device_port, 8443);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fleetca.toml");

        std::fs::write(&path, "validity_days = 0\n").unwrap();
        assert!(matches!(
            ProvisioningConfig::load(&path).unwrap_err(),
            ProvisionError::Config(_)
        ));

        std::fs::write(&path, "[key]\nalgorithm = \"rsa\"\nbits = 1024\n").unwrap();
        assert!(ProvisioningConfig::load(&path).is_err());

        std::fs::write(&path, "not toml = = =").unwrap();
        assert!(ProvisioningConfig::load(&path).is_err());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("warn".parse::<TrustRootPolicy>().unwrap(), TrustRootPolicy::Warn);
        assert_eq!("REQUIRE".parse::<TrustRootPolicy>().unwrap(), TrustRootPolicy::Require);
        assert!("maybe".parse::<TrustRootPolicy>().is_err());
    }
}
