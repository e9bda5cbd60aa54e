//! On-disk artifact naming.

use std::path::{Path, PathBuf};

use fleetca_core::{ProvisionError, Result};

const CA_KEY: &str = "sampleCACertificate.key";
const CA_CERT: &str = "sampleCACertificate.pem";
const CA_SERIAL: &str = "sampleCACertificate.srl";
const VERIFICATION_KEY: &str = "privateKeyVerification.key";
const VERIFICATION_CSR: &str = "privateKeyVerification.csr";
const VERIFICATION_CERT: &str = "privateKeyVerification.crt";
const TRUST_ROOT: &str = "root.cert";

/// Fixed file names inside one provisioning directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    dir: PathBuf,
}

impl ArtifactLayout {
    /// Layout rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Provisioning directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if it does not exist
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    #[must_use]
    pub fn ca_key(&self) -> PathBuf {
        self.dir.join(CA_KEY)
    }

    /// Freshly signed CA certificate, before it is moved to the trust root
    #[must_use]
    pub fn ca_cert(&self) -> PathBuf {
        self.dir.join(CA_CERT)
    }

    #[must_use]
    pub fn serial_state(&self) -> PathBuf {
        self.dir.join(CA_SERIAL)
    }

    #[must_use]
    pub fn verification_key(&self) -> PathBuf {
        self.dir.join(VERIFICATION_KEY)
    }

    #[must_use]
    pub fn verification_csr(&self) -> PathBuf {
        self.dir.join(VERIFICATION_CSR)
    }

    #[must_use]
    pub fn verification_cert(&self) -> PathBuf {
        self.dir.join(VERIFICATION_CERT)
    }

    /// Well-known trust root alias
    #[must_use]
    pub fn trust_root(&self) -> PathBuf {
        self.dir.join(TRUST_ROOT)
    }

    /// `{id}_deviceCert.key`; `id` must already be validated
    #[must_use]
    pub fn device_key(&self, device_id: &str) -> PathBuf {
        self.dir.join(format!("{device_id}_deviceCert.key"))
    }

    #[must_use]
    pub fn device_csr(&self, device_id: &str) -> PathBuf {
        self.dir.join(format!("{device_id}_deviceCert.csr"))
    }

    #[must_use]
    pub fn device_cert(&self, device_id: &str) -> PathBuf {
        self.dir.join(format!("{device_id}_deviceCert.crt"))
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Reject device ids that are empty or would escape the provisioning
/// directory once embedded in a file name.
pub fn validate_device_id(device_id: &str) -> Result<()> {
    if device_id.trim().is_empty() {
        return Err(ProvisionError::InvalidIdentity(
            "device id must not be empty".to_string(),
        ));
    }
    if device_id.contains(['/', '\\', '\0']) || device_id.contains("..") {
        return Err(ProvisionError::InvalidIdentity(format!(
            "device id '{}' contains path separators",
            device_id.escape_default()
        )));
    }
    Ok(())
}
