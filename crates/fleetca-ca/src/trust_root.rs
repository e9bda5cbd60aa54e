//! The active trust root: the CA certificate behind the well-known alias.

use std::path::{Path, PathBuf};

use fleetca_core::{ProvisionError, Result};
use tracing::{debug, info};

use crate::certificate::Certificate;
use crate::keys::KeyPair;
use crate::layout::ArtifactLayout;
use crate::storage::FileLock;

/// A loaded trust root with its issuer key.
#[derive(Debug)]
pub struct TrustRoot {
    /// CA certificate read from the alias
    pub certificate: Certificate,
    /// Private key matching `certificate`
    pub key: KeyPair,
}

/// Owns the trust root alias inside a provisioning directory.
///
/// Exactly one root is active. [`TrustRootStore::persist`] replaces the alias
/// atomically, so a new CA silently supersedes the previous one.
#[derive(Debug, Clone)]
pub struct TrustRootStore {
    alias: PathBuf,
    key: PathBuf,
}

impl TrustRootStore {
    #[must_use]
    pub fn new(layout: &ArtifactLayout) -> Self {
        Self {
            alias: layout.trust_root(),
            key: layout.ca_key(),
        }
    }

    /// Path of the alias
    #[must_use]
    pub fn alias_path(&self) -> &Path {
        &self.alias
    }

    /// Whether both the alias and the issuer key are present
    #[must_use]
    pub fn exists(&self) -> bool {
        self.alias.is_file() && self.key.is_file()
    }

    /// Move a freshly signed CA certificate onto the alias.
    ///
    /// The rename is atomic: readers see either the old root or the new
    /// one. Last writer wins.
    pub fn persist(&self, ca_cert: &Path) -> Result<PathBuf> {
        let _lock = FileLock::acquire(&self.alias)?;
        if self.alias.exists() {
            info!(alias = %self.alias.display(), "replacing existing trust root");
        }
        std::fs::rename(ca_cert, &self.alias)?;
        debug!(from = %ca_cert.display(), to = %self.alias.display(), "persisted trust root");
        Ok(self.alias.clone())
    }

    /// Load the active root and its key.
    ///
    /// Fails with `NoTrustRoot` if either file is missing. The key must match
    /// the certificate and the certificate must be a valid self-signed CA.
    pub fn load(&self) -> Result<TrustRoot> {
        if !self.exists() {
            return Err(ProvisionError::NoTrustRoot {
                path: self.alias.display().to_string(),
            });
        }

        let _lock = FileLock::acquire(&self.alias)?;
        let certificate = Certificate::load(&self.alias)?;
        let key = KeyPair::load(&self.key)?;

        if certificate.public_key_raw()? != key.public_key_raw() {
            return Err(ProvisionError::Signing(format!(
                "{} does not belong to trust root {}",
                self.key.display(),
                self.alias.display()
            )));
        }
        certificate.verify_issued_by(&certificate)?;

        Ok(TrustRoot { certificate, key })
    }
}
