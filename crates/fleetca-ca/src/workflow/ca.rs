//! CA provisioning: create a root, prove ownership to the registry, persist
//! it as the trust root.

use std::path::PathBuf;

use fleetca_core::{RegistrationCode, Registry, Result};
use serde::Serialize;
use tracing::info;

use crate::certificate::Certificate;
use crate::config::ProvisioningConfig;
use crate::issuer::IssuerState;
use crate::keys::KeyPairGenerator;
use crate::request::CertificateRequestBuilder;
use crate::signer::{CaExtensions, CertificateSigner};
use crate::trust_root::TrustRootStore;

/// Progress of a CA provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaProvisioningState {
    Start,
    CaKeyGenerated,
    CaCertSelfSigned,
    VerificationKeyGenerated,
    RegistrationCodeFetched,
    VerificationCertSigned,
    CaRegistered,
    /// Terminal: the new CA is the active trust root
    RootPersisted,
}

/// Artifacts of a completed CA provisioning run.
#[derive(Debug, Clone)]
pub struct CaProvisioned {
    /// Self-signed CA certificate, now the trust root
    pub ca_certificate: Certificate,
    /// Certificate proving control of the CA key (CN = registration code)
    pub verification_certificate: Certificate,
    /// The code consumed by the verification certificate
    pub registration_code: RegistrationCode,
    pub ca_key_path: PathBuf,
    /// Trust root alias the CA certificate was moved to
    pub trust_root_path: PathBuf,
    pub verification_key_path: PathBuf,
    pub verification_cert_path: PathBuf,
}

/// Creates a root CA and registers it with the registry.
///
/// Intended for one run at a time per output directory. The issuer state and
/// trust root alias are lock-guarded, but a concurrent run still supersedes
/// whichever root was persisted first.
pub struct CaProvisioning<'a, R: Registry + ?Sized> {
    config: &'a ProvisioningConfig,
    registry: &'a R,
    state: CaProvisioningState,
}

impl<'a, R: Registry + ?Sized> CaProvisioning<'a, R> {
    #[must_use]
    pub const fn new(config: &'a ProvisioningConfig, registry: &'a R) -> Self {
        Self {
            config,
            registry,
            state: CaProvisioningState::Start,
        }
    }

    /// Last completed state
    #[must_use]
    pub const fn state(&self) -> CaProvisioningState {
        self.state
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run(&mut self) -> Result<CaProvisioned> {
        let config = self.config;
        let layout = config.layout();
        layout.ensure_dir()?;
        let generator = KeyPairGenerator::new(config.key);

        let ca_key = generator.generate()?;
        ca_key.save(layout.ca_key())?;
        let issuer = IssuerState::create(layout.serial_state(), &ca_key)?;
        let signer = CertificateSigner::new(&issuer);
        self.advance(CaProvisioningState::CaKeyGenerated);

        let ca_request = CertificateRequestBuilder::new(config.ca_identity.clone()).build(&ca_key)?;
        let ca_certificate = signer.self_sign(
            ca_request,
            &ca_key,
            config.validity_days,
            &CaExtensions::default(),
        )?;
        ca_certificate.verify_issued_by(&ca_certificate)?;
        ca_certificate.save(layout.ca_cert())?;
        self.advance(CaProvisioningState::CaCertSelfSigned);

        let verification_key = generator.generate()?;
        verification_key.save(layout.verification_key())?;
        self.advance(CaProvisioningState::VerificationKeyGenerated);

        let registration_code = self.registry.fetch_registration_code().await?;
        self.advance(CaProvisioningState::RegistrationCodeFetched);

        let subject = config
            .subject_template
            .with_common_name(registration_code.as_str());
        let verification_request = CertificateRequestBuilder::new(subject).build(&verification_key)?;
        verification_request.save(layout.verification_csr())?;
        let verification_certificate = signer.sign(
            verification_request,
            &ca_certificate,
            &ca_key,
            config.validity_days,
        )?;
        verification_certificate.verify_issued_by(&ca_certificate)?;
        verification_certificate.save(layout.verification_cert())?;
        self.advance(CaProvisioningState::VerificationCertSigned);

        self.registry
            .register_ca(ca_certificate.pem(), verification_certificate.pem())
            .await?;
        self.advance(CaProvisioningState::CaRegistered);

        let trust_root_path = TrustRootStore::new(&layout).persist(&layout.ca_cert())?;
        self.advance(CaProvisioningState::RootPersisted);

        Ok(CaProvisioned {
            ca_certificate,
            verification_certificate,
            registration_code,
            ca_key_path: layout.ca_key(),
            trust_root_path,
            verification_key_path: layout.verification_key(),
            verification_cert_path: layout.verification_cert(),
        })
    }

    fn advance(&mut self, next: CaProvisioningState) {
        info!(workflow = "ca", from = ?self.state, to = ?next, "step complete");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateType;
    use crate::layout::ArtifactLayout;
    use crate::workflow::testing::{config, FakeRegistry};
    use fleetca_core::ProvisionError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_full_run() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let registry = FakeRegistry::default();

        let mut workflow = CaProvisioning::new(&config, &registry);
        let out = workflow.run().await.unwrap();
        assert_eq!(workflow.state(), CaProvisioningState::RootPersisted);

        let ca = &out.ca_certificate;
        assert_eq!(ca.subject().common_name, "MyRootCA");
        assert_eq!(ca.subject(), ca.issuer());
        assert_eq!(ca.info().cert_type, CertificateType::Root);
        assert!(ca.info().ca_constraint_critical);

        let verification = &out.verification_certificate;
        assert_eq!(verification.subject().common_name, out.registration_code.as_str());
        assert_eq!(verification.issuer(), ca.subject());
        verification.verify_issued_by(ca).unwrap();

        let registered = registry.registered.lock().unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].0, ca.pem());
        assert_eq!(registered[0].1, verification.pem());

        let layout = ArtifactLayout::new(dir.path());
        assert!(layout.ca_key().exists());
        assert!(layout.verification_key().exists());
        assert!(layout.verification_csr().exists());
        assert!(layout.verification_cert().exists());
        assert!(!layout.ca_cert().exists());
        assert_eq!(Certificate::load(&out.trust_root_path).unwrap(), *ca);
    }

    #[tokio::test]
    async fn test_second_run_supersedes_root() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let registry = FakeRegistry::default();

        let first = CaProvisioning::new(&config, &registry).run().await.unwrap();
        let second = CaProvisioning::new(&config, &registry).run().await.unwrap();

        assert_ne!(first.ca_certificate, second.ca_certificate);
        assert_ne!(first.ca_certificate.info().serial, second.ca_certificate.info().serial);

        let active = Certificate::load(ArtifactLayout::new(dir.path()).trust_root()).unwrap();
        assert_eq!(active, second.ca_certificate);
        assert_ne!(active, first.ca_certificate);
        assert_ne!(first.registration_code, second.registration_code);
    }

    #[tokio::test]
    async fn test_registry_failure_halts_before_persist() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let registry = FakeRegistry {
            fail_register: true,
            ..FakeRegistry::default()
        };

        let mut workflow = CaProvisioning::new(&config, &registry);
        let err = workflow.run().await.unwrap_err();

        assert!(matches!(err, ProvisionError::Registry(_)));
        assert_eq!(workflow.state(), CaProvisioningState::VerificationCertSigned);

        let layout = ArtifactLayout::new(dir.path());
        assert!(layout.ca_cert().exists());
        assert!(layout.verification_cert().exists());
        assert!(!layout.trust_root().exists());
    }

    #[tokio::test]
    async fn test_invalid_ca_identity_stops_after_key() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.ca_identity.common_name = String::new();
        let registry = FakeRegistry::default();

        let mut workflow = CaProvisioning::new(&config, &registry);
        let err = workflow.run().await.unwrap_err();

        assert!(matches!(err, ProvisionError::InvalidIdentity(_)));
        assert_eq!(workflow.state(), CaProvisioningState::CaKeyGenerated);
        assert_eq!(*registry.codes_issued.lock().unwrap(), 0);
    }
}
