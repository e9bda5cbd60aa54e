//! Device provisioning: issue a device certificate under the trust root.

use std::path::PathBuf;

use fleetca_core::{ConnectionDescriptor, ProvisionError, Registry, Result};
use serde::Serialize;
use tracing::{info, warn};

use super::ProvisioningWarning;
use crate::certificate::Certificate;
use crate::config::{ProvisioningConfig, TrustRootPolicy};
use crate::issuer::IssuerState;
use crate::keys::KeyPairGenerator;
use crate::layout::validate_device_id;
use crate::request::CertificateRequestBuilder;
use crate::signer::CertificateSigner;
use crate::trust_root::TrustRootStore;

/// Progress of a device provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProvisioningState {
    Start,
    IdentityAccepted,
    DeviceKeyGenerated,
    CsrBuilt,
    DeviceCertSigned,
    /// Terminal: the connection descriptor is available
    EndpointResolved,
}

/// Artifacts of a completed device provisioning run.
#[derive(Debug, Clone)]
pub struct DeviceProvisioned {
    /// Device certificate issued by the trust root
    pub certificate: Certificate,
    pub key_path: PathBuf,
    pub csr_path: PathBuf,
    pub cert_path: PathBuf,
    /// How the device reaches the registry
    pub connection: ConnectionDescriptor,
    /// Non-fatal conditions met along the way
    pub warnings: Vec<ProvisioningWarning>,
}

/// Issues one device certificate per run.
///
/// The device identifier is passed in; prompting for it is the caller's job.
pub struct DeviceProvisioning<'a, R: Registry + ?Sized> {
    config: &'a ProvisioningConfig,
    registry: &'a R,
    state: DeviceProvisioningState,
    warnings: Vec<ProvisioningWarning>,
}

impl<'a, R: Registry + ?Sized> DeviceProvisioning<'a, R> {
    #[must_use]
    pub const fn new(config: &'a ProvisioningConfig, registry: &'a R) -> Self {
        Self {
            config,
            registry,
            state: DeviceProvisioningState::Start,
            warnings: Vec::new(),
        }
    }

    /// Last completed state
    #[must_use]
    pub const fn state(&self) -> DeviceProvisioningState {
        self.state
    }

    /// Warnings recorded so far, including by a run that later failed
    #[must_use]
    pub fn warnings(&self) -> &[ProvisioningWarning] {
        &self.warnings
    }

    /// Provision `device_id`, used verbatim as the certificate CN.
    ///
    /// An unusable identifier fails before any key material is generated.
    pub async fn run(&mut self, device_id: &str) -> Result<DeviceProvisioned> {
        let config = self.config;
        let layout = config.layout();

        validate_device_id(device_id)?;
        let subject = config.subject_template.with_common_name(device_id);
        subject.validate()?;
        self.advance(DeviceProvisioningState::IdentityAccepted);

        let store = TrustRootStore::new(&layout);
        if !store.exists() {
            let path = store.alias_path().display().to_string();
            match config.trust_root_policy {
                TrustRootPolicy::Require => return Err(ProvisionError::NoTrustRoot { path }),
                TrustRootPolicy::Warn => {
                    warn!(trust_root = %path, "no trust root, device certificate cannot be issued yet");
                    self.warnings
                        .push(ProvisioningWarning::MissingTrustRoot { path });
                }
            }
        }

        layout.ensure_dir()?;
        let key = KeyPairGenerator::new(config.key).generate()?;
        let key_path = layout.device_key(device_id);
        key.save(&key_path)?;
        self.advance(DeviceProvisioningState::DeviceKeyGenerated);

        let request = CertificateRequestBuilder::new(subject).build(&key)?;
        let csr_path = layout.device_csr(device_id);
        request.save(&csr_path)?;
        self.advance(DeviceProvisioningState::CsrBuilt);

        let root = store.load()?;
        let issuer = IssuerState::open(layout.serial_state(), &root.key)?;
        let certificate = CertificateSigner::new(&issuer).sign(
            request,
            &root.certificate,
            &root.key,
            config.validity_days,
        )?;
        certificate.verify_issued_by(&root.certificate)?;
        let cert_path = layout.device_cert(device_id);
        certificate.save(&cert_path)?;
        self.advance(DeviceProvisioningState::DeviceCertSigned);

        let endpoint = self.registry.resolve_endpoint(config.endpoint_type).await?;
        self.advance(DeviceProvisioningState::EndpointResolved);

        let connection = ConnectionDescriptor {
            device_id: device_id.to_string(),
            endpoint,
            port: config.device_port,
            topic: config.device_topic(device_id),
            ca_path: store.alias_path().to_path_buf(),
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
        };

        Ok(DeviceProvisioned {
            certificate,
            key_path,
            csr_path,
            cert_path,
            connection,
            warnings: self.warnings.clone(),
        })
    }

    fn advance(&mut self, next: DeviceProvisioningState) {
        info!(workflow = "device", from = ?self.state, to = ?next, "step complete");
        self.state = next;
    }
}
