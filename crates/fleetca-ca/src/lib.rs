//! # fleetca-ca
//!
//! Certificate Authority engine for IoT device fleets.
//!
//! ## Architecture
//!
//! ```text
//! ROOT CA (self-signed, CA:true, persisted as the trust root alias)
//!        │
//!        ├── Verification cert (CN = registry registration code)
//!        └── Device certs (CN = device identifier)
//! ```
//!
//! Key generation, CSR construction and X.509 signing are separate steps:
//!
//! - [`KeyPairGenerator`] produces key material for any role
//! - [`CertificateRequestBuilder`] turns a key and an [`Identity`] into a CSR
//! - [`CertificateSigner`] self-signs a root or signs a CSR with an issuer,
//!   drawing serials from the issuer's [`IssuerState`]
//!
//! The two workflows in [`workflow`] chain those steps together and talk to
//! the registry through the [`fleetca_core::Registry`] trait.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fleetca_ca::{CaExtensions, CertificateRequestBuilder, CertificateSigner, IssuerState, KeyPairGenerator};
//! use fleetca_core::Identity;
//!
//! let ca_key = KeyPairGenerator::default().generate()?;
//! let state = IssuerState::create("ca.srl", &ca_key)?;
//! let signer = CertificateSigner::new(&state);
//!
//! let request = CertificateRequestBuilder::new(Identity::default().with_common_name("MyRootCA"))
//!     .build(&ca_key)?;
//! let root = signer.self_sign(request, &ca_key, 365, &CaExtensions::default())?;
//!
//! let device_key = KeyPairGenerator::default().generate()?;
//! let csr = CertificateRequestBuilder::new(Identity::default().with_common_name("sensor-42"))
//!     .build(&device_key)?;
//! let device = signer.sign(csr, &root, &ca_key, 365)?;
//! device.verify_issued_by(&root)?;
//! ```

mod certificate;
mod config;
mod issuer;
mod keys;
mod layout;
mod request;
mod signer;
mod storage;
mod trust_root;
pub mod workflow;

pub use certificate::{Certificate, CertificateInfo, CertificateType};
pub use config::{ProvisioningConfig, TrustRootPolicy};
pub use issuer::IssuerState;
pub use keys::{KeyPair, KeyPairGenerator, KeySpec, DEFAULT_RSA_BITS};
pub use layout::{validate_device_id, ArtifactLayout};
pub use request::{CertificateRequest, CertificateRequestBuilder};
pub use signer::{CaExtensions, CertificateSigner, DEFAULT_VALIDITY_DAYS};
pub use trust_root::{TrustRoot, TrustRootStore};
pub use workflow::{
    CaProvisioned, CaProvisioning, CaProvisioningState, DeviceProvisioned, DeviceProvisioning,
    DeviceProvisioningState, ProvisioningWarning,
};

pub use fleetca_core::{Identity, ProvisionError, Result};
