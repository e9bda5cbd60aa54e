//! Provisioning workflows.
//!
//! Each workflow is a strictly sequential state machine. A failed step halts
//! the run in the last completed state; files written by earlier steps stay
//! on disk and a re-run overwrites them.

mod ca;
mod device;

use serde::Serialize;

pub use ca::{CaProvisioned, CaProvisioning, CaProvisioningState};
pub use device::{DeviceProvisioned, DeviceProvisioning, DeviceProvisioningState};

/// Non-fatal conditions surfaced to the operator alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvisioningWarning {
    /// Device provisioning started without a trust root in place
    MissingTrustRoot {
        /// Where the trust root alias was expected
        path: String,
    },
}

impl std::fmt::Display for ProvisioningWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTrustRoot { path } => write!(
                f,
                "trust root {path} not found; provision a CA before issuing device certificates"
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use fleetca_core::{
        EndpointDescriptor, EndpointType, RegistrationCode, Registry, RegistryError,
    };

    use crate::keys::KeySpec;
    use crate::ProvisioningConfig;

    /// In-memory registry recording every CA registration.
    #[derive(Debug, Default)]
    pub(crate) struct FakeRegistry {
        pub(crate) fail_register: bool,
        pub(crate) fail_endpoint: bool,
        pub(crate) codes_issued: Mutex<u32>,
        pub(crate) registered: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Registry for FakeRegistry {
        async fn fetch_registration_code(&self) -> Result<RegistrationCode, RegistryError> {
            let mut issued = self.codes_issued.lock().unwrap();
            *issued += 1;
            Ok(RegistrationCode::new(format!("regcode{issued:04}")))
        }

        async fn register_ca(
            &self,
            ca_certificate_pem: &str,
            verification_certificate_pem: &str,
        ) -> Result<(), RegistryError> {
            if self.fail_register {
                return Err(RegistryError::Api {
                    code: 409,
                    message: "CA already registered".to_string(),
                });
            }
            self.registered.lock().unwrap().push((
                ca_certificate_pem.to_string(),
                verification_certificate_pem.to_string(),
            ));
            Ok(())
        }

        async fn resolve_endpoint(
            &self,
            endpoint_type: EndpointType,
        ) -> Result<EndpointDescriptor, RegistryError> {
            if self.fail_endpoint {
                return Err(RegistryError::Connection("connection refused".to_string()));
            }
            Ok(EndpointDescriptor::new(format!(
                "{}.iot.example.com",
                endpoint_type.as_str()
            )))
        }
    }

    /// Config writing into `dir` with fast ECDSA keys.
    pub(crate) fn config(dir: &std::path::Path) -> ProvisioningConfig {
        ProvisioningConfig {
            output_dir: dir.to_path_buf(),
            key: KeySpec::EcdsaP256,
            ..ProvisioningConfig::default()
        }
    }
}
