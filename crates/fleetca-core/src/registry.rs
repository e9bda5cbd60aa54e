//! The registry seam consumed by the provisioning workflows.

use async_trait::async_trait;

use crate::{EndpointDescriptor, EndpointType, RegistrationCode, RegistryError};

/// Remote IoT registry that accepts CA registrations.
///
/// Every call is a single remote request. Implementations must not retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch a fresh registration code for a CA ownership challenge
    async fn fetch_registration_code(&self) -> Result<RegistrationCode, RegistryError>;

    /// Register the CA together with its verification certificate (both PEM)
    async fn register_ca(
        &self,
        ca_certificate_pem: &str,
        verification_certificate_pem: &str,
    ) -> Result<(), RegistryError>;

    /// Resolve the endpoint devices connect to
    async fn resolve_endpoint(
        &self,
        endpoint_type: EndpointType,
    ) -> Result<EndpointDescriptor, RegistryError>;
}
