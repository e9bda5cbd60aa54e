//! [`Registry`] implementation over HTTP.

use async_trait::async_trait;
use fleetca_core::{
    EndpointDescriptor, EndpointType, RegisterCaRequest, RegistrationCode,
    RegistrationCodeResponse, Registry, RegistryError,
};

use crate::client::RegistryClient;

#[async_trait]
impl Registry for RegistryClient {
    async fn fetch_registration_code(&self) -> Result<RegistrationCode, RegistryError> {
        let response: RegistrationCodeResponse =
            self.get_with_query("registration-code", &[]).await?;
        if response.registration_code.trim().is_empty() {
            return Err(RegistryError::MalformedResponse(
                "empty registration code".to_string(),
            ));
        }
        Ok(RegistrationCode::new(response.registration_code))
    }

    async fn register_ca(
        &self,
        ca_certificate_pem: &str,
        verification_certificate_pem: &str,
    ) -> Result<(), RegistryError> {
        let body = RegisterCaRequest::new(ca_certificate_pem, verification_certificate_pem);
        self.post_json("register-ca", &body).await
    }

    async fn resolve_endpoint(
        &self,
        endpoint_type: EndpointType,
    ) -> Result<EndpointDescriptor, RegistryError> {
        let endpoint: EndpointDescriptor = self
            .get_with_query("endpoint", &[("type", endpoint_type.as_str())])
            .await?;
        if endpoint.address.trim().is_empty() {
            return Err(RegistryError::MalformedResponse(
                "empty endpoint address".to_string(),
            ));
        }
        Ok(endpoint)
    }
}
