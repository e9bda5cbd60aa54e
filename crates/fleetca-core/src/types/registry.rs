use serde::{Deserialize, Serialize};

/// One-time challenge value issued by the registry.
///
/// It is consumed exactly once, as the common name of the verification
/// certificate that proves control of the CA key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationCode(String);

impl RegistrationCode {
    /// Wrap a code returned by the registry
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Borrow the raw code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the code, yielding the common name for the verification subject
    #[must_use]
    pub fn into_common_name(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RegistrationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response body of `GET registration-code`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCodeResponse {
    /// The challenge value
    pub registration_code: String,
}

/// Request body of `POST register-ca`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCaRequest {
    /// PEM of the self-signed CA certificate
    pub ca_certificate: String,

    /// PEM of the verification certificate (CN = registration code)
    pub verification_certificate: String,

    /// Activate the CA immediately
    pub activate: bool,

    /// Allow devices with certificates from this CA to register on first connect
    pub auto_register: bool,
}

impl RegisterCaRequest {
    /// Build an activating, auto-registering request
    #[must_use]
    pub fn new(ca_certificate: impl Into<String>, verification_certificate: impl Into<String>) -> Self {
        Self {
            ca_certificate: ca_certificate.into(),
            verification_certificate: verification_certificate.into(),
            activate: true,
            auto_register: true,
        }
    }
}

/// Registry endpoint class requested from `GET endpoint`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointType {
    /// Device data plane (MQTT / HTTPS publish)
    #[default]
    DataPlane,
    /// Credential provider endpoint
    CredentialProvider,
    /// Jobs endpoint
    Jobs,
}

impl EndpointType {
    /// Query-string value for this endpoint type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DataPlane => "data-plane",
            Self::CredentialProvider => "credential-provider",
            Self::Jobs => "jobs",
        }
    }
}

impl std::fmt::Display for EndpointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved registry endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Host name devices connect to
    #[serde(rename = "endpointAddress")]
    pub address: String,
}

impl EndpointDescriptor {
    /// Create a descriptor for the given address
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}
