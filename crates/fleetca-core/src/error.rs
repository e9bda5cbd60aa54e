use thiserror::Error;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors that abort a provisioning step
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Key material could not be generated or loaded
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Subject identity is unusable (empty common name, bad device id)
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// CSR was malformed or the signature could not be produced
    #[error("signing failed: {0}")]
    Signing(String),

    /// The issuer certificate is not a CA (`basicConstraints CA:true` missing)
    #[error("issuer '{subject}' is not a certificate authority")]
    IssuerNotCa {
        /// Subject of the rejected issuer certificate
        subject: String,
    },

    /// The remote registry rejected or failed a request
    #[error("registry request failed: {0}")]
    Registry(#[from] RegistryError),

    /// No trust root is available to issue device certificates
    #[error("no trust root found at {path}; run CA provisioning first")]
    NoTrustRoot {
        /// Path where the trust root alias was expected
        path: String,
    },

    /// Serial number uniqueness could not be guaranteed
    #[error("serial integrity violation: {0}")]
    SerialIntegrity(String),

    /// Another process holds the issuer state lock
    #[error("issuer state is locked by another process: {path}")]
    StateLocked {
        /// Path of the lock file
        path: String,
    },

    /// Certificate could not be decoded or inspected
    #[error("certificate error: {0}")]
    Certificate(String),

    /// A freshly issued certificate does not chain to its issuer
    #[error("chain verification failed: {0}")]
    ChainVerification(String),

    /// Provisioning configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Returns true if the error came from the registry boundary
    #[must_use]
    pub const fn is_registry_error(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if the error signals a broken integrity invariant that
    /// must not be retried
    #[must_use]
    pub const fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::SerialIntegrity(_) | Self::ChainVerification(_) | Self::IssuerNotCa { .. }
        )
    }
}

/// Errors returned by the remote registry boundary
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Authentication failed - missing or rejected credentials
    #[error("authentication failed: registry rejected the credentials")]
    Unauthorized,

    /// Registry returned an error response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the registry
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Response body did not match the expected contract
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid registry URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl RegistryError {
    /// Returns true if a caller-side retry policy may retry this error
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }

    /// Returns true if the error is due to authentication
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the HTTP status code if the registry answered
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_wraps_into_provision_error() {
        let err: ProvisionError = RegistryError::Unauthorized.into();
        assert!(err.is_registry_error());
        assert_eq!(
            err.to_string(),
            "registry request failed: authentication failed: registry rejected the credentials"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RegistryError::Unauthorized.status_code(), Some(401));
        let api = RegistryError::Api {
            code: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(api.status_code(), Some(503));
        assert_eq!(RegistryError::Timeout(30).status_code(), None);
    }

    #[test]
    fn test_retryable() {
        assert!(RegistryError::Timeout(5).is_retryable());
        assert!(RegistryError::Connection("refused".into()).is_retryable());
        assert!(!RegistryError::Unauthorized.is_retryable());
    }

    #[test]
    fn test_integrity_violations() {
        assert!(ProvisionError::SerialIntegrity("dup".into()).is_integrity_violation());
        assert!(ProvisionError::IssuerNotCa {
            subject: "CN=leaf".into()
        }
        .is_integrity_violation());
        assert!(!ProvisionError::Signing("bad csr".into()).is_integrity_violation());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProvisionError>();
        assert_send_sync::<RegistryError>();
    }
}
