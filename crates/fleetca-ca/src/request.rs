//! Certificate signing requests.

use std::path::Path;

use fleetca_core::{Identity, ProvisionError, Result};
use rcgen::{CertificateParams, DistinguishedName, DnType};

use crate::keys::{KeyPair, KeySpec};

/// An unsigned request binding a public key to a claimed identity.
///
/// Consumed by exactly one call to [`crate::CertificateSigner`].
#[derive(Debug)]
pub struct CertificateRequest {
    subject: Identity,
    pem: String,
    public_key_raw: Vec<u8>,
    key_spec: KeySpec,
}

impl CertificateRequest {
    /// Claimed subject
    #[must_use]
    pub const fn subject(&self) -> &Identity {
        &self.subject
    }

    /// PEM-encoded PKCS#10 request
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Raw public key of the requesting key pair
    #[must_use]
    pub fn public_key_raw(&self) -> &[u8] {
        &self.public_key_raw
    }

    /// Signature algorithm of the request
    #[must_use]
    pub const fn signature_algorithm(&self) -> &'static str {
        self.key_spec.signature_algorithm()
    }

    /// Write the request for auditing; the signer does not read it back.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.pem)?;
        Ok(())
    }
}

/// Builds a CSR for a subject identity.
#[derive(Debug, Clone)]
pub struct CertificateRequestBuilder {
    subject: Identity,
}

impl CertificateRequestBuilder {
    /// Start a request for the given subject
    #[must_use]
    pub const fn new(subject: Identity) -> Self {
        Self { subject }
    }

    /// Sign the request with `key`.
    ///
    /// Fails with `InvalidIdentity` when the common name is empty.
    pub fn build(self, key: &KeyPair) -> Result<CertificateRequest> {
        self.subject.validate()?;

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(&self.subject);

        let csr = params
            .serialize_request(key.rcgen())
            .map_err(|e| ProvisionError::Signing(format!("failed to build CSR: {e}")))?;
        let pem = csr
            .pem()
            .map_err(|e| ProvisionError::Signing(format!("failed to encode CSR: {e}")))?;

        Ok(CertificateRequest {
            subject: self.subject,
            pem,
            public_key_raw: key.public_key_raw().to_vec(),
            key_spec: key.spec(),
        })
    }
}

/// Map an identity onto an X.509 name in `C, ST, O, OU, CN` order.
pub(crate) fn distinguished_name(identity: &Identity) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    let fields = [
        (DnType::CountryName, &identity.country),
        (DnType::StateOrProvinceName, &identity.state),
        (DnType::OrganizationName, &identity.organization),
        (DnType::OrganizationalUnitName, &identity.organizational_unit),
        (DnType::CommonName, &identity.common_name),
    ];
    for (ty, value) in fields {
        if !value.is_empty() {
            dn.push(ty, value.as_str());
        }
    }
    dn
}
