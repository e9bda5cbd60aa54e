//! X.509 signing: self-signed roots and CA-issued leaf certificates.

use fleetca_core::{ProvisionError, Result};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, ExtendedKeyUsagePurpose,
    IsCa, KeyUsagePurpose,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::certificate::Certificate;
use crate::issuer::IssuerState;
use crate::keys::KeyPair;
use crate::request::CertificateRequest;

/// Validity used when none is configured.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Extensions applied when self-signing a trust anchor.
///
/// `basicConstraints: critical, CA:true` is always written; these fields
/// only tune what goes alongside it.
#[derive(Debug, Clone)]
pub struct CaExtensions {
    /// Key usages of the CA certificate
    pub key_usages: Vec<KeyUsagePurpose>,
    /// Optional `pathLenConstraint`
    pub path_length: Option<u8>,
}

impl Default for CaExtensions {
    fn default() -> Self {
        Self {
            key_usages: vec![
                KeyUsagePurpose::KeyCertSign,
                KeyUsagePurpose::CrlSign,
                KeyUsagePurpose::DigitalSignature,
            ],
            path_length: None,
        }
    }
}

/// Signs certificate requests, drawing serials from one issuer's state.
///
/// The signer never keeps key material: issuer keys are borrowed for the
/// duration of a single call.
#[derive(Debug, Clone, Copy)]
pub struct CertificateSigner<'a> {
    state: &'a IssuerState,
}

impl<'a> CertificateSigner<'a> {
    /// Create a signer bound to an issuer's serial state
    #[must_use]
    pub const fn new(state: &'a IssuerState) -> Self {
        Self { state }
    }

    /// Self-sign `request` with its own key, producing a trust anchor.
    ///
    /// Issuer equals subject and `basicConstraints` is `critical, CA:true`.
    pub fn self_sign(
        &self,
        request: CertificateRequest,
        key: &KeyPair,
        validity_days: u32,
        extensions: &CaExtensions,
    ) -> Result<Certificate> {
        if request.public_key_raw() != key.public_key_raw() {
            return Err(ProvisionError::Signing(
                "request public key does not match the signing key".to_string(),
            ));
        }
        self.check_state_owner(key)?;

        let mut csr = parse_request(&request)?;
        let params = &mut csr.params;
        params.is_ca = IsCa::Ca(extensions.path_length.map_or(
            BasicConstraints::Unconstrained,
            BasicConstraints::Constrained,
        ));
        params.key_usages.clone_from(&extensions.key_usages);
        self.stamp(params, validity_days)?;

        let cert = csr
            .params
            .self_signed(key.rcgen())
            .map_err(|e| ProvisionError::Signing(format!("failed to self-sign: {e}")))?;

        let cert = Certificate::from_der(cert.der().to_vec())?;
        debug!(subject = %cert.subject(), serial = %cert.info().serial, "self-signed CA certificate");
        Ok(cert)
    }

    /// Sign `request` as `issuer`, producing an end-entity certificate.
    ///
    /// The issuer must carry `CA:true` and `issuer_key` must be the key of
    /// `issuer`.
    pub fn sign(
        &self,
        request: CertificateRequest,
        issuer: &Certificate,
        issuer_key: &KeyPair,
        validity_days: u32,
    ) -> Result<Certificate> {
        if !issuer.is_ca() {
            return Err(ProvisionError::IssuerNotCa {
                subject: issuer.subject().to_string(),
            });
        }
        if issuer.public_key_raw()? != issuer_key.public_key_raw() {
            return Err(ProvisionError::Signing(
                "issuer key does not match the issuer certificate".to_string(),
            ));
        }
        self.check_state_owner(issuer_key)?;

        let issuer_cert = CertificateParams::from_ca_cert_pem(issuer.pem())
            .and_then(|params| params.self_signed(issuer_key.rcgen()))
            .map_err(|e| ProvisionError::Signing(format!("failed to load issuer: {e}")))?;

        let mut csr = parse_request(&request)?;
        let params = &mut csr.params;
        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        params.use_authority_key_identifier_extension = true;
        self.stamp(params, validity_days)?;

        let cert = csr
            .signed_by(&issuer_cert, issuer_key.rcgen())
            .map_err(|e| ProvisionError::Signing(format!("failed to sign: {e}")))?;

        let cert = Certificate::from_der(cert.der().to_vec())?;
        debug!(
            subject = %cert.subject(),
            issuer = %cert.issuer(),
            serial = %cert.info().serial,
            "signed certificate"
        );
        Ok(cert)
    }

    fn check_state_owner(&self, key: &KeyPair) -> Result<()> {
        if self.state.issuer_fingerprint() == key.fingerprint() {
            Ok(())
        } else {
            Err(ProvisionError::SerialIntegrity(
                "serial state belongs to a different issuer key".to_string(),
            ))
        }
    }

    /// Apply serial and validity window; `notBefore` is now.
    fn stamp(&self, params: &mut CertificateParams, validity_days: u32) -> Result<()> {
        if validity_days == 0 {
            return Err(ProvisionError::Signing(
                "validity must be at least one day".to_string(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + Duration::days(i64::from(validity_days));
        params.serial_number = Some(self.state.next_serial()?.into());
        Ok(())
    }
}

fn parse_request(request: &CertificateRequest) -> Result<CertificateSigningRequestParams> {
    CertificateSigningRequestParams::from_pem(request.pem())
        .map_err(|e| ProvisionError::Signing(format!("malformed CSR: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateType;
    use crate::keys::{KeyPairGenerator, KeySpec};
    use crate::request::CertificateRequestBuilder;
    use fleetca_core::Identity;
    use std::collections::HashSet;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        state: IssuerState,
        ca_key: KeyPair,
        root: Certificate,
    }

    fn fixture(spec: KeySpec) -> Fixture {
        let dir = TempDir::new().unwrap();
        let ca_key = KeyPairGenerator::new(spec).generate().unwrap();
        let state = IssuerState::create(dir.path().join("ca.srl"), &ca_key).unwrap();
        let request = CertificateRequestBuilder::new(Identity::default().with_common_name("MyRootCA"))
            .build(&ca_key)
            .unwrap();
        let root = CertificateSigner::new(&state)
            .self_sign(request, &ca_key, DEFAULT_VALIDITY_DAYS, &CaExtensions::default())
            .unwrap();
        Fixture {
            _dir: dir,
            state,
            ca_key,
            root,
        }
    }

    fn device_request(cn: &str) -> CertificateRequest {
        let key = KeyPairGenerator::new(KeySpec::EcdsaP256).generate().unwrap();
        CertificateRequestBuilder::new(Identity::default().with_common_name(cn))
            .build(&key)
            .unwrap()
    }

    #[test]
    fn test_self_signed_root_is_ca_anchor() {
        let fx = fixture(KeySpec::default());
        let info = fx.root.info();

        assert_eq!(info.subject.common_name, "MyRootCA");
        assert_eq!(info.subject, info.issuer);
        assert!(info.is_ca);
        assert!(info.ca_constraint_critical);
        assert_eq!(info.cert_type, CertificateType::Root);
        fx.root.verify_issued_by(&fx.root).unwrap();
    }

    #[test]
    fn test_sign_chains_to_root() {
        let fx = fixture(KeySpec::default());
        let signer = CertificateSigner::new(&fx.state);

        let device = signer
            .sign(device_request("sensor-42"), &fx.root, &fx.ca_key, 30)
            .unwrap();

        assert_eq!(device.issuer(), fx.root.subject());
        assert_eq!(device.subject().common_name, "sensor-42");
        assert!(!device.is_ca());
        assert_eq!(device.info().cert_type, CertificateType::EndEntity);
        assert_eq!(device.info().validity_days(), 30);
        device.verify_issued_by(&fx.root).unwrap();
    }

    #[test]
    fn test_validity_window() {
        let fx = fixture(KeySpec::EcdsaP256);
        let signer = CertificateSigner::new(&fx.state);
        let before = chrono::Utc::now() - chrono::Duration::seconds(2);

        let cert = signer
            .sign(device_request("sensor-1"), &fx.root, &fx.ca_key, DEFAULT_VALIDITY_DAYS)
            .unwrap();

        let info = cert.info();
        let after = chrono::Utc::now() + chrono::Duration::seconds(2);
        assert!(info.not_before >= before && info.not_before <= after);
        let window = info.not_after - info.not_before;
        assert_eq!(window.num_seconds(), i64::from(DEFAULT_VALIDITY_DAYS) * 86_400);
    }

    #[test]
    fn test_serials_distinct_across_signs() {
        let fx = fixture(KeySpec::EcdsaP256);
        let signer = CertificateSigner::new(&fx.state);

        let mut serials = HashSet::new();
        serials.insert(fx.root.info().serial.clone());
        for i in 0..10 {
            let cert = signer
                .sign(device_request(&format!("sensor-{i}")), &fx.root, &fx.ca_key, 1)
                .unwrap();
            assert!(serials.insert(cert.info().serial.clone()));
        }
        assert_eq!(serials.len(), 11);
    }

    #[test]
    fn test_non_ca_issuer_rejected() {
        let fx = fixture(KeySpec::EcdsaP256);
        let signer = CertificateSigner::new(&fx.state);
        let leaf = signer
            .sign(device_request("leaf"), &fx.root, &fx.ca_key, 1)
            .unwrap();

        let err = signer
            .sign(device_request("sensor-2"), &leaf, &fx.ca_key, 1)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::IssuerNotCa { .. }));
    }

    #[test]
    fn test_mismatched_issuer_key_rejected() {
        let fx = fixture(KeySpec::EcdsaP256);
        let other = KeyPairGenerator::new(KeySpec::EcdsaP256).generate().unwrap();

        let err = CertificateSigner::new(&fx.state)
            .sign(device_request("sensor-3"), &fx.root, &other, 1)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Signing(_)));
    }

    #[test]
    fn test_self_sign_with_foreign_key_rejected() {
        let fx = fixture(KeySpec::EcdsaP256);
        let err = CertificateSigner::new(&fx.state)
            .self_sign(device_request("rogue"), &fx.ca_key, 1, &CaExtensions::default())
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Signing(_)));
    }

    #[test]
    fn test_zero_validity_rejected() {
        let fx = fixture(KeySpec::EcdsaP256);
        let err = CertificateSigner::new(&fx.state)
            .sign(device_request("sensor-4"), &fx.root, &fx.ca_key, 0)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Signing(_)));
    }

    #[test]
    fn test_path_length_constraint() {
        let dir = TempDir::new().unwrap();
        let key = KeyPairGenerator::new(KeySpec::EcdsaP256).generate().unwrap();
        let state = IssuerState::create(dir.path().join("ca.srl"), &key).unwrap();
        let request = CertificateRequestBuilder::new(Identity::default().with_common_name("Constrained CA"))
            .build(&key)
            .unwrap();
        let extensions = CaExtensions {
            path_length: Some(0),
            ..CaExtensions::default()
        };

        let root = CertificateSigner::new(&state)
            .self_sign(request, &key, 365, &extensions)
            .unwrap();
        assert!(root.is_ca());

        let (_, parsed) = x509_parser::parse_x509_certificate(root.der()).unwrap();
        let bc = parsed.basic_constraints().unwrap().unwrap();
        assert_eq!(bc.value.path_len_constraint, Some(0));
    }
}
