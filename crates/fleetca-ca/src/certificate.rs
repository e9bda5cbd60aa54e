//! Signed X.509 certificates and their inspection.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use fleetca_core::{Identity, ProvisionError, Result};
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use x509_parser::certificate::X509Certificate;
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

/// Type of certificate in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateType {
    /// Self-signed CA - the trust anchor
    Root,
    /// CA certificate issued by another CA
    Authority,
    /// Leaf certificate (verification or device)
    EndEntity,
}

/// Certificate metadata for tracking and auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Serial number (lowercase hex, no separators)
    pub serial: String,
    /// Subject identity
    pub subject: Identity,
    /// Issuer identity
    pub issuer: Identity,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// Certificate type
    pub cert_type: CertificateType,
    /// `basicConstraints` carries `CA:true`
    pub is_ca: bool,
    /// `basicConstraints` is marked critical
    pub ca_constraint_critical: bool,
    /// SHA-256 of the DER encoding (hex)
    pub fingerprint: String,
}

impl CertificateInfo {
    /// Length of the validity window in whole days
    #[must_use]
    pub fn validity_days(&self) -> i64 {
        (self.not_after - self.not_before).num_days()
    }
}

/// A signed X.509 certificate, kept in both PEM and DER form.
#[derive(Debug, Clone)]
pub struct Certificate {
    pem: String,
    der: Vec<u8>,
    info: CertificateInfo,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Decode a PEM certificate.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let parsed = pem::parse(pem_str)
            .map_err(|e| ProvisionError::Certificate(format!("invalid PEM: {e}")))?;
        if parsed.tag() != "CERTIFICATE" {
            return Err(ProvisionError::Certificate(format!(
                "expected a CERTIFICATE block, found {}",
                parsed.tag()
            )));
        }
        Self::from_der(parsed.into_contents())
    }

    /// Decode a DER certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let info = {
            let cert = parse(&der)?;
            inspect(&cert, &der)?
        };
        let pem = pem::encode(&pem::Pem::new("CERTIFICATE", der.clone()));
        Ok(Self { pem, der, info })
    }

    /// Load a PEM certificate from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    /// Write the PEM encoding to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.pem)?;
        Ok(())
    }

    /// PEM encoding
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Parsed metadata
    #[must_use]
    pub const fn info(&self) -> &CertificateInfo {
        &self.info
    }

    /// Subject identity
    #[must_use]
    pub const fn subject(&self) -> &Identity {
        &self.info.subject
    }

    /// Issuer identity
    #[must_use]
    pub const fn issuer(&self) -> &Identity {
        &self.info.issuer
    }

    /// Whether `basicConstraints` marks this certificate as a CA
    #[must_use]
    pub const fn is_ca(&self) -> bool {
        self.info.is_ca
    }

    /// The device identifier carried in the subject CN.
    ///
    /// Registries use this to map an incoming certificate back to its device.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        let cn = self.info.subject.common_name.as_str();
        (!cn.is_empty()).then_some(cn)
    }

    /// Raw subject public key bytes
    pub fn public_key_raw(&self) -> Result<Vec<u8>> {
        let cert = parse(&self.der)?;
        Ok(cert.public_key().subject_public_key.data.to_vec())
    }

    /// Check that this certificate was issued by `issuer`.
    ///
    /// Verifies name chaining, that the issuer is a CA, that this certificate
    /// is currently within its validity window, and the signature itself.
    /// Pass `self` to check a self-signed root.
    pub fn verify_issued_by(&self, issuer: &Self) -> Result<()> {
        let child = parse(&self.der)?;
        let parent = parse(&issuer.der)?;

        if child.issuer().to_string() != parent.subject().to_string() {
            return Err(ProvisionError::ChainVerification(format!(
                "issuer '{}' does not match CA subject '{}'",
                child.issuer(),
                parent.subject()
            )));
        }

        if !issuer.is_ca() {
            return Err(ProvisionError::IssuerNotCa {
                subject: issuer.subject().to_string(),
            });
        }

        if !child.validity().is_valid() {
            return Err(ProvisionError::ChainVerification(format!(
                "certificate '{}' is outside its validity window",
                self.subject()
            )));
        }

        child
            .verify_signature(Some(parent.public_key()))
            .map_err(|e| {
                ProvisionError::ChainVerification(format!(
                    "signature on '{}' does not verify against '{}': {e}",
                    self.subject(),
                    issuer.subject()
                ))
            })
    }
}

fn parse(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| ProvisionError::Certificate(e.to_string()))?;
    Ok(cert)
}

fn inspect(cert: &X509Certificate<'_>, der: &[u8]) -> Result<CertificateInfo> {
    let (is_ca, ca_constraint_critical) = match cert.basic_constraints() {
        Ok(Some(ext)) => (ext.value.ca, ext.critical),
        Ok(None) => (false, false),
        Err(e) => return Err(ProvisionError::Certificate(e.to_string())),
    };

    let subject = identity_from_name(cert.subject());
    let issuer = identity_from_name(cert.issuer());

    let cert_type = if !is_ca {
        CertificateType::EndEntity
    } else if subject == issuer {
        CertificateType::Root
    } else {
        CertificateType::Authority
    };

    Ok(CertificateInfo {
        serial: cert.serial.to_str_radix(16),
        subject,
        issuer,
        not_before: asn1_to_utc(cert.validity().not_before)?,
        not_after: asn1_to_utc(cert.validity().not_after)?,
        cert_type,
        is_ca,
        ca_constraint_critical,
        fingerprint: sha256_hex(der),
    })
}

fn identity_from_name(name: &X509Name<'_>) -> Identity {
    fn first<'a, 'b>(mut iter: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>) -> String
    where
        'b: 'a,
    {
        iter.next()
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    Identity {
        country: first(name.iter_country()),
        state: first(name.iter_state_or_province()),
        organization: first(name.iter_organization()),
        organizational_unit: first(name.iter_organizational_unit()),
        common_name: first(name.iter_common_name()),
    }
}

fn asn1_to_utc(t: x509_parser::time::ASN1Time) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .ok_or_else(|| ProvisionError::Certificate(format!("timestamp out of range: {t}")))
}

/// Lowercase hex SHA-256.
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(digest(&SHA256, data).as_ref())
}
