//! Key pair generation and persistence.

use std::path::Path;

use fleetca_core::{ProvisionError, Result};
use rcgen::{PKCS_ECDSA_P256_SHA256, PKCS_RSA_SHA256};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

use crate::storage;

/// RSA modulus size used unless configured otherwise.
pub const DEFAULT_RSA_BITS: u32 = 2048;

/// RSA sizes the signing backend accepts.
const SUPPORTED_RSA_BITS: &[u32] = &[2048, 3072, 4096];

/// Key algorithm choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KeySpec {
    /// RSA with the given modulus length, signing with SHA-256
    Rsa {
        /// Modulus length in bits
        bits: u32,
    },
    /// ECDSA with P-256 curve
    EcdsaP256,
}

impl Default for KeySpec {
    fn default() -> Self {
        Self::Rsa {
            bits: DEFAULT_RSA_BITS,
        }
    }
}

impl KeySpec {
    /// RSA key spec with the given modulus length
    #[must_use]
    pub const fn rsa(bits: u32) -> Self {
        Self::Rsa { bits }
    }

    /// Check that the backend can generate and sign with this spec
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Rsa { bits } if !SUPPORTED_RSA_BITS.contains(bits) => {
                Err(ProvisionError::KeyGeneration(format!(
                    "unsupported RSA key size {bits} (supported: 2048, 3072, 4096)"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Signature algorithm name used in CSRs and certificates
    #[must_use]
    pub const fn signature_algorithm(&self) -> &'static str {
        match self {
            Self::Rsa { .. } => "sha256WithRSAEncryption",
            Self::EcdsaP256 => "ecdsa-with-SHA256",
        }
    }
}

impl std::fmt::Display for KeySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { bits } => write!(f, "RSA {bits}"),
            Self::EcdsaP256 => write!(f, "ECDSA P-256"),
        }
    }
}

/// Private key plus its derived public key.
///
/// Owned by exactly one role (CA, verification or device). Dropping the value
/// does not touch the file it may have been saved to.
pub struct KeyPair {
    spec: KeySpec,
    inner: rcgen::KeyPair,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("spec", &self.spec)
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Load a PKCS#8 (or PKCS#1 RSA) PEM private key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let rsa_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .ok();

        if let Some(key) = rsa_key {
            let bits = u32::try_from(key.size() * 8)
                .map_err(|_| ProvisionError::KeyGeneration("RSA key too large".to_string()))?;
            return Self::from_rsa(&key, bits);
        }

        let inner = rcgen::KeyPair::from_pem(pem)
            .map_err(|e| ProvisionError::KeyGeneration(format!("failed to load key: {e}")))?;
        if inner.algorithm() != &PKCS_ECDSA_P256_SHA256 {
            return Err(ProvisionError::KeyGeneration(
                "unsupported key algorithm (expected RSA or ECDSA P-256)".to_string(),
            ));
        }

        Ok(Self {
            spec: KeySpec::EcdsaP256,
            inner,
        })
    }

    /// Load a private key from a PEM file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    fn from_rsa(key: &RsaPrivateKey, bits: u32) -> Result<Self> {
        KeySpec::rsa(bits).validate()?;
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ProvisionError::KeyGeneration(e.to_string()))?;
        let inner = rcgen::KeyPair::from_pem_and_sign_algo(&pem, &PKCS_RSA_SHA256)
            .map_err(|e| ProvisionError::KeyGeneration(e.to_string()))?;

        Ok(Self {
            spec: KeySpec::rsa(bits),
            inner,
        })
    }

    /// The algorithm and size of this key
    #[must_use]
    pub const fn spec(&self) -> KeySpec {
        self.spec
    }

    /// PKCS#8 PEM encoding of the private key
    #[must_use]
    pub fn private_key_pem(&self) -> String {
        self.inner.serialize_pem()
    }

    /// Raw public key bytes (the subjectPublicKey bit string contents)
    #[must_use]
    pub fn public_key_raw(&self) -> &[u8] {
        self.inner.public_key_raw()
    }

    /// Lowercase hex SHA-256 of the raw public key
    #[must_use]
    pub fn fingerprint(&self) -> String {
        crate::certificate::sha256_hex(self.public_key_raw())
    }

    /// Write the private key as PEM, readable by the owner only
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        storage::write_private(path.as_ref(), &self.private_key_pem())?;
        Ok(())
    }

    pub(crate) const fn rcgen(&self) -> &rcgen::KeyPair {
        &self.inner
    }
}

/// Produces fresh key material for any role.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPairGenerator {
    spec: KeySpec,
}

impl KeyPairGenerator {
    /// Create a generator for the given key spec
    #[must_use]
    pub const fn new(spec: KeySpec) -> Self {
        Self { spec }
    }

    /// Create an RSA generator with the given modulus length
    #[must_use]
    pub const fn rsa(bits: u32) -> Self {
        Self::new(KeySpec::rsa(bits))
    }

    /// Key specification this generator produces
    #[must_use]
    pub const fn spec(&self) -> KeySpec {
        self.spec
    }

    /// Generate a new key pair.
    ///
    /// Nothing is written to disk; persistence is the caller's job.
    pub fn generate(&self) -> Result<KeyPair> {
        self.spec.validate()?;

        match self.spec {
            KeySpec::Rsa { bits } => {
                let mut rng = rand::thread_rng();
                let key = RsaPrivateKey::new(&mut rng, bits as usize)
                    .map_err(|e| ProvisionError::KeyGeneration(e.to_string()))?;
                KeyPair::from_rsa(&key, bits)
            }
            KeySpec::EcdsaP256 => {
                let inner = rcgen::KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
                    .map_err(|e| ProvisionError::KeyGeneration(e.to_string()))?;
                Ok(KeyPair {
                    spec: KeySpec::EcdsaP256,
                    inner,
                })
            }
        }
    }
}
