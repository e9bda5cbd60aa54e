//! Per-issuer serial number state.
//!
//! Each CA key owns one counter record, persisted next to the key as JSON.
//! Every allocation happens under an exclusive lock file and is written back
//! atomically before the serial is handed out, so two signers sharing a CA
//! can never receive the same serial.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fleetca_core::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::keys::KeyPair;
use crate::storage::{self, FileLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerialRecord {
    issuer_fingerprint: String,
    next_serial: u64,
    #[serde(default)]
    last_issued: Option<u64>,
    #[serde(default)]
    issued: u64,
    updated_at: DateTime<Utc>,
}

impl SerialRecord {
    fn fresh(issuer_fingerprint: String) -> Self {
        Self {
            issuer_fingerprint,
            next_serial: random_seed(),
            last_issued: None,
            issued: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Random 62-bit starting point so distinct CAs do not share serial ranges.
fn random_seed() -> u64 {
    ((Uuid::new_v4().as_u128() as u64) >> 2) + 1
}

/// Serial counter bound to one issuer key.
#[derive(Debug, Clone)]
pub struct IssuerState {
    path: PathBuf,
    fingerprint: String,
}

impl IssuerState {
    /// Start a fresh counter for a newly generated CA key, replacing any
    /// record left behind by a previous CA.
    pub fn create(path: impl Into<PathBuf>, issuer_key: &KeyPair) -> Result<Self> {
        let state = Self {
            path: path.into(),
            fingerprint: issuer_key.fingerprint(),
        };

        let _lock = FileLock::acquire(&state.path)?;
        state.write(&SerialRecord::fresh(state.fingerprint.clone()))?;
        debug!(path = %state.path.display(), "created issuer serial state");
        Ok(state)
    }

    /// Open the counter belonging to an existing CA key.
    ///
    /// A record bound to a different key is an integrity violation. A missing
    /// record is reseeded from a random base.
    pub fn open(path: impl Into<PathBuf>, issuer_key: &KeyPair) -> Result<Self> {
        let state = Self {
            path: path.into(),
            fingerprint: issuer_key.fingerprint(),
        };

        let _lock = FileLock::acquire(&state.path)?;
        if state.path.exists() {
            state.read()?;
        } else {
            warn!(
                path = %state.path.display(),
                "serial counter missing for existing CA key, reseeding from a random base"
            );
            state.write(&SerialRecord::fresh(state.fingerprint.clone()))?;
        }
        Ok(state)
    }

    /// Location of the persisted record
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fingerprint of the issuer key this counter belongs to
    #[must_use]
    pub fn issuer_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of serials handed out so far
    pub fn issued_count(&self) -> Result<u64> {
        let _lock = FileLock::acquire(&self.path)?;
        Ok(self.read()?.issued)
    }

    /// Allocate the next serial number.
    ///
    /// The record is persisted before the serial is returned. Collisions are
    /// fatal: a serial that is not strictly greater than the last issued one
    /// fails with `SerialIntegrity`.
    pub fn next_serial(&self) -> Result<u64> {
        let _lock = FileLock::acquire(&self.path)?;
        let mut record = self.read()?;

        let serial = record.next_serial;
        if serial == 0 || record.last_issued.is_some_and(|last| serial <= last) {
            return Err(ProvisionError::SerialIntegrity(format!(
                "serial {serial:x} would repeat or precede last issued serial in {}",
                self.path.display()
            )));
        }

        record.next_serial = serial.checked_add(1).ok_or_else(|| {
            ProvisionError::SerialIntegrity("serial space exhausted for this issuer".to_string())
        })?;
        record.last_issued = Some(serial);
        record.issued += 1;
        record.updated_at = Utc::now();
        self.write(&record)?;

        debug!(serial = %format!("{serial:x}"), issued = record.issued, "allocated serial");
        Ok(serial)
    }

    fn read(&self) -> Result<SerialRecord> {
        let content = std::fs::read_to_string(&self.path)?;
        let record: SerialRecord = serde_json::from_str(&content)?;
        if record.issuer_fingerprint != self.fingerprint {
            return Err(ProvisionError::SerialIntegrity(format!(
                "serial counter {} belongs to a different issuer key",
                self.path.display()
            )));
        }
        Ok(record)
    }

    fn write(&self, record: &SerialRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)?;
        storage::write_atomic(&self.path, &json)?;
        Ok(())
    }
}
