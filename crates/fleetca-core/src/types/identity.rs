use serde::{Deserialize, Serialize};

use crate::{ProvisionError, Result};

/// Subject identity of a certificate or signing request.
///
/// The common name carries the role-specific value: an organisation label for
/// the CA, the registration code for the verification certificate, or the
/// device identifier for device certificates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Two-letter country code (C)
    #[serde(default)]
    pub country: String,

    /// State or province (ST)
    #[serde(default)]
    pub state: String,

    /// Organization (O)
    #[serde(default)]
    pub organization: String,

    /// Organizational unit (OU)
    #[serde(default)]
    pub organizational_unit: String,

    /// Common name (CN)
    #[serde(default)]
    pub common_name: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            country: String::from("US"),
            state: String::from("NY"),
            organization: String::from("MyCompany"),
            organizational_unit: String::from("IoT"),
            common_name: String::new(),
        }
    }
}

impl Identity {
    /// Create an identity with only a common name set
    #[must_use]
    pub fn common_name_only(common_name: impl Into<String>) -> Self {
        Self {
            country: String::new(),
            state: String::new(),
            organization: String::new(),
            organizational_unit: String::new(),
            common_name: common_name.into(),
        }
    }

    /// Copy the organisational fields and replace the common name
    #[must_use]
    pub fn with_common_name(&self, common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..self.clone()
        }
    }

    /// Check that the identity can be used as a certificate subject
    pub fn validate(&self) -> Result<()> {
        if self.common_name.trim().is_empty() {
            return Err(ProvisionError::InvalidIdentity(
                "common name must not be empty".to_string(),
            ));
        }
        if !self.country.is_empty() && self.country.chars().count() != 2 {
            return Err(ProvisionError::InvalidIdentity(format!(
                "country must be a two-letter code, got '{}'",
                self.country
            )));
        }
        Ok(())
    }

    /// Iterate over the non-empty attributes in `C, ST, O, OU, CN` order
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("C", self.country.as_str()),
            ("ST", self.state.as_str()),
            ("O", self.organization.as_str()),
            ("OU", self.organizational_unit.as_str()),
            ("CN", self.common_name.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, value) in self.attributes() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}
