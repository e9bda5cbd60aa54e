//! Core types and traits shared by the fleetca crates.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - **Types**: subject identities, registry payloads and the device
//!   connection descriptor
//! - **Errors**: [`ProvisionError`] for the trust-chain engine and
//!   [`RegistryError`] for the remote registry boundary
//! - **Registry**: the [`Registry`] trait the provisioning workflows call
//!
//! # Example
//!
//! ```rust
//! use fleetca_core::Identity;
//!
//! let device = Identity::default().with_common_name("sensor-42");
//! assert!(device.validate().is_ok());
//! assert_eq!(device.common_name, "sensor-42");
//! ```

mod error;
mod registry;
pub mod types;

pub use error::{ProvisionError, RegistryError, Result};
pub use registry::Registry;
pub use types::*;
