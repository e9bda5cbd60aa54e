//! # fleetca-cli
//!
//! Command-line front end for the fleetca provisioning workflows.
//!
//! - `--create-ca` creates a root CA, proves ownership of it to the registry
//!   and makes it the trust root
//! - `--create-device` issues a device certificate under the trust root and
//!   prints a test command for the device's first connection
//!
//! Both flags may be combined; the CA is provisioned first.

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
