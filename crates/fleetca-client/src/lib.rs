//! HTTP client for the IoT registry.
//!
//! [`RegistryClient`] implements [`fleetca_core::Registry`] over three calls:
//!
//! - `GET registration-code` → `{ "registrationCode": "..." }`
//! - `POST register-ca` with both certificates as PEM
//! - `GET endpoint?type=data-plane` → `{ "endpointAddress": "..." }`
//!
//! No call is retried. Every request is bounded by the client timeout.

mod client;
mod registry;

pub use client::{RegistryClient, RegistryClientBuilder, DEFAULT_TIMEOUT};
pub use fleetca_core::{EndpointType, Registry, RegistryError};
