//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use fleetca_ca::TrustRootPolicy;

use crate::output::OutputFormat;

/// Provision X.509 certificates for an IoT device fleet
///
/// Creates a self-signed root CA, registers it with the IoT registry using a
/// verification certificate, and issues device certificates signed by it.
#[derive(Parser, Debug)]
#[command(name = "fleetca")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
#[command(group(
    ArgGroup::new("workflow")
        .required(true)
        .multiple(true)
        .args(["create_ca", "create_device"])
))]
pub struct Cli {
    /// Create a root CA, register it and make it the trust root
    #[arg(long)]
    pub create_ca: bool,

    /// Issue a device certificate signed by the trust root
    #[arg(long)]
    pub create_device: bool,

    /// Device identifier, used as the certificate common name (prompted for if omitted)
    #[arg(short = 'd', long, requires = "create_device")]
    pub device_id: Option<String>,

    /// Directory for keys, certificates and serial state
    #[arg(long, env = "FLEETCA_DIR")]
    pub dir: Option<PathBuf>,

    /// Config file (defaults to the per-user config.toml)
    #[arg(short, long, env = "FLEETCA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Registry base URL
    #[arg(long, env = "FLEETCA_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Registry bearer token
    #[arg(long, env = "FLEETCA_REGISTRY_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,

    /// Registry request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// What to do when issuing a device certificate without a trust root
    #[arg(long, value_parser = parse_policy)]
    pub trust_root_policy: Option<TrustRootPolicy>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log each provisioning step (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

fn parse_policy(s: &str) -> Result<TrustRootPolicy, String> {
    s.parse().map_err(|e: fleetca_ca::ProvisionError| e.to_string())
}
