//! Output formatting for provisioning results.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use colored::Colorize;
use fleetca_ca::{CaProvisioned, Certificate, CertificateType, DeviceProvisioned, ProvisioningWarning};
use serde::{Deserialize, Serialize};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// A certificate on disk.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateView {
    pub path: PathBuf,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    /// RFC 3339
    pub not_before: String,
    /// RFC 3339
    pub not_after: String,
    pub cert_type: CertificateType,
    pub fingerprint: String,
}

impl CertificateView {
    #[must_use]
    pub fn new(path: &Path, cert: &Certificate) -> Self {
        let info = cert.info();
        Self {
            path: path.to_path_buf(),
            subject: info.subject.to_string(),
            issuer: info.issuer.to_string(),
            serial: info.serial.clone(),
            not_before: info.not_before.to_rfc3339(),
            not_after: info.not_after.to_rfc3339(),
            cert_type: info.cert_type,
            fingerprint: info.fingerprint.clone(),
        }
    }
}

/// Result of `--create-ca`.
#[derive(Debug, Clone, Serialize)]
pub struct CaSummary {
    pub ca_key: PathBuf,
    pub trust_root: CertificateView,
    pub verification_key: PathBuf,
    pub verification_certificate: CertificateView,
    pub registration_code: String,
}

impl From<&CaProvisioned> for CaSummary {
    fn from(out: &CaProvisioned) -> Self {
        Self {
            ca_key: out.ca_key_path.clone(),
            trust_root: CertificateView::new(&out.trust_root_path, &out.ca_certificate),
            verification_key: out.verification_key_path.clone(),
            verification_certificate: CertificateView::new(
                &out.verification_cert_path,
                &out.verification_certificate,
            ),
            registration_code: out.registration_code.to_string(),
        }
    }
}

/// Result of `--create-device`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub key: PathBuf,
    pub csr: PathBuf,
    pub certificate: CertificateView,
    pub endpoint: String,
    pub publish_url: String,
    pub test_command: String,
    pub warnings: Vec<ProvisioningWarning>,
}

impl From<&DeviceProvisioned> for DeviceSummary {
    fn from(out: &DeviceProvisioned) -> Self {
        Self {
            device_id: out.connection.device_id.clone(),
            key: out.key_path.clone(),
            csr: out.csr_path.clone(),
            certificate: CertificateView::new(&out.cert_path, &out.certificate),
            endpoint: out.connection.endpoint.address.clone(),
            publish_url: out.connection.publish_url(),
            test_command: out.connection.curl_command(),
            warnings: out.warnings.clone(),
        }
    }
}

/// Print the CA summary in the requested format.
pub fn print_ca(summary: &CaSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Pretty => {
            println!("{}", "Root CA provisioned".green().bold());
            println!();
            print_certificate("Trust root", &summary.trust_root);
            println!("  {:<14} {}", "CA key:".bold(), summary.ca_key.display());
            println!();
            print_certificate("Verification", &summary.verification_certificate);
            println!(
                "  {:<14} {}",
                "Key:".bold(),
                summary.verification_key.display()
            );
            println!(
                "  {:<14} {}",
                "Reg. code:".bold(),
                summary.registration_code.cyan()
            );
            println!();
            println!("{}", "CA registered with the registry and set active.".dimmed());
        }
    }
    Ok(())
}

/// Print the device summary in the requested format.
pub fn print_device(summary: &DeviceSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Pretty => {
            print_warnings(&summary.warnings);
            println!(
                "{} {}",
                "Device certificate issued for".green().bold(),
                summary.device_id.cyan().bold()
            );
            println!();
            print_certificate("Certificate", &summary.certificate);
            println!("  {:<14} {}", "Key:".bold(), summary.key.display());
            println!("  {:<14} {}", "CSR:".bold(), summary.csr.display());
            println!("  {:<14} {}", "Endpoint:".bold(), summary.endpoint);
            println!();
            println!("{}", "Test the connection with:".bold());
            println!("  {}", summary.test_command);
        }
    }
    Ok(())
}

/// Print warnings to stderr.
pub fn print_warnings(warnings: &[ProvisioningWarning]) {
    for warning in warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}

fn print_certificate(label: &str, cert: &CertificateView) {
    println!("{}", format!("{label}:").bold());
    println!("  {:<14} {}", "Path:".bold(), cert.path.display());
    println!("  {:<14} {}", "Subject:".bold(), cert.subject);
    println!("  {:<14} {}", "Issuer:".bold(), cert.issuer);
    println!("  {:<14} {}", "Serial:".bold(), cert.serial);
    println!(
        "  {:<14} {} .. {}",
        "Valid:".bold(),
        cert.not_before,
        cert.not_after
    );
    println!("  {:<14} {}", "SHA-256:".bold(), cert.fingerprint.dimmed());
}
