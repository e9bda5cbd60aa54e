//! CLI argument parsing and workflow dispatch.

pub mod args;
pub mod commands;

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::Result;
use args::Cli;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;

    let mut provisioning = config.provisioning;
    if let Some(dir) = cli.dir {
        provisioning.output_dir = dir;
    }
    if let Some(policy) = cli.trust_root_policy {
        provisioning.trust_root_policy = policy;
    }
    debug!(
        dir = %provisioning.output_dir.display(),
        key = %provisioning.key,
        policy = ?provisioning.trust_root_policy,
        "provisioning settings"
    );

    let ctx = commands::Context {
        registry_url: cli.registry_url.or(config.registry.url),
        registry_token: cli.registry_token.or(config.registry.token),
        timeout: cli
            .timeout
            .or(config.registry.timeout_secs)
            .map(Duration::from_secs),
        provisioning,
        output_format: cli
            .output
            .or(config.output_format)
            .unwrap_or(OutputFormat::Pretty),
    };

    // Ask up front so a combined run never stops halfway for input.
    let device_id = if cli.create_device {
        Some(match cli.device_id {
            Some(id) => id,
            None => prompt_device_id()?,
        })
    } else {
        None
    };

    if cli.create_ca {
        commands::create_ca::execute(&ctx).await?;
    }
    if let Some(device_id) = device_id {
        commands::create_device::execute(&ctx, &device_id).await?;
    }

    Ok(())
}

/// Initialize tracing on stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn prompt_device_id() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("--device-id is required when stdin is not a terminal");
    }
    let id = dialoguer::Input::<String>::new()
        .with_prompt("Device identifier")
        .interact_text()?;
    Ok(id)
}
