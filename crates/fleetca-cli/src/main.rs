//! fleetca - IoT fleet certificate provisioning

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    fleetca_cli::run().await
}
