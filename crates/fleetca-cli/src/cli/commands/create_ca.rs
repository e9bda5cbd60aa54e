//! `fleetca --create-ca` - Create and register a root CA.

use anyhow::{Context as _, Result};

use super::Context;
use crate::output::{self, CaSummary};
use fleetca_ca::CaProvisioning;

pub async fn execute(ctx: &Context) -> Result<()> {
    let registry = ctx.registry()?;

    let mut workflow = CaProvisioning::new(&ctx.provisioning, &registry);
    let result = workflow.run().await;
    let provisioned =
        result.with_context(|| format!("CA provisioning stopped after {:?}", workflow.state()))?;

    output::print_ca(&CaSummary::from(&provisioned), ctx.output_format)
}
