//! `fleetca --create-device` - Issue a device certificate.

use anyhow::{Context as _, Result};

use super::Context;
use crate::output::{self, DeviceSummary};
use fleetca_ca::DeviceProvisioning;

pub async fn execute(ctx: &Context, device_id: &str) -> Result<()> {
    let registry = ctx.registry()?;

    let mut workflow = DeviceProvisioning::new(&ctx.provisioning, &registry);
    let result = workflow.run(device_id).await;
    let provisioned = match result {
        Ok(provisioned) => provisioned,
        Err(e) => {
            output::print_warnings(workflow.warnings());
            return Err(e).with_context(|| {
                format!(
                    "device provisioning for '{device_id}' stopped after {:?}",
                    workflow.state()
                )
            });
        }
    };

    output::print_device(&DeviceSummary::from(&provisioned), ctx.output_format)
}
