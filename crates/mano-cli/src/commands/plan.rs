use anyhow::Context;
use tracing::info;

use super::{Inputs, load};
use crate::intent::SliceAllocation;

/// Place every slice on its own and emit the orchestration plan.
pub fn run(inputs: &Inputs) -> anyhow::Result<()> {
    let allocations = plan(inputs)?;
    super::emit(inputs, &allocations)
}

pub fn plan(inputs: &Inputs) -> anyhow::Result<Vec<SliceAllocation>> {
    let loaded = load(inputs)?;
    let policy = loaded.policy();
    let sites = &loaded.inventory.sites;

    let mut allocations = Vec::with_capacity(loaded.slices.len());
    for slice in &loaded.slices {
        let decision = policy
            .place(&slice.nf, sites)
            .with_context(|| format!("placement failed for {}", slice.id))?;
        info!(slice = %slice.id, site = %decision.site.id, score = decision.score, "slice planned");
        allocations.push(SliceAllocation::planned(slice.id.clone(), slice.intent.clone(), decision));
    }
    Ok(allocations)
}
