use std::sync::Arc;

use mano_placement::MetricsProvider;
use mano_scheduler::{PlacementOptimizer, PlacementSolution};
use tracing::warn;

use super::{Inputs, load};

/// Run the optimizer over every slice and emit the solution.
pub async fn run(inputs: &Inputs, algorithm: Option<&str>) -> anyhow::Result<()> {
    let solution = optimize(inputs, algorithm).await?;
    super::emit(inputs, &solution)
}

pub async fn optimize(inputs: &Inputs, algorithm: Option<&str>) -> anyhow::Result<PlacementSolution> {
    let loaded = load(inputs)?;
    let provider: Arc<dyn MetricsProvider> = loaded.provider.clone();
    let optimizer = PlacementOptimizer::new(provider, loaded.inventory.optimizer.clone())?;

    let solution = optimizer
        .optimize_multiple(&loaded.network_functions(), &loaded.inventory.sites, algorithm)
        .await?;

    for v in &solution.violations {
        warn!(constraint = %v.constraint, severity = %v.severity, "{}", v.description);
    }
    Ok(solution)
}
