use std::sync::Arc;

use mano_placement::Decision;
use mano_scheduler::{BatchRunner, CachedPolicy};
use tracing::info;

use super::{Inputs, Loaded, load};
use crate::intent::SliceAllocation;

/// Place all slices as one batch and emit the allocations.
pub async fn run(inputs: &Inputs, concurrent: bool) -> anyhow::Result<()> {
    let allocations = batch(inputs, concurrent).await?;
    super::emit(inputs, &allocations)
}

pub async fn batch(inputs: &Inputs, concurrent: bool) -> anyhow::Result<Vec<SliceAllocation>> {
    let loaded = load(inputs)?;
    let decisions = if concurrent {
        place_concurrent(&loaded).await?
    } else {
        loaded
            .policy()
            .place_multiple(&loaded.network_functions(), &loaded.inventory.sites)?
    };

    Ok(loaded
        .slices
        .iter()
        .zip(decisions)
        .map(|(slice, decision)| SliceAllocation::planned(slice.id.clone(), slice.intent.clone(), decision))
        .collect())
}

async fn place_concurrent(loaded: &Loaded) -> anyhow::Result<Vec<Decision>> {
    let cached = Arc::new(CachedPolicy::new(loaded.policy(), loaded.inventory.cache.clone())?);
    let runner = BatchRunner::new(cached.clone());
    let decisions = runner
        .place_all(&loaded.network_functions(), &loaded.inventory.sites)
        .await?;

    let stats = cached.stats().await;
    info!(
        workers = runner.workers(),
        requests = stats.total_requests,
        hits = stats.cache_hits,
        precompute_hits = stats.precompute_hits,
        avg_ms = stats.avg_decision_time_ms,
        "worker-pool batch complete"
    );
    Ok(decisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::inputs;

    fn placed(allocations: &[SliceAllocation]) -> Vec<&str> {
        allocations.iter().map(|a| a.placement.site.id.as_str()).collect()
    }

    #[tokio::test]
    async fn sequential_and_concurrent_agree_here() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());

        let sequential = batch(&inputs, false).await.unwrap();
        let concurrent = batch(&inputs, true).await.unwrap();
        assert_eq!(placed(&sequential), vec!["regional-01", "edge-01", "central-01"]);
        assert_eq!(placed(&sequential), placed(&concurrent));
    }

    #[tokio::test]
    async fn sequential_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        std::fs::write(
            &inputs.intents,
            "{\"bandwidth\": 10.0, \"latency\": 25.0, \"slice_type\": \"AMF\"}\n\
             {\"bandwidth\": 100000.0, \"latency\": 1.0, \"slice_type\": \"UPF\"}\n",
        )
        .unwrap();

        let err = batch(&inputs, false).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to place UPF: NO_SUITABLE_SITE"));

        let err = batch(&inputs, true).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to place UPF: NO_SUITABLE_SITE"));
    }
}
