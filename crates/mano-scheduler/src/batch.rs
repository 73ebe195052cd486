//! Worker-pool batch placement.
//!
//! Places many NFs in parallel against a shared, pre-warmed [`CachedPolicy`].
//! Concurrency is capped by a semaphore; results land at their input index.
//! Unlike `PlacementPolicy::place_multiple`, no load is simulated between
//! placements and every worker runs to completion before errors are checked.

use std::sync::Arc;
use std::time::Instant;

use mano_placement::{Decision, NetworkFunction, Site};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::cache::CachedPolicy;
use crate::error::{SchedulerError, SchedulerResult};

/// Bounded parallel placement over a cached policy.
pub struct BatchRunner {
    policy: Arc<CachedPolicy>,
    workers: usize,
}

impl BatchRunner {
    /// Runner using the cache config's worker count.
    pub fn new(policy: Arc<CachedPolicy>) -> Self {
        let workers = policy.config().parallel_workers;
        Self::with_workers(policy, workers)
    }

    pub fn with_workers(policy: Arc<CachedPolicy>, workers: usize) -> Self {
        Self {
            policy,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Place every NF; `decisions[i]` answers `nfs[i]`.
    ///
    /// Fails with the lowest-index placement error once all workers finish.
    pub async fn place_all(&self, nfs: &[NetworkFunction], sites: &[Site]) -> SchedulerResult<Vec<Decision>> {
        let started = Instant::now();
        self.policy.precompute_site_scores(sites).await;

        let sites: Arc<[Site]> = sites.into();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(nfs.len());

        for (index, nf) in nfs.iter().enumerate() {
            let permit = Arc::clone(&semaphore).acquire_owned().await?;
            let policy = Arc::clone(&self.policy);
            let sites = Arc::clone(&sites);
            let nf = nf.clone();

            handles.push(tokio::spawn(async move {
                let result = policy.place(&nf, &sites).await;
                drop(permit);
                debug!(index, nf = %nf.id, ok = result.is_ok(), "worker finished");
                (nf.nf_type, result)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut join_error = None;
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    join_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = join_error {
            return Err(e.into());
        }

        let mut decisions = Vec::with_capacity(results.len());
        for (nf_type, result) in results {
            match result {
                Ok(decision) => decisions.push(decision),
                Err(source) => return Err(SchedulerError::Batch { nf_type, source }),
            }
        }

        info!(
            placed = decisions.len(),
            workers = self.workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "concurrent batch placed"
        );
        Ok(decisions)
    }
}
