//! Placement policy: gate, score, select, explain.
//!
//! Three entry points share the same ranking:
//! 1. `place` picks the best feasible site for one NF
//! 2. `place_multiple` places NFs in order against a local copy of the
//!    inventory, simulating load on each chosen site
//! 3. `rebalance` re-places existing decisions with 10% hysteresis

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Weights;
use crate::constraints;
use crate::error::{BatchError, ErrorCode, ErrorDetails, PlacementError, PlacementResult, SiteRejection};
use crate::metrics::MetricsProvider;
use crate::scorer::{self, AffinityClass, HIGH_BANDWIDTH_MBPS};
use crate::types::{CloudType, Decision, NetworkFunction, Site, SiteMetrics, SiteScore, epoch_secs};

/// Runners-up kept on a decision.
pub const MAX_ALTERNATIVES: usize = 3;

/// A re-placement must beat the old score by this factor to replace it.
pub const REBALANCE_THRESHOLD: f64 = 1.1;

/// Latency ceiling (ms) above which a regional UPF placement is explained as
/// bandwidth-driven.
const TOLERANT_LATENCY_MS: f64 = 15.0;

/// Feasible sites best-first, plus the sites the gate excluded.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub scored: Vec<SiteScore>,
    pub rejected: Vec<SiteRejection>,
}

/// Gate and score every site, sorted by score descending.
///
/// The sort is stable, so equal scores keep input order.
pub fn rank_sites(nf: &NetworkFunction, sites: &[Site], weights: &Weights) -> Ranking {
    let mut ranking = Ranking::default();

    for site in sites {
        if let Err(rejection) = constraints::check(nf, site) {
            debug!(nf = %nf.id, site = %site.id, reason = %rejection, "site rejected");
            ranking.rejected.push(SiteRejection {
                site_id: site.id.clone(),
                code: rejection.code(),
                reason: rejection.to_string(),
            });
            continue;
        }

        let score = scorer::score(nf, site, weights);
        debug!(nf = %nf.id, site = %site.id, score, "scored site");
        ranking.scored.push(SiteScore {
            site: site.clone(),
            score,
        });
    }

    ranking.scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking
}

/// Turn a ranking into a decision, or a coded error when nothing is feasible.
pub fn decide(nf: &NetworkFunction, ranking: Ranking, sites_checked: usize) -> PlacementResult<Decision> {
    if sites_checked == 0 {
        return Err(PlacementError::new(
            ErrorCode::NoSuitableSite,
            "no sites available for placement",
        ));
    }

    let mut scored = ranking.scored.into_iter();
    let Some(best) = scored.next() else {
        return Err(PlacementError::new(
            ErrorCode::NoSuitableSite,
            format!("no site meets requirements for {}", nf.nf_type),
        )
        .with_details(ErrorDetails {
            nf_type: nf.nf_type.clone(),
            requirements: nf.requirements.clone(),
            qos: nf.qos_requirements.clone(),
            sites_checked,
            rejected: ranking.rejected,
        }));
    };

    Ok(Decision {
        network_function: nf.clone(),
        reason: explain(nf, &best.site, best.score),
        score: best.score,
        site: best.site,
        alternatives: scored.take(MAX_ALTERNATIVES).collect(),
        timestamp: epoch_secs(),
    })
}

/// Human-readable explanation for placing `nf` on `site`.
pub fn explain(nf: &NetworkFunction, site: &Site, score: f64) -> String {
    let qos = &nf.qos_requirements;
    let mut reason = format!("Placed {} on {} ({} cloud)", nf.nf_type, site.name, site.site_type);

    let class = AffinityClass::of(nf);
    if class == AffinityClass::UltraLowLatencyUserPlane && site.site_type == CloudType::Edge {
        reason.push_str(&format!(" for ultra-low latency ({:.1}ms)", site.effective_latency_ms()));
    } else if nf.nf_type == "UPF"
        && qos.min_throughput_mbps >= HIGH_BANDWIDTH_MBPS
        && site.site_type == CloudType::Regional
        && qos.max_latency_ms > TOLERANT_LATENCY_MS
    {
        reason.push_str(&format!(
            " for high bandwidth ({:.1} Mbps available)",
            site.network_profile.max_throughput_mbps
        ));
    } else {
        reason.push_str(&format!(" with score {score:.1}/100"));
    }

    if let Some(m) = &site.metrics {
        reason.push_str(&format!(
            " [CPU: {:.0}%, Mem: {:.0}%]",
            m.cpu_utilization, m.memory_utilization
        ));
    }

    reason
}

/// Latency-aware placement over a metrics provider.
#[derive(Clone)]
pub struct PlacementPolicy {
    provider: Arc<dyn MetricsProvider>,
    weights: Weights,
}

impl PlacementPolicy {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self::with_weights(provider, Weights::default())
    }

    pub fn with_weights(provider: Arc<dyn MetricsProvider>, weights: Weights) -> Self {
        Self { provider, weights }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn provider(&self) -> &Arc<dyn MetricsProvider> {
        &self.provider
    }

    /// Fetch all metrics once, tolerating provider failure.
    pub fn fetch_metrics(&self) -> HashMap<String, SiteMetrics> {
        match self.provider.get_all_metrics() {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "metrics unavailable, using static network profiles");
                HashMap::new()
            }
        }
    }

    /// Local copies of `sites` with live metrics overlaid where known.
    pub fn snapshot(&self, sites: &[Site]) -> Vec<Site> {
        overlay_metrics(sites, &self.fetch_metrics())
    }

    /// Place a single network function.
    pub fn place(&self, nf: &NetworkFunction, sites: &[Site]) -> PlacementResult<Decision> {
        if sites.is_empty() {
            return decide(nf, Ranking::default(), 0);
        }
        let local = self.snapshot(sites);
        let ranking = rank_sites(nf, &local, &self.weights);
        let decision = decide(nf, ranking, sites.len())?;

        debug!(
            nf = %nf.id,
            site = %decision.site.id,
            score = decision.score,
            alternatives = decision.alternatives.len(),
            "placement decided"
        );
        Ok(decision)
    }

    /// Place NFs sequentially in input order, failing fast.
    ///
    /// Each placement bumps the chosen site's local metrics so later NFs in
    /// the batch see less headroom. The provider is never written.
    pub fn place_multiple(&self, nfs: &[NetworkFunction], sites: &[Site]) -> Result<Vec<Decision>, BatchError> {
        let mut local = self.snapshot(sites);
        let mut decisions = Vec::with_capacity(nfs.len());

        for (index, nf) in nfs.iter().enumerate() {
            let ranking = rank_sites(nf, &local, &self.weights);
            let decision = decide(nf, ranking, local.len()).map_err(|source| BatchError {
                nf_type: nf.nf_type.clone(),
                index,
                source,
            })?;

            if let Some(m) = local
                .iter_mut()
                .find(|s| s.id == decision.site.id)
                .and_then(|s| s.metrics.as_mut())
            {
                m.simulate_placement();
            }
            decisions.push(decision);
        }

        info!(placed = decisions.len(), sites = sites.len(), "sequential batch placed");
        Ok(decisions)
    }

    /// Re-place existing decisions, keeping the old one unless the new
    /// score is more than 10% better. Failures keep the old decision.
    pub fn rebalance(&self, decisions: &[Decision], sites: &[Site]) -> Vec<Decision> {
        let mut moved = 0usize;
        let result: Vec<Decision> = decisions
            .iter()
            .map(|old| match self.place(&old.network_function, sites) {
                Ok(new) if new.score > old.score * REBALANCE_THRESHOLD => {
                    debug!(
                        nf = %old.network_function.id,
                        from = %old.site.id,
                        to = %new.site.id,
                        old_score = old.score,
                        new_score = new.score,
                        "rebalanced"
                    );
                    moved += 1;
                    new
                }
                Ok(_) => old.clone(),
                Err(e) => {
                    warn!(nf = %old.network_function.id, error = %e, "rebalance skipped, keeping placement");
                    old.clone()
                }
            })
            .collect();

        info!(total = decisions.len(), moved, "rebalance complete");
        result
    }
}

/// Clone `sites`, replacing `metrics` with the provider's snapshot when present.
pub fn overlay_metrics(sites: &[Site], metrics: &HashMap<String, SiteMetrics>) -> Vec<Site> {
    sites
        .iter()
        .map(|site| {
            let mut site = site.clone();
            if let Some(m) = metrics.get(&site.id) {
                site.metrics = Some(m.clone());
            }
            site
        })
        .collect()
}
