//! Caching placement layer.
//!
//! Wraps a [`PlacementPolicy`] with two caches behind one `RwLock`:
//! - **Site scores**: per-site values that do not depend on the NF
//!   (utilization score, resource ratio, cloud-type preferences), valid for
//!   one TTL and refreshed in a single metrics fetch
//! - **Decisions**: request key to decision, TTL-bound and capped, with
//!   single-oldest eviction
//!
//! A lookup miss falls back to a fast path that uses cached site values
//! where valid and the full scorer otherwise. When more than half the TTL
//! has passed since the last refresh, a background task re-precomputes site
//! scores without blocking the caller. The task stops when the
//! `CachedPolicy` is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mano_placement::constraints;
use mano_placement::scorer::{self, AffinityClass};
use mano_placement::{
    CacheConfig, Decision, KeyMode, NetworkFunction, PlacementPolicy, PlacementResult,
    Ranking, Site, SiteRejection, SiteScore, Weights, decide, overlay_metrics,
};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::SchedulerResult;

/// Precomputed, NF-independent values for one site.
#[derive(Debug, Clone)]
pub struct CachedSiteScore {
    pub site_id: String,
    /// Utilization component of the full score (0-100).
    pub base_score: f64,
    /// Mean free CPU/memory fraction, 1.0 without metrics. Reporting only;
    /// eligibility is decided by the constraint validator.
    pub resource_ratio: f64,
    /// Throughput and latency capability (0-100), for reporting.
    pub network_score: f64,
    /// Cloud-type preference per affinity class.
    pub cloud_type_prefs: HashMap<AffinityClass, f64>,
    pub last_updated: Instant,
    pub valid_until: Instant,
}

impl CachedSiteScore {
    fn compute(site: &Site, now: Instant, config: &CacheConfig) -> Self {
        let resource_ratio = match &site.metrics {
            Some(m) => 1.0 - m.average_utilization() / 100.0,
            None => 1.0,
        };

        let profile = &site.network_profile;
        let network_score = (profile.max_throughput_mbps / 100.0).min(1.0) * 50.0
            + (50.0 - site.effective_latency_ms()).max(0.0);

        let cloud_type_prefs = AffinityClass::ALL
            .iter()
            .map(|class| (*class, class.preference(site.site_type)))
            .collect();

        Self {
            site_id: site.id.clone(),
            base_score: scorer::utilization_score(site),
            resource_ratio,
            network_score,
            cloud_type_prefs,
            last_updated: now,
            valid_until: now + config.ttl,
        }
    }

    pub fn is_valid(&self, now: Instant) -> bool {
        now < self.valid_until
    }

    /// Full score for `nf`, reusing the cached NF-independent components.
    pub fn score_for(&self, nf: &NetworkFunction, site: &Site, weights: &Weights) -> f64 {
        let class = AffinityClass::of(nf);
        let cloud_type = self
            .cloud_type_prefs
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.preference(site.site_type));

        let weighted = weights.latency * scorer::latency_score(nf, site)
            + weights.resources * scorer::resource_score(nf, site)
            + weights.throughput * scorer::throughput_score(nf, site)
            + weights.cloud_type * cloud_type
            + weights.utilization * self.base_score;

        scorer::apply_hints(weighted, scorer::hint_score(nf, site))
    }
}

struct CachedDecision {
    decision: Decision,
    created_at: Instant,
    hit_count: AtomicU64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Sites scored from a valid precomputed entry.
    pub precompute_hits: u64,
    /// Running mean over all requests.
    pub avg_decision_time_ms: f64,
    pub cached_sites: usize,
    pub cached_decisions: usize,
    /// Hits summed over live decision entries.
    pub decision_entry_hits: u64,
    /// Background site-score refreshes that ran to completion.
    pub background_refreshes: u64,
}

#[derive(Default)]
struct Counters {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    precompute_hits: u64,
    avg_decision_time_ms: f64,
}

impl Counters {
    fn record(&mut self, hit: bool, precomputed: u64, started: Instant) {
        self.total_requests += 1;
        if hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        self.precompute_hits += precomputed;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let n = self.total_requests as f64;
        self.avg_decision_time_ms += (elapsed_ms - self.avg_decision_time_ms) / n;
    }
}

#[derive(Default)]
struct CacheState {
    site_scores: HashMap<String, CachedSiteScore>,
    decisions: HashMap<String, CachedDecision>,
    last_refresh: Option<Instant>,
}

struct Inner {
    policy: PlacementPolicy,
    config: CacheConfig,
    state: RwLock<CacheState>,
    counters: Mutex<Counters>,
    refreshing: AtomicBool,
    refreshes: AtomicU64,
    shutdown: watch::Receiver<bool>,
}

impl Inner {
    async fn precompute(&self, sites: &[Site]) -> usize {
        let local = overlay_metrics(sites, &self.policy.fetch_metrics());
        let now = Instant::now();
        let entries: Vec<CachedSiteScore> = local
            .iter()
            .map(|site| CachedSiteScore::compute(site, now, &self.config))
            .collect();

        let count = entries.len();
        let mut state = self.state.write().await;
        for entry in entries {
            state.site_scores.insert(entry.site_id.clone(), entry);
        }
        state.last_refresh = Some(now);
        count
    }
}

/// A placement policy fronted by site-score and decision caches.
pub struct CachedPolicy {
    inner: Arc<Inner>,
    shutdown: watch::Sender<bool>,
}

impl CachedPolicy {
    pub fn new(policy: PlacementPolicy, config: CacheConfig) -> SchedulerResult<Self> {
        config.validate()?;
        let (shutdown, rx) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(Inner {
                policy,
                config,
                state: RwLock::new(CacheState::default()),
                counters: Mutex::new(Counters::default()),
                refreshing: AtomicBool::new(false),
                refreshes: AtomicU64::new(0),
                shutdown: rx,
            }),
            shutdown,
        })
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.inner.policy
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Decision-cache key for a request.
    pub fn request_key(&self, nf: &NetworkFunction, sites: &[Site]) -> String {
        let qos = &nf.qos_requirements;
        let mut key = format!(
            "{}_{}_{}_{}_{}_{}_{}",
            nf.nf_type,
            qos.max_latency_ms,
            qos.min_throughput_mbps,
            qos.max_packet_loss_rate,
            qos.max_jitter_ms,
            nf.requirements.min_cpu_cores,
            sites.len()
        );
        if self.inner.config.key_mode == KeyMode::Exact {
            key.push('|');
            key.push_str(&nf.id);
            for site in sites {
                key.push('|');
                key.push_str(&site.id);
            }
        }
        key
    }

    /// Place one NF, serving from the decision cache when possible.
    ///
    /// A hit returns the cached site and score re-bound to the requesting NF.
    pub async fn place(&self, nf: &NetworkFunction, sites: &[Site]) -> PlacementResult<Decision> {
        let started = Instant::now();
        let key = self.request_key(nf, sites);
        let ttl = self.inner.config.ttl;

        let (hit, expired, stale) = {
            let state = self.inner.state.read().await;
            let stale = state
                .last_refresh
                .is_none_or(|t| t.elapsed() > ttl / 2);
            match state.decisions.get(&key) {
                Some(cached) if cached.created_at.elapsed() < ttl => {
                    cached.hit_count.fetch_add(1, Ordering::Relaxed);
                    let mut decision = cached.decision.clone();
                    decision.network_function = nf.clone();
                    (Some(decision), false, stale)
                }
                Some(_) => (None, true, stale),
                None => (None, false, stale),
            }
        };

        if let Some(decision) = hit {
            debug!(nf = %nf.id, key = %key, site = %decision.site.id, "decision cache hit");
            self.inner.counters.lock().await.record(true, 0, started);
            return Ok(decision);
        }

        if expired {
            let mut state = self.inner.state.write().await;
            if state
                .decisions
                .get(&key)
                .is_some_and(|c| c.created_at.elapsed() >= ttl)
            {
                state.decisions.remove(&key);
                debug!(key = %key, "expired decision evicted");
            }
        }

        if stale {
            self.spawn_refresh(sites);
        }

        let (result, precomputed) = self.place_fast(nf, sites).await;
        self.inner
            .counters
            .lock()
            .await
            .record(false, precomputed, started);

        let decision = result?;
        self.store(key, &decision).await;
        Ok(decision)
    }

    /// Gate and score using cached site values where valid.
    async fn place_fast(&self, nf: &NetworkFunction, sites: &[Site]) -> (PlacementResult<Decision>, u64) {
        if sites.is_empty() {
            return (decide(nf, Ranking::default(), 0), 0);
        }

        let policy = &self.inner.policy;
        let local = overlay_metrics(sites, &policy.fetch_metrics());
        let now = Instant::now();
        let mut ranking = Ranking::default();
        let mut precomputed = 0u64;

        {
            let state = self.inner.state.read().await;
            for site in &local {
                let cached = state.site_scores.get(&site.id).filter(|c| c.is_valid(now));

                if let Err(rejection) = constraints::check(nf, site) {
                    ranking.rejected.push(SiteRejection {
                        site_id: site.id.clone(),
                        code: rejection.code(),
                        reason: rejection.to_string(),
                    });
                    continue;
                }

                let score = match cached {
                    Some(c) => {
                        precomputed += 1;
                        c.score_for(nf, site, policy.weights())
                    }
                    None => scorer::score(nf, site, policy.weights()),
                };
                ranking.scored.push(SiteScore {
                    site: site.clone(),
                    score,
                });
            }
        }

        ranking.scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        (decide(nf, ranking, sites.len()), precomputed)
    }

    async fn store(&self, key: String, decision: &Decision) {
        let mut state = self.inner.state.write().await;
        if !state.decisions.contains_key(&key) && state.decisions.len() >= self.inner.config.max_decisions {
            let oldest = state
                .decisions
                .iter()
                .min_by_key(|(_, c)| c.created_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.decisions.remove(&oldest);
                debug!(key = %oldest, "decision cache full, evicted oldest");
            }
        }
        state.decisions.insert(
            key,
            CachedDecision {
                decision: decision.clone(),
                created_at: Instant::now(),
                hit_count: AtomicU64::new(0),
            },
        );
    }

    fn spawn_refresh(&self, sites: &[Site]) {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let sites = sites.to_vec();
        let mut shutdown = inner.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("background refresh cancelled");
                }
                count = inner.precompute(&sites) => {
                    inner.refreshes.fetch_add(1, Ordering::Relaxed);
                    debug!(sites = count, "background refresh complete");
                }
            }
            inner.refreshing.store(false, Ordering::Release);
        });
    }

    /// Refresh every site entry from one metrics fetch.
    pub async fn precompute_site_scores(&self, sites: &[Site]) -> usize {
        let count = self.inner.precompute(sites).await;
        info!(sites = count, ttl_secs = self.inner.config.ttl.as_secs(), "site scores precomputed");
        count
    }

    /// Drop both caches at once. Counters are kept.
    pub async fn clear_cache(&self) {
        let mut state = self.inner.state.write().await;
        state.site_scores.clear();
        state.decisions.clear();
        state.last_refresh = None;
        debug!("placement caches cleared");
    }

    pub async fn cached_site_score(&self, site_id: &str) -> Option<CachedSiteScore> {
        self.inner.state.read().await.site_scores.get(site_id).cloned()
    }

    pub async fn stats(&self) -> CacheStats {
        let (cached_sites, cached_decisions, decision_entry_hits) = {
            let state = self.inner.state.read().await;
            (
                state.site_scores.len(),
                state.decisions.len(),
                state
                    .decisions
                    .values()
                    .map(|c| c.hit_count.load(Ordering::Relaxed))
                    .sum(),
            )
        };
        let c = self.inner.counters.lock().await;
        CacheStats {
            total_requests: c.total_requests,
            cache_hits: c.cache_hits,
            cache_misses: c.cache_misses,
            precompute_hits: c.precompute_hits,
            avg_decision_time_ms: c.avg_decision_time_ms,
            cached_sites,
            cached_decisions,
            decision_entry_hits,
            background_refreshes: self.inner.refreshes.load(Ordering::Relaxed),
        }
    }
}

impl Drop for CachedPolicy {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
