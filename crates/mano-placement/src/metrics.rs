//! Live site metrics.
//!
//! The engine reads metrics through [`MetricsProvider`] and always works on
//! owned copies, so simulated post-placement load never reaches the source.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::MetricsError;
use crate::types::{SiteMetrics, epoch_secs};

/// Callback invoked with each new snapshot for a subscribed site.
pub type MetricsCallback = Arc<dyn Fn(&SiteMetrics) + Send + Sync>;

/// Source of live per-site utilization.
pub trait MetricsProvider: Send + Sync {
    fn get_metrics(&self, site_id: &str) -> Result<SiteMetrics, MetricsError>;

    /// One snapshot for every site the provider knows about.
    fn get_all_metrics(&self) -> Result<HashMap<String, SiteMetrics>, MetricsError>;

    fn subscribe(&self, site_id: &str, callback: MetricsCallback);
}

/// Baseline utilization profile used to synthesize metrics for a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsScenario {
    pub base_cpu: f64,
    pub base_memory: f64,
    pub base_bandwidth: f64,
    pub base_latency: f64,
    /// Utilization ramps up by one point per simulated step.
    pub trend_up: bool,
}

impl MetricsScenario {
    pub const EDGE: Self = Self {
        base_cpu: 30.0,
        base_memory: 35.0,
        base_bandwidth: 100.0,
        base_latency: 5.0,
        trend_up: false,
    };

    pub const REGIONAL: Self = Self {
        base_cpu: 50.0,
        base_memory: 55.0,
        base_bandwidth: 1000.0,
        base_latency: 15.0,
        trend_up: false,
    };

    pub const CENTRAL: Self = Self {
        base_cpu: 65.0,
        base_memory: 70.0,
        base_bandwidth: 10000.0,
        base_latency: 25.0,
        trend_up: true,
    };

    pub const GENERIC: Self = Self {
        base_cpu: 40.0,
        base_memory: 45.0,
        base_bandwidth: 500.0,
        base_latency: 10.0,
        trend_up: false,
    };

    /// Pick a scenario from conventional site naming.
    pub fn infer(site_id: &str) -> Self {
        let id = site_id.to_ascii_lowercase();
        let has_any = |keys: &[&str]| keys.iter().any(|k| id.contains(k));

        if has_any(&["edge", "ran", "access"]) {
            Self::EDGE
        } else if has_any(&["regional", "metro", "aggregation"]) {
            Self::REGIONAL
        } else if has_any(&["central", "core", "datacenter", "dc"]) {
            Self::CENTRAL
        } else {
            Self::GENERIC
        }
    }

    /// Snapshot after `step` simulated ticks.
    pub fn snapshot(&self, step: u32) -> SiteMetrics {
        let ramp = if self.trend_up { f64::from(step) } else { 0.0 };
        let cpu = (self.base_cpu + ramp).min(100.0);
        let memory = (self.base_memory + ramp).min(100.0);

        SiteMetrics {
            timestamp: epoch_secs() + u64::from(step),
            cpu_utilization: cpu,
            memory_utilization: memory,
            available_bandwidth_mbps: self.base_bandwidth,
            current_latency_ms: self.base_latency,
            active_nfs: (cpu / 10.0) as u32,
        }
    }
}

#[derive(Default)]
struct ProviderState {
    metrics: HashMap<String, SiteMetrics>,
    scenarios: HashMap<String, MetricsScenario>,
    subscribers: HashMap<String, Vec<MetricsCallback>>,
}

/// Provider backed by explicit snapshots and per-site scenarios.
///
/// Explicit snapshots take precedence over scenarios. A provider with
/// neither returns an empty map, which makes the policy score from static
/// network profiles.
#[derive(Default)]
pub struct InMemoryMetricsProvider {
    state: RwLock<ProviderState>,
}

impl InMemoryMetricsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with an inferred scenario for each site ID.
    pub fn with_scenarios<'a>(site_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let provider = Self::new();
        for id in site_ids {
            provider.set_scenario(id, MetricsScenario::infer(id));
        }
        provider
    }

    /// Store a snapshot and notify the site's subscribers.
    pub fn set_metrics(&self, site_id: &str, metrics: SiteMetrics) {
        let callbacks = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.metrics.insert(site_id.to_string(), metrics.clone());
            state.subscribers.get(site_id).cloned().unwrap_or_default()
        };

        debug!(site = site_id, subscribers = callbacks.len(), "metrics updated");
        for cb in callbacks {
            cb(&metrics);
        }
    }

    pub fn set_scenario(&self, site_id: &str, scenario: MetricsScenario) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.scenarios.insert(site_id.to_string(), scenario);
    }

    /// Drop every snapshot and scenario. Subscriptions survive.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.metrics.clear();
        state.scenarios.clear();
    }

    /// A time series of `steps` snapshots from the site's scenario.
    pub fn simulate_series(&self, site_id: &str, steps: u32) -> Result<Vec<SiteMetrics>, MetricsError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let scenario = state
            .scenarios
            .get(site_id)
            .ok_or_else(|| MetricsError::UnknownSite(site_id.to_string()))?;
        Ok((0..steps).map(|step| scenario.snapshot(step)).collect())
    }
}

impl MetricsProvider for InMemoryMetricsProvider {
    fn get_metrics(&self, site_id: &str) -> Result<SiteMetrics, MetricsError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(m) = state.metrics.get(site_id) {
            return Ok(m.clone());
        }
        state
            .scenarios
            .get(site_id)
            .map(|s| s.snapshot(0))
            .ok_or_else(|| MetricsError::UnknownSite(site_id.to_string()))
    }

    fn get_all_metrics(&self) -> Result<HashMap<String, SiteMetrics>, MetricsError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: HashMap<String, SiteMetrics> = state
            .scenarios
            .iter()
            .map(|(id, s)| (id.clone(), s.snapshot(0)))
            .collect();
        for (id, m) in &state.metrics {
            all.insert(id.clone(), m.clone());
        }
        Ok(all)
    }

    fn subscribe(&self, site_id: &str, callback: MetricsCallback) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .subscribers
            .entry(site_id.to_string())
            .or_default()
            .push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn infers_scenario_from_site_naming() {
        assert_eq!(MetricsScenario::infer("edge-sf-01"), MetricsScenario::EDGE);
        assert_eq!(MetricsScenario::infer("Metro-2"), MetricsScenario::REGIONAL);
        assert_eq!(MetricsScenario::infer("core-dc"), MetricsScenario::CENTRAL);
        assert_eq!(MetricsScenario::infer("site-7"), MetricsScenario::GENERIC);
    }

    #[test]
    fn scenario_snapshot_derives_active_nfs() {
        let m = MetricsScenario::CENTRAL.snapshot(0);
        assert_eq!(m.cpu_utilization, 65.0);
        assert_eq!(m.active_nfs, 6);
        assert_eq!(m.available_bandwidth_mbps, 10000.0);
    }

    #[test]
    fn series_ramps_only_trending_scenarios() {
        let provider = InMemoryMetricsProvider::with_scenarios(["edge-1", "central-1"]);

        let edge = provider.simulate_series("edge-1", 3).unwrap();
        assert!(edge.iter().all(|m| m.cpu_utilization == 30.0));

        let central = provider.simulate_series("central-1", 3).unwrap();
        let cpu: Vec<f64> = central.iter().map(|m| m.cpu_utilization).collect();
        assert_eq!(cpu, vec![65.0, 66.0, 67.0]);

        assert!(matches!(
            provider.simulate_series("nope", 1),
            Err(MetricsError::UnknownSite(_))
        ));
    }

    #[test]
    fn explicit_metrics_override_scenarios() {
        let provider = InMemoryMetricsProvider::with_scenarios(["edge-1"]);
        provider.set_metrics(
            "edge-1",
            SiteMetrics {
                cpu_utilization: 5.0,
                ..Default::default()
            },
        );

        assert_eq!(provider.get_metrics("edge-1").unwrap().cpu_utilization, 5.0);
        assert_eq!(provider.get_all_metrics().unwrap()["edge-1"].cpu_utilization, 5.0);
    }

    #[test]
    fn empty_provider_reports_nothing() {
        let provider = InMemoryMetricsProvider::new();
        assert!(provider.get_all_metrics().unwrap().is_empty());
        assert!(provider.get_metrics("edge-1").is_err());
    }

    #[test]
    fn subscribers_notified_on_update() {
        let provider = InMemoryMetricsProvider::new();
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        provider.subscribe(
            "edge-1",
            Arc::new(move |m: &SiteMetrics| {
                assert_eq!(m.cpu_utilization, 42.0);
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        provider.set_metrics(
            "edge-1",
            SiteMetrics {
                cpu_utilization: 42.0,
                ..Default::default()
            },
        );
        provider.set_metrics("edge-2", SiteMetrics::default());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_clears_state() {
        let provider = InMemoryMetricsProvider::with_scenarios(["edge-1"]);
        provider.reset();
        assert!(provider.get_all_metrics().unwrap().is_empty());
    }
}
