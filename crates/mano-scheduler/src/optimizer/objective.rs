//! Named, weighted optimization objectives.

use std::fmt;
use std::sync::Arc;

use mano_placement::{CloudType, MetricsProvider, NetworkFunction, Site};
use serde::{Deserialize, Serialize};

use super::solution::PlacementSolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    MinimizeLatency,
    MaximizeThroughput,
    MinimizeCost,
    BalanceLoad,
    MaximizeReliability,
    MinimizeDistance,
    MaximizeEfficiency,
}

/// Rates how well `site` serves `nf`, in [0, 1].
///
/// `solution` is the solution under construction when available; per-site
/// ranking passes `None`.
pub trait ObjectiveEvaluator: Send + Sync {
    fn evaluate(&self, solution: Option<&PlacementSolution>, nf: &NetworkFunction, site: &Site) -> f64;
}

impl<F> ObjectiveEvaluator for F
where
    F: Fn(Option<&PlacementSolution>, &NetworkFunction, &Site) -> f64 + Send + Sync,
{
    fn evaluate(&self, solution: Option<&PlacementSolution>, nf: &NetworkFunction, site: &Site) -> f64 {
        self(solution, nf, site)
    }
}

/// An evaluator with a name, weight and priority.
#[derive(Clone)]
pub struct Objective {
    pub name: String,
    pub objective_type: ObjectiveType,
    pub weight: f64,
    /// Lower is more important. Informational.
    pub priority: u32,
    pub evaluator: Arc<dyn ObjectiveEvaluator>,
}

impl Objective {
    pub fn new(
        name: impl Into<String>,
        objective_type: ObjectiveType,
        weight: f64,
        priority: u32,
        evaluator: impl ObjectiveEvaluator + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            objective_type,
            weight,
            priority,
            evaluator: Arc::new(evaluator),
        }
    }

    pub fn evaluate(&self, solution: Option<&PlacementSolution>, nf: &NetworkFunction, site: &Site) -> f64 {
        self.evaluator.evaluate(solution, nf, site)
    }
}

impl fmt::Debug for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Objective")
            .field("name", &self.name)
            .field("objective_type", &self.objective_type)
            .field("weight", &self.weight)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// `(max - actual) / max`, zero once `actual` exceeds `max`.
fn headroom_below(actual: f64, max: f64) -> f64 {
    if actual > max {
        return 0.0;
    }
    if max <= 0.0 {
        return 1.0;
    }
    (max - actual) / max
}

/// Headroom under the NF's latency ceiling, from the static base latency.
pub struct LatencyObjective;

impl ObjectiveEvaluator for LatencyObjective {
    fn evaluate(&self, _: Option<&PlacementSolution>, nf: &NetworkFunction, site: &Site) -> f64 {
        headroom_below(site.network_profile.base_latency_ms, nf.qos_requirements.max_latency_ms)
    }
}

/// Site throughput over the NF's floor, capped at 2x.
pub struct ThroughputObjective;

impl ObjectiveEvaluator for ThroughputObjective {
    fn evaluate(&self, _: Option<&PlacementSolution>, nf: &NetworkFunction, site: &Site) -> f64 {
        let required = nf.qos_requirements.min_throughput_mbps;
        let available = site.network_profile.max_throughput_mbps;
        if available < required {
            return 0.0;
        }
        if required <= 0.0 {
            return 1.0;
        }
        (available / required).min(2.0) / 2.0
    }
}

/// Spare CPU/memory as reported by the provider; 0.5 when unknown.
pub struct BalanceLoadObjective {
    provider: Arc<dyn MetricsProvider>,
}

impl BalanceLoadObjective {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self { provider }
    }
}

impl ObjectiveEvaluator for BalanceLoadObjective {
    fn evaluate(&self, _: Option<&PlacementSolution>, _: &NetworkFunction, site: &Site) -> f64 {
        match self.provider.get_metrics(&site.id) {
            Ok(m) => ((100.0 - m.average_utilization()) / 100.0).clamp(0.0, 1.0),
            Err(_) => 0.5,
        }
    }
}

/// Flat per-tier cost model: central is cheapest.
pub struct CostObjective;

impl ObjectiveEvaluator for CostObjective {
    fn evaluate(&self, _: Option<&PlacementSolution>, _: &NetworkFunction, site: &Site) -> f64 {
        match site.site_type {
            CloudType::Edge => 0.8,
            CloudType::Regional => 0.9,
            CloudType::Central => 1.0,
        }
    }
}

/// Headroom under the NF's packet-loss ceiling.
pub struct ReliabilityObjective;

impl ObjectiveEvaluator for ReliabilityObjective {
    fn evaluate(&self, _: Option<&PlacementSolution>, nf: &NetworkFunction, site: &Site) -> f64 {
        headroom_below(
            site.network_profile.packet_loss_rate,
            nf.qos_requirements.max_packet_loss_rate,
        )
    }
}

/// The five built-in objectives, weights summing to 1.0.
pub fn default_objectives(provider: Arc<dyn MetricsProvider>) -> Vec<Objective> {
    vec![
        Objective::new("Minimize Latency", ObjectiveType::MinimizeLatency, 0.30, 1, LatencyObjective),
        Objective::new(
            "Maximize Throughput",
            ObjectiveType::MaximizeThroughput,
            0.25,
            2,
            ThroughputObjective,
        ),
        Objective::new(
            "Balance Load",
            ObjectiveType::BalanceLoad,
            0.20,
            3,
            BalanceLoadObjective::new(provider),
        ),
        Objective::new("Minimize Cost", ObjectiveType::MinimizeCost, 0.15, 4, CostObjective),
        Objective::new(
            "Maximize Reliability",
            ObjectiveType::MaximizeReliability,
            0.10,
            5,
            ReliabilityObjective,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mano_placement::*;

    fn make_site(site_type: CloudType, latency: f64, loss: f64) -> Site {
        Site {
            id: "site-1".to_string(),
            name: "site-1".to_string(),
            site_type,
            location: Location::default(),
            capacity: ResourceCapacity::default(),
            network_profile: NetworkProfile {
                base_latency_ms: latency,
                max_throughput_mbps: 1000.0,
                packet_loss_rate: loss,
                jitter_ms: 1.0,
            },
            metrics: None,
            available: true,
        }
    }

    fn make_nf() -> NetworkFunction {
        NetworkFunction {
            id: "upf-1".to_string(),
            nf_type: "UPF".to_string(),
            requirements: ResourceRequirements::default(),
            qos_requirements: QosRequirements {
                max_latency_ms: 20.0,
                min_throughput_mbps: 250.0,
                max_packet_loss_rate: 0.001,
                max_jitter_ms: 5.0,
            },
            hints: vec![],
        }
    }

    #[test]
    fn default_weights_sum_to_one() {
        let objectives = default_objectives(Arc::new(InMemoryMetricsProvider::new()));
        let names: Vec<&str> = objectives.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Minimize Latency",
                "Maximize Throughput",
                "Balance Load",
                "Minimize Cost",
                "Maximize Reliability"
            ]
        );
        let sum: f64 = objectives.iter().map(|o| o.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn latency_headroom() {
        let nf = make_nf();
        assert_eq!(LatencyObjective.evaluate(None, &nf, &make_site(CloudType::Edge, 5.0, 0.0)), 0.75);
        assert_eq!(LatencyObjective.evaluate(None, &nf, &make_site(CloudType::Edge, 25.0, 0.0)), 0.0);
    }

    #[test]
    fn throughput_caps_at_double() {
        let nf = make_nf();
        assert_eq!(ThroughputObjective.evaluate(None, &nf, &make_site(CloudType::Edge, 1.0, 0.0)), 1.0);
    }

    #[test]
    fn balance_load_reads_provider() {
        let provider = Arc::new(InMemoryMetricsProvider::new());
        let objective = BalanceLoadObjective::new(provider.clone());
        let site = make_site(CloudType::Edge, 1.0, 0.0);
        assert_eq!(objective.evaluate(None, &make_nf(), &site), 0.5);

        provider.set_metrics(
            "site-1",
            SiteMetrics {
                cpu_utilization: 40.0,
                memory_utilization: 20.0,
                ..Default::default()
            },
        );
        assert!((objective.evaluate(None, &make_nf(), &site) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn cost_and_reliability() {
        let nf = make_nf();
        assert_eq!(CostObjective.evaluate(None, &nf, &make_site(CloudType::Regional, 1.0, 0.0)), 0.9);
        let r = ReliabilityObjective.evaluate(None, &nf, &make_site(CloudType::Edge, 1.0, 0.0005));
        assert!((r - 0.5).abs() < 1e-9);
        assert_eq!(ReliabilityObjective.evaluate(None, &nf, &make_site(CloudType::Edge, 1.0, 0.01)), 0.0);
    }

    #[test]
    fn closures_are_evaluators() {
        let objective = Objective::new(
            "Prefer Edge",
            ObjectiveType::MinimizeDistance,
            1.0,
            1,
            |_: Option<&PlacementSolution>, _: &NetworkFunction, site: &Site| {
                if site.site_type == CloudType::Edge { 1.0 } else { 0.0 }
            },
        );
        assert_eq!(objective.evaluate(None, &make_nf(), &make_site(CloudType::Edge, 1.0, 0.0)), 1.0);
    }
}
