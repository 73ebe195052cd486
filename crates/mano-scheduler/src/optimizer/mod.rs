//! Multi-objective placement optimizer.
//!
//! Holds a registry of named objectives, constraints and algorithms. A run:
//! 1. Rejects empty input and resolves the algorithm (unknown is an error)
//! 2. Serves a cached solution for the same algorithm/shape/5-minute bucket
//! 3. Runs the algorithm on the blocking pool under the configured timeout
//! 4. Checks every constraint for every placement actually made
//! 5. Scores the solution: weighted objective mean minus penalties, in [0, 1]
//!
//! Constraint violations never fail a run; callers that need strict
//! feasibility check [`PlacementSolution::feasible`].

pub mod algorithm;
pub mod constraint;
pub mod objective;
pub mod solution;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use mano_placement::{MetricsProvider, NetworkFunction, OptimizerConfig, Site, epoch_secs};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub use algorithm::{Algorithm, Deadline, Genetic, SimulatedAnnealing, WeightedScore};
pub use constraint::{Constraint, ConstraintType, ConstraintValidator, default_constraints};
pub use objective::{Objective, ObjectiveEvaluator, ObjectiveType, default_objectives};
pub use solution::{ConstraintViolation, PlacementSolution, Severity};

use crate::error::{OptimizerError, OptimizerResult};

/// Width of the solution-cache time bucket, in seconds.
const CACHE_BUCKET_SECS: u64 = 300;

struct CachedSolution {
    solution: PlacementSolution,
    stored_at: Instant,
}

/// Registry-driven optimizer over whole NF sets.
pub struct PlacementOptimizer {
    provider: Arc<dyn MetricsProvider>,
    config: OptimizerConfig,
    objectives: Vec<Objective>,
    constraints: Vec<Constraint>,
    algorithms: HashMap<String, Arc<dyn Algorithm>>,
    cache: Option<RwLock<HashMap<String, CachedSolution>>>,
}

impl PlacementOptimizer {
    /// Optimizer with the default objectives, constraints and algorithms.
    pub fn new(provider: Arc<dyn MetricsProvider>, config: OptimizerConfig) -> OptimizerResult<Self> {
        config.validate()?;

        let mut optimizer = Self {
            objectives: default_objectives(Arc::clone(&provider)),
            constraints: default_constraints(),
            algorithms: HashMap::new(),
            cache: config.cache_enabled.then(|| RwLock::new(HashMap::new())),
            provider,
            config,
        };

        optimizer.register_algorithm(WeightedScore);
        optimizer.register_algorithm(Genetic::default());
        optimizer.register_algorithm(SimulatedAnnealing::new(optimizer.config.max_iterations));
        info!(count = optimizer.algorithms.len(), "registered optimization algorithms");

        Ok(optimizer)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn MetricsProvider> {
        &self.provider
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn add_objective(&mut self, objective: Objective) {
        info!(name = %objective.name, weight = objective.weight, "added optimization objective");
        self.objectives.push(objective);
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        info!(name = %constraint.name, mandatory = constraint.mandatory, "added placement constraint");
        self.constraints.push(constraint);
    }

    /// Register an algorithm under its own name, replacing any previous one.
    pub fn register_algorithm(&mut self, algorithm: impl Algorithm + 'static) {
        let name = algorithm.name().to_string();
        debug!(algorithm = %name, "registered algorithm");
        self.algorithms.insert(name, Arc::new(algorithm));
    }

    /// Registered algorithm names, sorted.
    pub fn algorithm_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.algorithms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Solution-cache key: algorithm, input shape and 5-minute bucket.
    pub fn cache_key(&self, algorithm: &str, nfs: &[NetworkFunction], sites: &[Site]) -> String {
        format!(
            "{algorithm}-{}-{}-{}",
            nfs.len(),
            sites.len(),
            epoch_secs() / CACHE_BUCKET_SECS
        )
    }

    /// Place every NF with the named algorithm, or the configured default.
    pub async fn optimize_multiple(
        &self,
        nfs: &[NetworkFunction],
        sites: &[Site],
        algorithm: Option<&str>,
    ) -> OptimizerResult<PlacementSolution> {
        if nfs.is_empty() {
            return Err(OptimizerError::NoNetworkFunctions);
        }
        if sites.is_empty() {
            return Err(OptimizerError::NoSites);
        }

        let name = algorithm
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.config.default_algorithm);
        let algo = self
            .algorithms
            .get(name)
            .cloned()
            .ok_or_else(|| OptimizerError::UnknownAlgorithm(name.to_string()))?;

        info!(
            network_functions = nfs.len(),
            sites = sites.len(),
            algorithm = name,
            "starting multi-objective optimization"
        );

        let key = self.cache_key(name, nfs, sites);
        if let Some(cached) = self.cached_solution(&key).await {
            info!(cache_key = %key, "returning cached solution");
            return Ok(cached);
        }

        let started = Instant::now();
        let timeout = self.config.timeout;
        let deadline = Deadline::after(timeout);
        let (task_nfs, task_sites, objectives) = (nfs.to_vec(), sites.to_vec(), self.objectives.clone());
        let task = tokio::task::spawn_blocking(move || {
            algo.optimize(&task_nfs, &task_sites, &objectives, &deadline)
        });

        let mut solution = match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined??,
            Err(_) => return Err(OptimizerError::Timeout(timeout)),
        };

        solution.violations = self.validate_constraints(&solution, nfs, sites);
        solution.score = self.final_score(&solution);
        solution.metadata.insert("nf_count".to_string(), nfs.len().into());
        solution.metadata.insert("site_count".to_string(), sites.len().into());
        solution
            .metadata
            .insert("elapsed_ms".to_string(), (started.elapsed().as_millis() as u64).into());

        if let Some(cache) = &self.cache {
            let ttl = self.config.cache_ttl;
            let mut entries = cache.write().await;
            entries.insert(
                key,
                CachedSolution {
                    solution: solution.clone(),
                    stored_at: Instant::now(),
                },
            );
            entries.retain(|_, e| e.stored_at.elapsed() <= ttl);
        }

        info!(
            algorithm = %solution.algorithm,
            score = solution.score,
            violations = solution.violations.len(),
            "optimization completed"
        );
        Ok(solution)
    }

    async fn cached_solution(&self, key: &str) -> Option<PlacementSolution> {
        let cache = self.cache.as_ref()?;
        let entries = cache.read().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() <= self.config.cache_ttl)
            .map(|e| e.solution.clone())
    }

    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.write().await.clear();
        }
    }

    /// Check every constraint for every placed NF/site pair.
    pub fn validate_constraints(
        &self,
        solution: &PlacementSolution,
        nfs: &[NetworkFunction],
        sites: &[Site],
    ) -> Vec<ConstraintViolation> {
        let nf_by_id: HashMap<&str, &NetworkFunction> = nfs.iter().map(|n| (n.id.as_str(), n)).collect();
        let site_by_id: HashMap<&str, &Site> = sites.iter().map(|s| (s.id.as_str(), s)).collect();

        let mut violations = Vec::new();
        for (nf_id, decision) in &solution.placements {
            let (Some(nf), Some(site)) = (
                nf_by_id.get(nf_id.as_str()),
                site_by_id.get(decision.site.id.as_str()),
            ) else {
                continue;
            };

            for constraint in &self.constraints {
                if let Some(v) = constraint.check(solution, nf, site) {
                    debug!(nf = %nf.id, site = %site.id, constraint = %v.constraint, severity = %v.severity, "constraint violated");
                    violations.push(v);
                }
            }
        }
        violations
    }

    /// Weighted objective mean minus violation penalties, clamped to [0, 1].
    pub fn final_score(&self, solution: &PlacementSolution) -> f64 {
        let mut score = 0.0;
        let mut total_weight = 0.0;
        for objective in &self.objectives {
            let value = solution.objectives.get(&objective.name).copied().unwrap_or(0.0);
            score += value * objective.weight;
            total_weight += objective.weight;
        }
        if total_weight > 0.0 {
            score /= total_weight;
        }

        for violation in &solution.violations {
            score -= violation.score_penalty();
        }
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mano_placement::*;

    fn make_site(id: &str, site_type: CloudType, latency: f64) -> Site {
        Site {
            id: id.to_string(),
            name: id.to_string(),
            site_type,
            location: Location::default(),
            capacity: ResourceCapacity {
                cpu_cores: 64,
                memory_gb: 128,
                storage_gb: 2000,
                bandwidth_mbps: 5000.0,
            },
            network_profile: NetworkProfile {
                base_latency_ms: latency,
                max_throughput_mbps: 5000.0,
                packet_loss_rate: 0.0001,
                jitter_ms: 1.0,
            },
            metrics: None,
            available: true,
        }
    }

    fn make_nf(id: &str, max_latency: f64) -> NetworkFunction {
        NetworkFunction {
            id: id.to_string(),
            nf_type: "UPF".to_string(),
            requirements: ResourceRequirements {
                min_cpu_cores: 2,
                min_memory_gb: 4,
                min_storage_gb: 50,
                min_bandwidth_mbps: 100.0,
            },
            qos_requirements: QosRequirements {
                max_latency_ms: max_latency,
                min_throughput_mbps: 100.0,
                max_packet_loss_rate: 0.001,
                max_jitter_ms: 5.0,
            },
            hints: vec![],
        }
    }

    fn optimizer(config: OptimizerConfig) -> PlacementOptimizer {
        PlacementOptimizer::new(Arc::new(InMemoryMetricsProvider::new()), config).unwrap()
    }

    fn sites() -> Vec<Site> {
        vec![
            make_site("edge-1", CloudType::Edge, 5.0),
            make_site("central-1", CloudType::Central, 25.0),
        ]
    }

    #[test]
    fn registers_builtins() {
        let opt = optimizer(OptimizerConfig::default());
        assert_eq!(
            opt.algorithm_names(),
            vec!["genetic", "simulated_annealing", "weighted_score"]
        );
        assert_eq!(opt.objectives().len(), 5);
        assert_eq!(opt.constraints().len(), 3);
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let opt = optimizer(OptimizerConfig::default());
        assert!(matches!(
            opt.optimize_multiple(&[], &sites(), None).await,
            Err(OptimizerError::NoNetworkFunctions)
        ));
        assert!(matches!(
            opt.optimize_multiple(&[make_nf("a", 10.0)], &[], None).await,
            Err(OptimizerError::NoSites)
        ));
    }

    #[tokio::test]
    async fn unknown_algorithm_is_an_error() {
        let opt = optimizer(OptimizerConfig::default());
        let err = opt
            .optimize_multiple(&[make_nf("a", 10.0)], &sites(), Some("quantum"))
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizerError::UnknownAlgorithm(name) if name == "quantum"));
    }

    #[tokio::test]
    async fn feasible_solution_has_no_violations() {
        let opt = optimizer(OptimizerConfig::default());
        let solution = opt
            .optimize_multiple(&[make_nf("a", 10.0), make_nf("b", 50.0)], &sites(), None)
            .await
            .unwrap();

        assert_eq!(solution.algorithm, "weighted_score");
        assert_eq!(solution.placements["a"].site.id, "edge-1");
        assert!(solution.feasible());
        assert!((0.0..=1.0).contains(&solution.score));
        assert_eq!(solution.metadata["nf_count"], 2);
        assert_eq!(solution.metadata["site_count"], 2);
    }

    #[tokio::test]
    async fn mandatory_violation_penalizes_but_returns() {
        let opt = optimizer(OptimizerConfig {
            cache_enabled: false,
            ..Default::default()
        });
        // No site meets 1ms; the best site still gets assigned.
        let solution = opt
            .optimize_multiple(&[make_nf("a", 1.0)], &sites(), None)
            .await
            .unwrap();

        assert!(!solution.feasible());
        assert_eq!(solution.violations.len(), 1);
        assert_eq!(solution.violations[0].constraint, "QoS Requirements");
        assert_eq!(solution.violations[0].severity, Severity::Error);
        // A 500-point error costs 0.5 of the normalized score.
        let mut unpenalized = solution.clone();
        unpenalized.violations.clear();
        let expected = (opt.final_score(&unpenalized) - 0.5).max(0.0);
        assert!((solution.score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn warnings_cost_half_an_error() {
        let mut opt = optimizer(OptimizerConfig {
            cache_enabled: false,
            ..Default::default()
        });
        opt.add_constraint(Constraint::new(
            "Prefer Central",
            ConstraintType::Location,
            false,
            200.0,
            |_: &PlacementSolution, _: &NetworkFunction, site: &Site| site.site_type == CloudType::Central,
        ));

        let solution = opt
            .optimize_multiple(&[make_nf("a", 10.0)], &sites(), None)
            .await
            .unwrap();
        assert!(solution.feasible());
        assert_eq!(solution.violations.len(), 1);
        assert_eq!(solution.violations[0].severity, Severity::Warning);

        let mut clean = solution.clone();
        clean.violations.clear();
        assert!((opt.final_score(&clean) - solution.score - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_timeout_fails_with_timeout() {
        let opt = optimizer(OptimizerConfig {
            timeout: Duration::ZERO,
            cache_enabled: false,
            ..Default::default()
        });
        let err = opt
            .optimize_multiple(&[make_nf("a", 10.0)], &sites(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizerError::Timeout(_)));
    }

    #[tokio::test]
    async fn cached_by_shape() {
        let opt = optimizer(OptimizerConfig::default());
        let first = opt
            .optimize_multiple(&[make_nf("a", 10.0)], &sites(), Some("weighted_score"))
            .await
            .unwrap();
        // Same shape and bucket: the cached solution comes back as-is.
        let second = opt
            .optimize_multiple(&[make_nf("z", 50.0)], &sites(), None)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        opt.clear_cache().await;
        let third = opt
            .optimize_multiple(&[make_nf("z", 50.0)], &sites(), None)
            .await
            .unwrap();
        assert_ne!(first.id, third.id);
    }

    #[tokio::test]
    async fn stub_algorithms_report_their_name() {
        let opt = optimizer(OptimizerConfig::default());
        let solution = opt
            .optimize_multiple(&[make_nf("a", 10.0)], &sites(), Some("simulated_annealing"))
            .await
            .unwrap();
        assert_eq!(solution.algorithm, "simulated_annealing");
    }
}
