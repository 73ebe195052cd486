//! Optimization algorithms and the run deadline.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use mano_placement::{Decision, NetworkFunction, Site, epoch_secs};
use tracing::{debug, warn};

use super::objective::Objective;
use super::solution::PlacementSolution;
use crate::error::{OptimizerError, OptimizerResult};

/// Wall-clock budget for one optimization run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// `Err(Timeout)` once the budget is spent.
    pub fn check(&self) -> OptimizerResult<()> {
        if self.expired() {
            return Err(OptimizerError::Timeout(self.budget));
        }
        Ok(())
    }
}

/// A strategy that assigns every NF to a site.
pub trait Algorithm: Send + Sync {
    fn name(&self) -> &str;

    /// Build a solution with placements and per-objective means filled in.
    /// Constraint checks and the final score are left to the caller.
    fn optimize(
        &self,
        nfs: &[NetworkFunction],
        sites: &[Site],
        objectives: &[Objective],
        deadline: &Deadline,
    ) -> OptimizerResult<PlacementSolution>;
}

/// Assigns each NF independently to its best site by weighted objective mean.
///
/// No feasibility gate is applied; infeasible picks surface later as
/// constraint violations.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScore;

impl WeightedScore {
    pub const NAME: &'static str = "weighted_score";

    /// Weighted mean of every objective for one pair, in [0, 1].
    pub fn site_score(nf: &NetworkFunction, site: &Site, objectives: &[Objective]) -> f64 {
        let mut total = 0.0;
        let mut weight = 0.0;
        for objective in objectives {
            total += objective.evaluate(None, nf, site) * objective.weight;
            weight += objective.weight;
        }
        if weight > 0.0 { total / weight } else { 0.0 }
    }

    /// First site with the strictly highest score.
    fn best_site<'a>(nf: &NetworkFunction, sites: &'a [Site], objectives: &[Objective]) -> Option<(&'a Site, f64)> {
        let mut best: Option<(&Site, f64)> = None;
        for site in sites {
            let score = Self::site_score(nf, site, objectives);
            if score.is_nan() {
                continue;
            }
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((site, score));
            }
        }
        best
    }

    fn run(
        name: &str,
        nfs: &[NetworkFunction],
        sites: &[Site],
        objectives: &[Objective],
        deadline: &Deadline,
    ) -> OptimizerResult<PlacementSolution> {
        let mut solution = PlacementSolution::new(name);

        for nf in nfs {
            deadline.check()?;
            let (site, score) = Self::best_site(nf, sites, objectives)
                .ok_or_else(|| OptimizerError::NoSuitableSite(nf.id.clone()))?;
            debug!(nf = %nf.id, site = %site.id, score, "assigned");

            solution.placements.insert(
                nf.id.clone(),
                Decision {
                    network_function: nf.clone(),
                    site: site.clone(),
                    score: score * 100.0,
                    reason: "Selected by weighted score algorithm".to_string(),
                    alternatives: Vec::new(),
                    timestamp: epoch_secs(),
                },
            );
        }

        let mut means = BTreeMap::new();
        for objective in objectives {
            let count = solution.placements.len();
            if count == 0 {
                continue;
            }
            let sum: f64 = solution
                .placements
                .values()
                .map(|d| objective.evaluate(Some(&solution), &d.network_function, &d.site))
                .sum();
            means.insert(objective.name.clone(), sum / count as f64);
        }
        solution.objectives = means;

        Ok(solution)
    }
}

impl Algorithm for WeightedScore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn optimize(
        &self,
        nfs: &[NetworkFunction],
        sites: &[Site],
        objectives: &[Objective],
        deadline: &Deadline,
    ) -> OptimizerResult<PlacementSolution> {
        Self::run(Self::NAME, nfs, sites, objectives, deadline)
    }
}

/// Registered under `genetic`. Runs the weighted-score assignment and labels
/// the result; the tuning parameters are kept for introspection only.
#[derive(Debug, Clone)]
pub struct Genetic {
    pub population_size: u32,
    pub generations: u32,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
}

impl Default for Genetic {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
        }
    }
}

impl Algorithm for Genetic {
    fn name(&self) -> &str {
        "genetic"
    }

    fn optimize(
        &self,
        nfs: &[NetworkFunction],
        sites: &[Site],
        objectives: &[Objective],
        deadline: &Deadline,
    ) -> OptimizerResult<PlacementSolution> {
        warn!(algorithm = self.name(), "no metaheuristic search, falling back to weighted score");
        WeightedScore::run(self.name(), nfs, sites, objectives, deadline)
    }
}

/// Registered under `simulated_annealing`. Same fallback as [`Genetic`].
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    pub initial_temp: f64,
    pub cooling_rate: f64,
    pub min_temp: f64,
    pub max_iterations: u32,
}

impl SimulatedAnnealing {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            initial_temp: 100.0,
            cooling_rate: 0.95,
            min_temp: 0.01,
            max_iterations,
        }
    }
}

impl Algorithm for SimulatedAnnealing {
    fn name(&self) -> &str {
        "simulated_annealing"
    }

    fn optimize(
        &self,
        nfs: &[NetworkFunction],
        sites: &[Site],
        objectives: &[Objective],
        deadline: &Deadline,
    ) -> OptimizerResult<PlacementSolution> {
        warn!(algorithm = self.name(), "no metaheuristic search, falling back to weighted score");
        WeightedScore::run(self.name(), nfs, sites, objectives, deadline)
    }
}
