//! Batch-level optimizer output.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use mano_placement::{Decision, epoch_secs};
use serde::{Deserialize, Serialize};

/// How serious a constraint violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A non-mandatory constraint failed; half penalty.
    Warning,
    /// A mandatory constraint failed; full penalty.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One failed constraint for one NF/site pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub constraint: String,
    pub severity: Severity,
    pub description: String,
    pub penalty: f64,
}

impl ConstraintViolation {
    /// Amount subtracted from the normalized score.
    pub fn score_penalty(&self) -> f64 {
        match self.severity {
            Severity::Error => self.penalty / 1000.0,
            Severity::Warning => self.penalty / 2000.0,
        }
    }
}

/// Placement of a whole NF set by one algorithm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSolution {
    pub id: String,
    /// NF ID to decision.
    pub placements: BTreeMap<String, Decision>,
    /// Penalized weighted score, clamped to [0, 1].
    pub score: f64,
    /// Mean evaluator result per objective name.
    pub objectives: BTreeMap<String, f64>,
    #[serde(default)]
    pub violations: Vec<ConstraintViolation>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Unix timestamp (seconds).
    pub generated_at: u64,
    pub algorithm: String,
}

impl PlacementSolution {
    pub fn new(algorithm: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self {
            id: format!("solution-{nanos}"),
            placements: BTreeMap::new(),
            score: 0.0,
            objectives: BTreeMap::new(),
            violations: Vec::new(),
            metadata: BTreeMap::new(),
            generated_at: epoch_secs(),
            algorithm: algorithm.to_string(),
        }
    }

    /// No mandatory constraint was violated.
    pub fn feasible(&self) -> bool {
        !self.violations.iter().any(|v| v.severity == Severity::Error)
    }
}
