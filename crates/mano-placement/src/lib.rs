//! Network-function placement core for the slice MANO stack.
//!
//! This crate decides, for a single network function (NF), which O-Cloud
//! site (edge, regional or central) should host it. Everything here is
//! synchronous and works on caller-owned copies of the inventory; the
//! caching, worker-pool and multi-objective layers live in
//! `mano-scheduler`.
//!
//! # Components
//!
//! - **`types`**: inventory model (sites, NFs, decisions)
//! - **`metrics`**: `MetricsProvider` boundary and an in-memory provider
//! - **`constraints`**: hard eligibility gate
//! - **`scorer`**: five-part weighted score with hint multiplier
//! - **`policy`**: single, sequential-batch and rebalance placement
//! - **`config`**: weights, optimizer/cache settings, TOML inventory

pub mod config;
pub mod constraints;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod scorer;
pub mod types;

pub use config::{CacheConfig, InventoryFile, KeyMode, OptimizerConfig, Weights};
pub use constraints::{Rejection, meets_requirements};
pub use error::{
    BatchError, ConfigError, ErrorCode, ErrorDetails, MetricsError, PlacementError, PlacementResult,
    SiteRejection,
};
pub use metrics::{InMemoryMetricsProvider, MetricsCallback, MetricsProvider, MetricsScenario};
pub use policy::{PlacementPolicy, Ranking, decide, explain, overlay_metrics, rank_sites};
pub use scorer::{AffinityClass, ScoreBreakdown, score, score_breakdown};
pub use types::*;
