//! mano-scheduler: async placement services over `mano-placement`.
//!
//! # Architecture
//!
//! ```text
//! CachedPolicy
//!   ├── PlacementPolicy (validator, scorer, metrics provider)
//!   ├── site-score cache (per site, TTL-bound, background refresh)
//!   └── decision cache (per request key, TTL-bound, capped)
//!
//! BatchRunner
//!   └── CachedPolicy shared by N workers (semaphore-bounded)
//!
//! PlacementOptimizer
//!   ├── objectives / constraints (pluggable, weighted)
//!   ├── algorithms (registry, run on the blocking pool with a deadline)
//!   └── solution cache (algorithm + input shape + 5-minute bucket)
//! ```

pub mod batch;
pub mod cache;
pub mod error;
pub mod optimizer;

pub use batch::BatchRunner;
pub use cache::{CacheStats, CachedPolicy, CachedSiteScore};
pub use error::{OptimizerError, OptimizerResult, SchedulerError, SchedulerResult};
pub use optimizer::{
    Algorithm, Constraint, ConstraintType, ConstraintViolation, Objective, ObjectiveType, PlacementOptimizer,
    PlacementSolution, Severity,
};
