//! Scheduler error types.

use std::time::Duration;

use mano_placement::{BatchError, ConfigError, PlacementError};
use thiserror::Error;

/// Errors from the caching policy and the worker-pool batch runner.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error("failed to place {nf_type}: {source}")]
    Batch {
        nf_type: String,
        #[source]
        source: PlacementError,
    },

    #[error("placement worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("worker pool closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<BatchError> for SchedulerError {
    fn from(e: BatchError) -> Self {
        SchedulerError::Batch {
            nf_type: e.nf_type,
            source: e.source,
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Structural failures of the multi-objective optimizer.
///
/// Constraint violations are not errors; they travel on the solution.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("no network functions to place")]
    NoNetworkFunctions,

    #[error("no sites available")]
    NoSites,

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("optimization timed out after {0:?}")]
    Timeout(Duration),

    #[error("no suitable site found for {0}")]
    NoSuitableSite(String),

    #[error("optimizer worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type OptimizerResult<T> = Result<T, OptimizerError>;
