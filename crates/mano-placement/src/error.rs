//! Placement error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{QosRequirements, ResourceRequirements};

/// Machine-readable failure class a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No feasible site after constraint filtering, or empty input.
    NoSuitableSite,
    InsufficientResources,
    QosViolation,
    SiteUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoSuitableSite => "NO_SUITABLE_SITE",
            ErrorCode::InsufficientResources => "INSUFFICIENT_RESOURCES",
            ErrorCode::QosViolation => "QOS_VIOLATION",
            ErrorCode::SiteUnavailable => "SITE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one candidate site was excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRejection {
    pub site_id: String,
    pub code: ErrorCode,
    pub reason: String,
}

/// Diagnostic context attached to a failed placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub nf_type: String,
    pub requirements: ResourceRequirements,
    pub qos: QosRequirements,
    pub sites_checked: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<SiteRejection>,
}

/// A coded placement failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct PlacementError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl PlacementError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// A sequential batch aborted on one network function.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to place {nf_type}: {source}")]
pub struct BatchError {
    pub nf_type: String,
    /// Position of the failing network function in the input.
    pub index: usize,
    #[source]
    pub source: PlacementError,
}

/// Errors returned by a metrics provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("no metrics for site: {0}")]
    UnknownSite(String),

    #[error("metrics provider unavailable: {0}")]
    Unavailable(String),
}

/// Invalid weights or cache/optimizer settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("weight {name} is negative: {value}")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

pub type PlacementResult<T> = Result<T, PlacementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_leads_with_code() {
        let err = PlacementError::new(ErrorCode::NoSuitableSite, "no sites provided");
        assert_eq!(err.to_string(), "NO_SUITABLE_SITE: no sites provided");
    }

    #[test]
    fn batch_error_names_nf_type() {
        let err = BatchError {
            nf_type: "UPF".to_string(),
            index: 2,
            source: PlacementError::new(ErrorCode::NoSuitableSite, "no suitable site found"),
        };
        assert_eq!(
            err.to_string(),
            "failed to place UPF: NO_SUITABLE_SITE: no suitable site found"
        );
    }

    #[test]
    fn code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::QosViolation).unwrap();
        assert_eq!(json, "\"QOS_VIOLATION\"");
    }
}
