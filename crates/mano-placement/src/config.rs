//! Scoring weights, optimizer/cache settings and the TOML inventory file.
//!
//! ```toml
//! [weights]
//! latency = 0.25
//! resources = 0.25
//! throughput = 0.15
//! cloud_type = 0.25
//! utilization = 0.10
//!
//! [cache]
//! ttl = 300
//! key_mode = "structural"
//!
//! [[sites]]
//! id = "edge-01"
//! name = "Edge 01"
//! type = "edge"
//! available = true
//! ...
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Site;

/// Largest distance from 1.0 a weight sum may have.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Durations as whole seconds on the wire.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Relative importance of the five score components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub latency: f64,
    pub resources: f64,
    pub throughput: f64,
    pub cloud_type: f64,
    pub utilization: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            latency: 0.25,
            resources: 0.25,
            throughput: 0.15,
            cloud_type: 0.25,
            utilization: 0.10,
        }
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.latency + self.resources + self.throughput + self.cloud_type + self.utilization
    }

    /// Components must be non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let components = [
            ("latency", self.latency),
            ("resources", self.resources),
            ("throughput", self.throughput),
            ("cloud_type", self.cloud_type),
            ("utilization", self.utilization),
        ];
        for (name, value) in components {
            if value < 0.0 || value.is_nan() {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(sum));
        }
        Ok(())
    }
}

/// Settings for the multi-objective optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub default_algorithm: String,
    pub cache_enabled: bool,
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    pub max_iterations: u32,
    pub convergence_threshold: f64,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub parallel_workers: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            default_algorithm: "weighted_score".to_string(),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(300),
            max_iterations: 1000,
            convergence_threshold: 0.001,
            timeout: Duration::from_secs(30),
            parallel_workers: 4,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_algorithm.is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "optimizer.default_algorithm",
                reason: "must not be empty".to_string(),
            });
        }
        if self.parallel_workers == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "optimizer.parallel_workers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// How decision-cache keys are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// NF type, QoS, minimum CPU and site count. Distinct NFs with the same
    /// shape share an entry.
    #[default]
    Structural,
    /// Structural key plus NF ID and the ordered site IDs.
    Exact,
}

/// Settings for the caching placement layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    pub max_decisions: usize,
    pub key_mode: KeyMode,
    pub parallel_workers: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_decisions: 1000,
            key_mode: KeyMode::Structural,
            parallel_workers: 4,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidSetting {
                name: "cache.ttl",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_decisions == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "cache.max_decisions",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.parallel_workers == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "cache.parallel_workers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A site inventory with optional engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sites: Vec<Site>,
}

impl InventoryFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.optimizer.validate()?;
        self.cache.validate()?;

        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.id.as_str()) {
                return Err(ConfigError::InvalidSetting {
                    name: "sites",
                    reason: format!("duplicate site id {}", site.id),
                });
            }
        }
        Ok(())
    }
}

impl FromStr for InventoryFile {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> anyhow::Result<Self> {
        let inventory: InventoryFile = toml::from_str(content)?;
        inventory.validate()?;
        Ok(inventory)
    }
}
