//! Inventory model for placement.
//!
//! Sites and network functions are built by callers for each request and
//! are read-only to the engine, apart from the transient `metrics` copy a
//! policy overlays onto its own clone of each site.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique identifier for a site.
pub type SiteId = String;

/// Unique identifier for a network function.
pub type NfId = String;

/// CPU utilization added to a site after each placement in a sequential batch.
pub const SIMULATED_CPU_DELTA: f64 = 10.0;

/// Memory utilization added to a site after each placement in a sequential batch.
pub const SIMULATED_MEMORY_DELTA: f64 = 15.0;

// ── Site ───────────────────────────────────────────────────────────

/// Tier of O-Cloud infrastructure a site belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    /// Ultra-low latency, small capacity.
    Edge,
    /// Balanced latency and capacity.
    Regional,
    /// High capacity, highest latency.
    Central,
}

impl CloudType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudType::Edge => "edge",
            CloudType::Regional => "regional",
            CloudType::Central => "central",
        }
    }
}

impl fmt::Display for CloudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic position of a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub region: String,
    pub zone: String,
}

/// Static resource ceiling of a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapacity {
    pub cpu_cores: u32,
    pub memory_gb: u32,
    pub storage_gb: u32,
    pub bandwidth_mbps: f64,
}

/// Static network characteristics of a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Base latency to reach the site (ms).
    pub base_latency_ms: f64,
    pub max_throughput_mbps: f64,
    /// Packet loss rate (0-1).
    pub packet_loss_rate: f64,
    pub jitter_ms: f64,
}

/// Live, time-stamped utilization snapshot for a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteMetrics {
    /// Unix timestamp (seconds) of collection.
    pub timestamp: u64,
    /// CPU utilization (0-100).
    pub cpu_utilization: f64,
    /// Memory utilization (0-100).
    pub memory_utilization: f64,
    pub available_bandwidth_mbps: f64,
    /// Measured latency; zero means "not measured".
    pub current_latency_ms: f64,
    pub active_nfs: u32,
}

impl SiteMetrics {
    /// Mean of CPU and memory utilization.
    pub fn average_utilization(&self) -> f64 {
        (self.cpu_utilization + self.memory_utilization) / 2.0
    }

    /// Bump utilization by the fixed per-placement deltas.
    ///
    /// Only ever applied to a policy's local copy, never to provider state.
    pub fn simulate_placement(&mut self) {
        self.active_nfs += 1;
        self.cpu_utilization += SIMULATED_CPU_DELTA;
        self.memory_utilization += SIMULATED_MEMORY_DELTA;
    }
}

/// A deployable O-Cloud location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    #[serde(rename = "type")]
    pub site_type: CloudType,
    #[serde(default)]
    pub location: Location,
    pub capacity: ResourceCapacity,
    pub network_profile: NetworkProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SiteMetrics>,
    pub available: bool,
}

impl Site {
    /// Live latency when measured, otherwise the static base latency.
    pub fn effective_latency_ms(&self) -> f64 {
        match &self.metrics {
            Some(m) if m.current_latency_ms > 0.0 => m.current_latency_ms,
            _ => self.network_profile.base_latency_ms,
        }
    }
}

// ── Network function ───────────────────────────────────────────────

/// Minimum resources a network function needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub min_cpu_cores: u32,
    pub min_memory_gb: u32,
    pub min_storage_gb: u32,
    pub min_bandwidth_mbps: f64,
}

/// QoS bounds a placement must respect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QosRequirements {
    pub max_latency_ms: f64,
    pub min_throughput_mbps: f64,
    pub max_packet_loss_rate: f64,
    pub max_jitter_ms: f64,
}

/// Kind of operator-supplied placement hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintType {
    Affinity,
    AntiAffinity,
    /// Matches a site's region or zone.
    Location,
    /// Matches a site's cloud type.
    CloudType,
}

/// Soft preference attached to a network function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementHint {
    #[serde(rename = "type")]
    pub hint_type: HintType,
    pub value: String,
    /// Relative weight (0-100); larger values are scored as 100.
    pub weight: u32,
}

/// A VNF/CNF to be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkFunction {
    pub id: NfId,
    /// NF kind, e.g. "UPF", "AMF", "SMF", "RAN".
    #[serde(rename = "type")]
    pub nf_type: String,
    pub requirements: ResourceRequirements,
    pub qos_requirements: QosRequirements,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<PlacementHint>,
}

// ── Decisions ──────────────────────────────────────────────────────

/// A site paired with its placement score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteScore {
    pub site: Site,
    pub score: f64,
}

/// Outcome of placing a single network function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub network_function: NetworkFunction,
    pub site: Site,
    /// Placement quality (0-100).
    pub score: f64,
    pub reason: String,
    /// Up to three runners-up, best first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<SiteScore>,
    /// Unix timestamp (seconds) of the decision.
    pub timestamp: u64,
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
