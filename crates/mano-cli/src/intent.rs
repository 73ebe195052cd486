//! QoS intents and the slice allocations planned from them.

use std::path::Path;

use anyhow::Context;
use mano_placement::{Decision, NetworkFunction, QosRequirements, ResourceRequirements};
use serde::{Deserialize, Serialize};

const DEFAULT_PACKET_LOSS: f64 = 0.01;
const DEFAULT_JITTER_MS: f64 = 10.0;
/// Latency ceiling used when doubling the intent's latency gives less than 1ms.
const FLOOR_LATENCY_MS: f64 = 20.0;

/// One parsed slice intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QosIntent {
    /// Mbps.
    pub bandwidth: f64,
    /// ms.
    pub latency: f64,
    #[serde(default)]
    pub slice_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<f64>,
}

impl QosIntent {
    /// `slice-{type}-{NNN}` for the 0-based position in the intent file.
    pub fn slice_id(&self, index: usize) -> String {
        format!("slice-{}-{:03}", self.slice_type, index + 1)
    }

    pub fn requirements(&self) -> ResourceRequirements {
        let scaled = |factor: f64| ((self.bandwidth * factor) as u32).max(1);
        ResourceRequirements {
            min_cpu_cores: scaled(0.1),
            min_memory_gb: scaled(0.1),
            min_storage_gb: scaled(0.5),
            min_bandwidth_mbps: self.bandwidth,
        }
    }

    pub fn qos(&self) -> QosRequirements {
        let doubled = self.latency * 2.0;
        QosRequirements {
            max_latency_ms: if doubled < 1.0 { FLOOR_LATENCY_MS } else { doubled },
            min_throughput_mbps: self.bandwidth,
            max_packet_loss_rate: self.packet_loss.filter(|p| *p > 0.0).unwrap_or(DEFAULT_PACKET_LOSS),
            max_jitter_ms: self.jitter.filter(|j| *j > 0.0).unwrap_or(DEFAULT_JITTER_MS),
        }
    }

    /// The NF that carries this slice, typed by slice type.
    pub fn network_function(&self, slice_id: &str) -> NetworkFunction {
        NetworkFunction {
            id: slice_id.to_string(),
            nf_type: self.slice_type.clone(),
            requirements: self.requirements(),
            qos_requirements: self.qos(),
            hints: Vec::new(),
        }
    }
}

/// A planned slice: its intent and where it landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceAllocation {
    pub slice_id: String,
    pub qos: QosIntent,
    pub placement: Decision,
    pub status: &'static str,
}

impl SliceAllocation {
    pub fn planned(slice_id: String, qos: QosIntent, placement: Decision) -> Self {
        Self {
            slice_id,
            qos,
            placement,
            status: "planned",
        }
    }
}

/// Parse a JSON-lines intent file, skipping blank lines.
pub fn read_intents(path: &Path) -> anyhow::Result<Vec<QosIntent>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading intents from {}", path.display()))?;
    parse_intents(&content)
}

pub fn parse_intents(content: &str) -> anyhow::Result<Vec<QosIntent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid intent on line {}", n + 1))
        })
        .collect()
}
