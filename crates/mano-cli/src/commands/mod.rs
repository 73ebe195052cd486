pub mod batch;
pub mod optimize;
pub mod plan;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use mano_placement::{InMemoryMetricsProvider, InventoryFile, MetricsProvider, NetworkFunction, PlacementPolicy};
use serde::Serialize;
use tracing::info;

use crate::intent::{QosIntent, read_intents};

/// Input and output paths shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Inputs {
    /// Site inventory (TOML).
    #[arg(short, long)]
    pub inventory: PathBuf,

    /// QoS intents, one JSON object per line.
    #[arg(short = 'n', long)]
    pub intents: PathBuf,

    /// Synthesize metrics for sites from their ID naming.
    #[arg(long)]
    pub simulate_metrics: bool,

    /// Write the result here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// One intent with its slice ID and derived NF.
pub struct Slice {
    pub id: String,
    pub intent: QosIntent,
    pub nf: NetworkFunction,
}

pub struct Loaded {
    pub inventory: InventoryFile,
    pub provider: Arc<InMemoryMetricsProvider>,
    pub slices: Vec<Slice>,
}

impl Loaded {
    pub fn policy(&self) -> PlacementPolicy {
        let provider: Arc<dyn MetricsProvider> = self.provider.clone();
        PlacementPolicy::with_weights(provider, self.inventory.weights.clone())
    }

    pub fn network_functions(&self) -> Vec<NetworkFunction> {
        self.slices.iter().map(|s| s.nf.clone()).collect()
    }
}

/// Read the inventory and intents, and seed a provider from them.
///
/// Metrics written in the inventory are served as-is; `simulate_metrics`
/// fills in the remaining sites from their naming scenario.
pub fn load(inputs: &Inputs) -> anyhow::Result<Loaded> {
    let inventory = InventoryFile::from_file(&inputs.inventory)
        .with_context(|| format!("loading inventory {}", inputs.inventory.display()))?;
    let intents = read_intents(&inputs.intents)?;

    let provider = if inputs.simulate_metrics {
        InMemoryMetricsProvider::with_scenarios(inventory.sites.iter().map(|s| s.id.as_str()))
    } else {
        InMemoryMetricsProvider::new()
    };
    for site in &inventory.sites {
        if let Some(m) = &site.metrics {
            provider.set_metrics(&site.id, m.clone());
        }
    }

    let slices: Vec<Slice> = intents
        .into_iter()
        .enumerate()
        .map(|(i, intent)| {
            let id = intent.slice_id(i);
            let nf = intent.network_function(&id);
            Slice { id, intent, nf }
        })
        .collect();

    info!(
        sites = inventory.sites.len(),
        slices = slices.len(),
        simulated = inputs.simulate_metrics,
        "inputs loaded"
    );

    Ok(Loaded {
        inventory,
        provider: Arc::new(provider),
        slices,
    })
}

/// Pretty-print `value` as JSON to the output file, or stdout.
pub fn emit<T: Serialize>(inputs: &Inputs, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match &inputs.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;

    pub(crate) const INVENTORY: &str = r#"
[[sites]]
id = "edge-01"
name = "Edge 01"
type = "edge"
available = true

[sites.capacity]
cpu_cores = 16
memory_gb = 32
storage_gb = 500
bandwidth_mbps = 5000.0

[sites.network_profile]
base_latency_ms = 5.0
max_throughput_mbps = 5000.0
packet_loss_rate = 0.0001
jitter_ms = 1.0

[sites.metrics]
timestamp = 0
cpu_utilization = 20.0
memory_utilization = 25.0
available_bandwidth_mbps = 4000.0
current_latency_ms = 0.0
active_nfs = 2

[[sites]]
id = "regional-01"
name = "Regional 01"
type = "regional"
available = true

[sites.capacity]
cpu_cores = 64
memory_gb = 128
storage_gb = 2000
bandwidth_mbps = 5000.0

[sites.network_profile]
base_latency_ms = 15.7
max_throughput_mbps = 5000.0
packet_loss_rate = 0.0001
jitter_ms = 3.0

[[sites]]
id = "central-01"
name = "Central 01"
type = "central"
available = true

[sites.capacity]
cpu_cores = 256
memory_gb = 512
storage_gb = 10000
bandwidth_mbps = 5000.0

[sites.network_profile]
base_latency_ms = 25.0
max_throughput_mbps = 5000.0
packet_loss_rate = 0.00001
jitter_ms = 5.0
"#;

    pub(crate) const INTENTS: &str = r#"{"bandwidth": 4.57, "latency": 8.05, "slice_type": "UPF"}
{"bandwidth": 0.93, "latency": 3.15, "slice_type": "UPF", "jitter": 2.0, "packet_loss": 0.001}
{"bandwidth": 10.0, "latency": 25.0, "slice_type": "AMF"}
"#;

    pub(crate) fn inputs(dir: &Path) -> Inputs {
        let inventory = dir.join("sites.toml");
        let intents = dir.join("intents.jsonl");
        std::fs::write(&inventory, INVENTORY).unwrap();
        std::fs::write(&intents, INTENTS).unwrap();
        Inputs {
            inventory,
            intents,
            simulate_metrics: false,
            output: Some(dir.join("out.json")),
        }
    }

    #[test]
    fn load_seeds_provider_from_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&inputs(dir.path())).unwrap();

        assert_eq!(loaded.inventory.sites.len(), 3);
        assert_eq!(loaded.slices.len(), 3);
        assert_eq!(loaded.slices[0].id, "slice-UPF-001");
        assert_eq!(loaded.slices[2].nf.nf_type, "AMF");

        let all = loaded.provider.get_all_metrics().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["edge-01"].cpu_utilization, 20.0);
    }

    #[test]
    fn simulated_metrics_cover_every_site() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = inputs(dir.path());
        inputs.simulate_metrics = true;
        let loaded = load(&inputs).unwrap();

        let all = loaded.provider.get_all_metrics().unwrap();
        assert_eq!(all.len(), 3);
        // Inventory values win over the naming scenario.
        assert_eq!(all["edge-01"].cpu_utilization, 20.0);
    }

    #[test]
    fn missing_inventory_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = inputs(dir.path());
        inputs.inventory = dir.path().join("nope.toml");
        let err = load(&inputs).err().unwrap();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn emit_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        emit(&inputs, &vec![1, 2, 3]).unwrap();
        let written: Vec<u32> =
            serde_json::from_str(&std::fs::read_to_string(inputs.output.unwrap()).unwrap()).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }
}
