//! Site scoring for placement decisions.
//!
//! Every feasible (NF, site) pair gets a 0-100 score from a weighted sum of:
//! - **Latency fit**: headroom under the NF's latency ceiling
//! - **Resources**: static capacity relative to the requirement, capped at 2x
//! - **Throughput**: site throughput relative to the NF's floor, capped at 2x
//! - **Cloud type**: NF-type to cloud-tier affinity table
//! - **Utilization**: spare CPU/memory from live metrics
//!
//! Matching hints then boost the weighted sum by up to 100%.

use serde::Serialize;

use crate::config::Weights;
use crate::types::{CloudType, HintType, NetworkFunction, Site};

/// Headroom beyond this multiple of the requirement earns nothing extra.
const MAX_HEADROOM_RATIO: f64 = 2.0;

/// Latency ceiling (ms) at or below which a UPF counts as latency-critical.
pub const ULTRA_LOW_LATENCY_MS: f64 = 10.0;

/// Throughput floor (Mbps) at or above which a UPF counts as bandwidth-heavy.
pub const HIGH_BANDWIDTH_MBPS: f64 = 2.0;

/// Affinity row of the cloud-type table an NF falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AffinityClass {
    /// UPF with a tight latency ceiling.
    UltraLowLatencyUserPlane,
    /// UPF with a latency-tolerant, throughput-heavy profile.
    HighBandwidthUserPlane,
    /// AMF, SMF.
    ControlPlane,
    RadioAccess,
    General,
}

impl AffinityClass {
    pub const ALL: [AffinityClass; 5] = [
        AffinityClass::UltraLowLatencyUserPlane,
        AffinityClass::HighBandwidthUserPlane,
        AffinityClass::ControlPlane,
        AffinityClass::RadioAccess,
        AffinityClass::General,
    ];

    pub fn of(nf: &NetworkFunction) -> Self {
        let qos = &nf.qos_requirements;
        match nf.nf_type.as_str() {
            "UPF" if qos.max_latency_ms <= ULTRA_LOW_LATENCY_MS => {
                AffinityClass::UltraLowLatencyUserPlane
            }
            "UPF" if qos.min_throughput_mbps >= HIGH_BANDWIDTH_MBPS => {
                AffinityClass::HighBandwidthUserPlane
            }
            "AMF" | "SMF" => AffinityClass::ControlPlane,
            "RAN" => AffinityClass::RadioAccess,
            _ => AffinityClass::General,
        }
    }

    /// Preference (0-100) of this class for a cloud tier.
    pub fn preference(&self, cloud: CloudType) -> f64 {
        use CloudType::*;
        match (self, cloud) {
            (AffinityClass::UltraLowLatencyUserPlane, Edge) => 100.0,
            (AffinityClass::UltraLowLatencyUserPlane, Regional) => 40.0,
            (AffinityClass::UltraLowLatencyUserPlane, Central) => 10.0,

            (AffinityClass::HighBandwidthUserPlane, Regional) => 100.0,
            (AffinityClass::HighBandwidthUserPlane, Central) => 70.0,
            (AffinityClass::HighBandwidthUserPlane, Edge) => 30.0,

            (AffinityClass::ControlPlane, Central) => 100.0,
            (AffinityClass::ControlPlane, Regional) => 60.0,
            (AffinityClass::ControlPlane, Edge) => 10.0,

            (AffinityClass::RadioAccess, Edge) => 100.0,
            (AffinityClass::RadioAccess, Regional) => 10.0,
            (AffinityClass::RadioAccess, Central) => 0.0,

            (AffinityClass::General, Edge) => 50.0,
            (AffinityClass::General, Regional) => 70.0,
            (AffinityClass::General, Central) => 60.0,
        }
    }
}

/// Individual score components for debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub latency: f64,
    pub resources: f64,
    pub throughput: f64,
    pub cloud_type: f64,
    pub utilization: f64,
    /// Hint bonus in percent (0-100).
    pub hints: f64,
    /// Final clamped score.
    pub total: f64,
}

/// `min(available / required, 2) / 2`; a zero requirement is fully satisfied.
fn headroom(available: f64, required: f64) -> f64 {
    if required <= 0.0 {
        return 1.0;
    }
    (available / required).min(MAX_HEADROOM_RATIO) / MAX_HEADROOM_RATIO
}

pub fn latency_score(nf: &NetworkFunction, site: &Site) -> f64 {
    let latency = site.effective_latency_ms();
    let max = nf.qos_requirements.max_latency_ms;
    if max <= 0.0 {
        return if latency <= 0.0 { 100.0 } else { 0.0 };
    }
    100.0 * (1.0 - (latency / max).min(1.0))
}

pub fn resource_score(nf: &NetworkFunction, site: &Site) -> f64 {
    let req = &nf.requirements;
    let cap = &site.capacity;

    let cpu = headroom(f64::from(cap.cpu_cores), f64::from(req.min_cpu_cores));
    let mem = headroom(f64::from(cap.memory_gb), f64::from(req.min_memory_gb));
    let storage = headroom(f64::from(cap.storage_gb), f64::from(req.min_storage_gb));
    let bw = headroom(cap.bandwidth_mbps, req.min_bandwidth_mbps);

    100.0 * (cpu * 0.3 + mem * 0.3 + storage * 0.1 + bw * 0.3)
}

pub fn throughput_score(nf: &NetworkFunction, site: &Site) -> f64 {
    100.0
        * headroom(
            site.network_profile.max_throughput_mbps,
            nf.qos_requirements.min_throughput_mbps,
        )
}

pub fn cloud_type_score(nf: &NetworkFunction, site: &Site) -> f64 {
    AffinityClass::of(nf).preference(site.site_type)
}

/// Spare capacity from live metrics; 100 when the site has none.
pub fn utilization_score(site: &Site) -> f64 {
    match &site.metrics {
        Some(m) => (100.0 * (1.0 - m.average_utilization() / 100.0)).max(0.0),
        None => 100.0,
    }
}

/// Largest weight a single hint carries.
pub const MAX_HINT_WEIGHT: u32 = 100;

/// Share of total hint weight that matches this site, in percent.
///
/// Affinity and anti-affinity hints count toward the total but never match.
/// Weights above 100 count as 100.
pub fn hint_score(nf: &NetworkFunction, site: &Site) -> f64 {
    let mut matched = 0.0;
    let mut total = 0.0;

    for hint in &nf.hints {
        let weight = f64::from(hint.weight.min(MAX_HINT_WEIGHT)) / 100.0;
        total += weight;

        let hit = match hint.hint_type {
            HintType::CloudType => site.site_type.as_str() == hint.value,
            HintType::Location => {
                site.location.region == hint.value || site.location.zone == hint.value
            }
            HintType::Affinity | HintType::AntiAffinity => false,
        };
        if hit {
            matched += weight * 100.0;
        }
    }

    if total > 0.0 { matched / total } else { 0.0 }
}

/// Apply the hint bonus to a weighted sum and clamp to 0..=100.
pub fn apply_hints(weighted: f64, hint: f64) -> f64 {
    (weighted * (1.0 + hint / 100.0)).clamp(0.0, 100.0)
}

/// Score one site with every component exposed.
pub fn score_breakdown(nf: &NetworkFunction, site: &Site, weights: &Weights) -> ScoreBreakdown {
    let latency = latency_score(nf, site);
    let resources = resource_score(nf, site);
    let throughput = throughput_score(nf, site);
    let cloud_type = cloud_type_score(nf, site);
    let utilization = utilization_score(site);
    let hints = hint_score(nf, site);

    let weighted = weights.latency * latency
        + weights.resources * resources
        + weights.throughput * throughput
        + weights.cloud_type * cloud_type
        + weights.utilization * utilization;

    ScoreBreakdown {
        latency,
        resources,
        throughput,
        cloud_type,
        utilization,
        hints,
        total: apply_hints(weighted, hints),
    }
}

/// Score one site (0-100). Assumes the site already passed the hard gate.
pub fn score(nf: &NetworkFunction, site: &Site, weights: &Weights) -> f64 {
    score_breakdown(nf, site, weights).total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn make_site(id: &str, site_type: CloudType, latency: f64, throughput: f64) -> Site {
        Site {
            id: id.to_string(),
            name: id.to_string(),
            site_type,
            location: Location {
                region: "us-west".to_string(),
                zone: "zone-a".to_string(),
                ..Default::default()
            },
            capacity: ResourceCapacity {
                cpu_cores: 16,
                memory_gb: 32,
                storage_gb: 500,
                bandwidth_mbps: throughput,
            },
            network_profile: NetworkProfile {
                base_latency_ms: latency,
                max_throughput_mbps: throughput,
                packet_loss_rate: 0.0001,
                jitter_ms: 1.0,
            },
            metrics: None,
            available: true,
        }
    }

    fn make_nf(nf_type: &str, max_latency: f64, min_throughput: f64) -> NetworkFunction {
        NetworkFunction {
            id: format!("{nf_type}-1"),
            nf_type: nf_type.to_string(),
            requirements: ResourceRequirements {
                min_cpu_cores: 4,
                min_memory_gb: 8,
                min_storage_gb: 100,
                min_bandwidth_mbps: 1000.0,
            },
            qos_requirements: QosRequirements {
                max_latency_ms: max_latency,
                min_throughput_mbps: min_throughput,
                max_packet_loss_rate: 0.001,
                max_jitter_ms: 5.0,
            },
            hints: vec![],
        }
    }

    #[test]
    fn affinity_class_selection() {
        assert_eq!(
            AffinityClass::of(&make_nf("UPF", 6.3, 0.93)),
            AffinityClass::UltraLowLatencyUserPlane
        );
        assert_eq!(
            AffinityClass::of(&make_nf("UPF", 16.1, 4.57)),
            AffinityClass::HighBandwidthUserPlane
        );
        assert_eq!(AffinityClass::of(&make_nf("UPF", 20.0, 1.0)), AffinityClass::General);
        assert_eq!(AffinityClass::of(&make_nf("SMF", 50.0, 1.0)), AffinityClass::ControlPlane);
        assert_eq!(AffinityClass::of(&make_nf("RAN", 2.0, 1.0)), AffinityClass::RadioAccess);
        assert_eq!(AffinityClass::of(&make_nf("NWDAF", 50.0, 1.0)), AffinityClass::General);
    }

    #[test]
    fn latency_score_hits_zero_at_ceiling() {
        let nf = make_nf("UPF", 10.0, 1.0);
        assert_eq!(latency_score(&nf, &make_site("e", CloudType::Edge, 10.0, 100.0)), 0.0);
        assert_eq!(latency_score(&nf, &make_site("e", CloudType::Edge, 5.0, 100.0)), 50.0);
    }

    #[test]
    fn resource_score_flattens_past_double() {
        let nf = make_nf("UPF", 10.0, 1.0);
        let at_2x = make_site("e", CloudType::Edge, 1.0, 2000.0);
        let mut huge = at_2x.clone();
        huge.capacity.cpu_cores = 1000;
        huge.capacity.bandwidth_mbps = 1_000_000.0;

        assert!((resource_score(&nf, &at_2x) - 100.0).abs() < 1e-9);
        assert!((resource_score(&nf, &huge) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_requirements_count_as_satisfied() {
        let mut nf = make_nf("UPF", 10.0, 0.0);
        nf.requirements = ResourceRequirements::default();
        let site = make_site("e", CloudType::Edge, 1.0, 100.0);
        assert_eq!(resource_score(&nf, &site), 100.0);
        assert_eq!(throughput_score(&nf, &site), 100.0);
    }

    #[test]
    fn utilization_defaults_optimistic() {
        let mut site = make_site("e", CloudType::Edge, 1.0, 100.0);
        assert_eq!(utilization_score(&site), 100.0);

        site.metrics = Some(SiteMetrics {
            cpu_utilization: 40.0,
            memory_utilization: 60.0,
            ..Default::default()
        });
        assert_eq!(utilization_score(&site), 50.0);
    }

    #[test]
    fn hints_normalize_by_total_weight() {
        let mut nf = make_nf("UPF", 10.0, 1.0);
        nf.hints = vec![
            PlacementHint {
                hint_type: HintType::CloudType,
                value: "edge".to_string(),
                weight: 60,
            },
            PlacementHint {
                hint_type: HintType::Affinity,
                value: "amf-1".to_string(),
                weight: 40,
            },
        ];
        let edge = make_site("e", CloudType::Edge, 1.0, 100.0);
        let central = make_site("c", CloudType::Central, 1.0, 100.0);

        assert!((hint_score(&nf, &edge) - 60.0).abs() < 1e-9);
        assert_eq!(hint_score(&nf, &central), 0.0);
    }

    #[test]
    fn location_hint_matches_region_or_zone() {
        let mut nf = make_nf("UPF", 10.0, 1.0);
        nf.hints = vec![PlacementHint {
            hint_type: HintType::Location,
            value: "zone-a".to_string(),
            weight: 50,
        }];
        assert_eq!(hint_score(&nf, &make_site("e", CloudType::Edge, 1.0, 100.0)), 100.0);
    }

    #[test]
    fn oversized_hint_weights_count_as_100() {
        let mut nf = make_nf("UPF", 10.0, 1.0);
        nf.hints = vec![
            PlacementHint {
                hint_type: HintType::CloudType,
                value: "edge".to_string(),
                weight: 100,
            },
            PlacementHint {
                hint_type: HintType::Location,
                value: "nowhere".to_string(),
                weight: 300,
            },
        ];
        let edge = make_site("e", CloudType::Edge, 1.0, 100.0);
        assert!((hint_score(&nf, &edge) - 50.0).abs() < 1e-9);

        nf.hints[0].weight = 500;
        nf.hints.truncate(1);
        assert_eq!(hint_score(&nf, &edge), 100.0);
    }

    #[test]
    fn hints_boost_but_clamp() {
        assert_eq!(apply_hints(40.0, 50.0), 60.0);
        assert_eq!(apply_hints(80.0, 100.0), 100.0);
        assert_eq!(apply_hints(40.0, 0.0), 40.0);
    }

    #[test]
    fn total_within_bounds() {
        let weights = Weights::default();
        for nf_type in ["UPF", "AMF", "SMF", "RAN", "CN"] {
            let nf = make_nf(nf_type, 30.0, 5.0);
            for cloud in [CloudType::Edge, CloudType::Regional, CloudType::Central] {
                let s = score(&nf, &make_site("s", cloud, 5.0, 5000.0), &weights);
                assert!((0.0..=100.0).contains(&s), "{nf_type} on {cloud}: {s}");
            }
        }
    }

    #[test]
    fn low_latency_upf_prefers_edge() {
        let weights = Weights::default();
        let nf = make_nf("UPF", 6.3, 0.93);
        let edge = make_site("edge", CloudType::Edge, 5.0, 5000.0);
        let regional = make_site("regional", CloudType::Regional, 5.0, 5000.0);
        assert!(score(&nf, &edge, &weights) > score(&nf, &regional, &weights));
    }
}
