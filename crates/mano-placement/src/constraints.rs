//! Hard eligibility gate.
//!
//! A site that fails any check here is never scored. Checks run in a fixed
//! order: availability, static capacity, QoS, then live utilization ceilings
//! when the site carries metrics.

use thiserror::Error;

use crate::error::ErrorCode;
use crate::types::{NetworkFunction, Site};

/// Highest CPU utilization (percent) a site may report and still accept work.
pub const MAX_CPU_UTILIZATION: f64 = 80.0;

/// Highest memory utilization (percent) a site may report and still accept work.
pub const MAX_MEMORY_UTILIZATION: f64 = 85.0;

/// First check a site failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("site unavailable")]
    Unavailable,

    #[error("insufficient CPU: {available} cores < {required}")]
    Cpu { required: u32, available: u32 },

    #[error("insufficient memory: {available} GB < {required}")]
    Memory { required: u32, available: u32 },

    #[error("insufficient storage: {available} GB < {required}")]
    Storage { required: u32, available: u32 },

    #[error("insufficient bandwidth: {available} Mbps < {required}")]
    Bandwidth { required: f64, available: f64 },

    #[error("latency {latency}ms exceeds {max}ms")]
    Latency { latency: f64, max: f64 },

    #[error("throughput {available} Mbps below {required}")]
    Throughput { required: f64, available: f64 },

    #[error("packet loss {loss} exceeds {max}")]
    PacketLoss { loss: f64, max: f64 },

    #[error("jitter {jitter}ms exceeds {max}ms")]
    Jitter { jitter: f64, max: f64 },

    #[error("CPU utilization {0:.1}% over ceiling")]
    CpuUtilization(f64),

    #[error("memory utilization {0:.1}% over ceiling")]
    MemoryUtilization(f64),

    #[error("available bandwidth {available} Mbps below {required}")]
    AvailableBandwidth { required: f64, available: f64 },
}

impl Rejection {
    /// Error class this rejection belongs to.
    pub fn code(&self) -> ErrorCode {
        match self {
            Rejection::Unavailable => ErrorCode::SiteUnavailable,
            Rejection::Latency { .. }
            | Rejection::Throughput { .. }
            | Rejection::PacketLoss { .. }
            | Rejection::Jitter { .. } => ErrorCode::QosViolation,
            _ => ErrorCode::InsufficientResources,
        }
    }
}

/// Run every hard check, stopping at the first failure.
pub fn check(nf: &NetworkFunction, site: &Site) -> Result<(), Rejection> {
    if !site.available {
        return Err(Rejection::Unavailable);
    }

    let req = &nf.requirements;
    let cap = &site.capacity;
    if cap.cpu_cores < req.min_cpu_cores {
        return Err(Rejection::Cpu {
            required: req.min_cpu_cores,
            available: cap.cpu_cores,
        });
    }
    if cap.memory_gb < req.min_memory_gb {
        return Err(Rejection::Memory {
            required: req.min_memory_gb,
            available: cap.memory_gb,
        });
    }
    if cap.storage_gb < req.min_storage_gb {
        return Err(Rejection::Storage {
            required: req.min_storage_gb,
            available: cap.storage_gb,
        });
    }
    if cap.bandwidth_mbps < req.min_bandwidth_mbps {
        return Err(Rejection::Bandwidth {
            required: req.min_bandwidth_mbps,
            available: cap.bandwidth_mbps,
        });
    }

    let qos = &nf.qos_requirements;
    let profile = &site.network_profile;
    let latency = site.effective_latency_ms();
    if latency > qos.max_latency_ms {
        return Err(Rejection::Latency {
            latency,
            max: qos.max_latency_ms,
        });
    }
    if profile.max_throughput_mbps < qos.min_throughput_mbps {
        return Err(Rejection::Throughput {
            required: qos.min_throughput_mbps,
            available: profile.max_throughput_mbps,
        });
    }
    if profile.packet_loss_rate > qos.max_packet_loss_rate {
        return Err(Rejection::PacketLoss {
            loss: profile.packet_loss_rate,
            max: qos.max_packet_loss_rate,
        });
    }
    if profile.jitter_ms > qos.max_jitter_ms {
        return Err(Rejection::Jitter {
            jitter: profile.jitter_ms,
            max: qos.max_jitter_ms,
        });
    }

    if let Some(m) = &site.metrics {
        if m.cpu_utilization > MAX_CPU_UTILIZATION {
            return Err(Rejection::CpuUtilization(m.cpu_utilization));
        }
        if m.memory_utilization > MAX_MEMORY_UTILIZATION {
            return Err(Rejection::MemoryUtilization(m.memory_utilization));
        }
        if m.available_bandwidth_mbps < req.min_bandwidth_mbps {
            return Err(Rejection::AvailableBandwidth {
                required: req.min_bandwidth_mbps,
                available: m.available_bandwidth_mbps,
            });
        }
    }

    Ok(())
}

/// Whether `site` can host `nf` at all.
pub fn meets_requirements(nf: &NetworkFunction, site: &Site) -> bool {
    check(nf, site).is_ok()
}
