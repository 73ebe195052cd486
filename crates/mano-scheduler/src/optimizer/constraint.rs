//! Pluggable placement constraints checked against finished solutions.

use std::fmt;
use std::sync::Arc;

use mano_placement::{NetworkFunction, Site};
use serde::{Deserialize, Serialize};

use super::solution::{ConstraintViolation, PlacementSolution, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintType {
    Latency,
    Bandwidth,
    Location,
    Resources,
    Affinity,
    AntiAffinity,
    ResourceCapacity,
    QosRequirements,
    SiteAvailability,
}

/// Whether placing `nf` on `site` within `solution` satisfies a constraint.
pub trait ConstraintValidator: Send + Sync {
    fn validate(&self, solution: &PlacementSolution, nf: &NetworkFunction, site: &Site) -> bool;
}

impl<F> ConstraintValidator for F
where
    F: Fn(&PlacementSolution, &NetworkFunction, &Site) -> bool + Send + Sync,
{
    fn validate(&self, solution: &PlacementSolution, nf: &NetworkFunction, site: &Site) -> bool {
        self(solution, nf, site)
    }
}

/// A validator with a name, severity class and penalty.
#[derive(Clone)]
pub struct Constraint {
    pub name: String,
    pub constraint_type: ConstraintType,
    pub validator: Arc<dyn ConstraintValidator>,
    /// Failures are errors rather than warnings.
    pub mandatory: bool,
    pub penalty: f64,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        constraint_type: ConstraintType,
        mandatory: bool,
        penalty: f64,
        validator: impl ConstraintValidator + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            constraint_type,
            validator: Arc::new(validator),
            mandatory,
            penalty,
        }
    }

    /// `None` when satisfied, otherwise the violation to record.
    pub fn check(&self, solution: &PlacementSolution, nf: &NetworkFunction, site: &Site) -> Option<ConstraintViolation> {
        if self.validator.validate(solution, nf, site) {
            return None;
        }
        Some(ConstraintViolation {
            constraint: self.name.clone(),
            severity: if self.mandatory {
                Severity::Error
            } else {
                Severity::Warning
            },
            description: format!(
                "Constraint '{}' violated for NF '{}' on site '{}'",
                self.name, nf.id, site.id
            ),
            penalty: self.penalty,
        })
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("constraint_type", &self.constraint_type)
            .field("mandatory", &self.mandatory)
            .field("penalty", &self.penalty)
            .finish_non_exhaustive()
    }
}

/// Static capacity covers every minimum requirement.
pub struct ResourceCapacityConstraint;

impl ConstraintValidator for ResourceCapacityConstraint {
    fn validate(&self, _: &PlacementSolution, nf: &NetworkFunction, site: &Site) -> bool {
        let (cap, req) = (&site.capacity, &nf.requirements);
        cap.cpu_cores >= req.min_cpu_cores
            && cap.memory_gb >= req.min_memory_gb
            && cap.storage_gb >= req.min_storage_gb
            && cap.bandwidth_mbps >= req.min_bandwidth_mbps
    }
}

/// Static network profile meets every QoS bound.
pub struct QosConstraint;

impl ConstraintValidator for QosConstraint {
    fn validate(&self, _: &PlacementSolution, nf: &NetworkFunction, site: &Site) -> bool {
        let (profile, qos) = (&site.network_profile, &nf.qos_requirements);
        profile.base_latency_ms <= qos.max_latency_ms
            && profile.max_throughput_mbps >= qos.min_throughput_mbps
            && profile.packet_loss_rate <= qos.max_packet_loss_rate
            && profile.jitter_ms <= qos.max_jitter_ms
    }
}

pub struct AvailabilityConstraint;

impl ConstraintValidator for AvailabilityConstraint {
    fn validate(&self, _: &PlacementSolution, _: &NetworkFunction, site: &Site) -> bool {
        site.available
    }
}

/// The three built-in mandatory constraints.
pub fn default_constraints() -> Vec<Constraint> {
    vec![
        Constraint::new(
            "Resource Capacity",
            ConstraintType::ResourceCapacity,
            true,
            1000.0,
            ResourceCapacityConstraint,
        ),
        Constraint::new(
            "QoS Requirements",
            ConstraintType::QosRequirements,
            true,
            500.0,
            QosConstraint,
        ),
        Constraint::new(
            "Site Availability",
            ConstraintType::SiteAvailability,
            true,
            1000.0,
            AvailabilityConstraint,
        ),
    ]
}
