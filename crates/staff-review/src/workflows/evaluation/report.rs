use serde::Serialize;

use super::aggregate::{breakdown, total_weight, RoleAggregate};
use super::domain::{EvaluationDetail, ScoreRole};
use super::lifecycle::{derive_status, EvaluationStatus};

/// Read-only scoring snapshot of a set of detail rows.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub status: EvaluationStatus,
    pub status_label: &'static str,
    pub detail_count: usize,
    pub total_weight: u32,
    pub roles: Vec<RoleAggregate>,
}

impl ScoreReport {
    pub fn build(details: &[EvaluationDetail]) -> Self {
        let status = derive_status(details);
        Self {
            status,
            status_label: status.label(),
            detail_count: details.len(),
            total_weight: total_weight(details),
            roles: ScoreRole::ALL
                .iter()
                .map(|role| breakdown(details, *role))
                .collect(),
        }
    }

    pub fn role(&self, role: ScoreRole) -> Option<&RoleAggregate> {
        self.roles.iter().find(|entry| entry.role == role)
    }
}
