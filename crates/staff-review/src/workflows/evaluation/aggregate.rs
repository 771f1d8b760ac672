use serde::Serialize;

use super::domain::{EvaluationDetail, ScoreRole, ScoreSummary};

/// Weighted percentage for one role over the details that carry that role's score.
///
/// Details without a score for `role` are left out of both the numerator and the
/// denominator, so a partially scored sheet is averaged over what has been scored
/// rather than penalized with zeros. Returns `0.0` when nothing is scored.
pub fn aggregate(details: &[EvaluationDetail], role: ScoreRole) -> f64 {
    let totals = ScoredTotals::collect(details, role);
    totals.percentage()
}

/// Aggregate all three roles at once.
pub fn summarize(details: &[EvaluationDetail]) -> ScoreSummary {
    ScoreSummary {
        self_score_percentage: aggregate(details, ScoreRole::SelfReview),
        supervisor_score_1_percentage: aggregate(details, ScoreRole::Supervisor1),
        supervisor_score_2_percentage: aggregate(details, ScoreRole::Supervisor2),
    }
}

/// Sum of snapshotted weights across all details, scored or not.
pub fn total_weight(details: &[EvaluationDetail]) -> u32 {
    details.iter().map(|detail| u32::from(detail.weight)).sum()
}

/// Aggregate plus the coverage needed to tell partial data apart from a zero score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleAggregate {
    pub role: ScoreRole,
    pub role_label: &'static str,
    pub percentage: f64,
    pub scored_details: usize,
    pub total_details: usize,
    pub scored_weight: u64,
    pub total_weight: u32,
}

impl RoleAggregate {
    pub fn is_partial(&self) -> bool {
        self.scored_details < self.total_details
    }

    pub fn has_scores(&self) -> bool {
        self.scored_details > 0
    }
}

pub fn breakdown(details: &[EvaluationDetail], role: ScoreRole) -> RoleAggregate {
    let totals = ScoredTotals::collect(details, role);
    RoleAggregate {
        role,
        role_label: role.label(),
        percentage: totals.percentage(),
        scored_details: totals.count,
        total_details: details.len(),
        scored_weight: totals.weight,
        total_weight: total_weight(details),
    }
}

// Integer accumulation keeps the sums exact, so input order cannot change the result.
#[derive(Default)]
struct ScoredTotals {
    weighted: u64,
    weight: u64,
    count: usize,
}

impl ScoredTotals {
    fn collect(details: &[EvaluationDetail], role: ScoreRole) -> Self {
        details
            .iter()
            .filter_map(|detail| {
                detail
                    .score(role)
                    .map(|score| (u64::from(detail.weight), u64::from(score.value())))
            })
            .fold(Self::default(), |mut totals, (weight, score)| {
                totals.weighted += weight * score;
                totals.weight += weight;
                totals.count += 1;
                totals
            })
    }

    fn percentage(&self) -> f64 {
        if self.weight == 0 {
            return 0.0;
        }
        (self.weighted as f64 / self.weight as f64).clamp(0.0, 100.0)
    }
}
