use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::summarize;
use super::domain::{
    EmployeeId, Evaluation, EvaluationDetail, EvaluationId, FinalizedScores, ScoreRole,
};

/// Stage an evaluation has reached, always derived from the current detail rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    NotStarted,
    SelfPending,
    Supervisor1Pending,
    Supervisor2Pending,
    Completed,
}

impl EvaluationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EvaluationStatus::NotStarted => "not_started",
            EvaluationStatus::SelfPending => "self_pending",
            EvaluationStatus::Supervisor1Pending => "supervisor1_pending",
            EvaluationStatus::Supervisor2Pending => "supervisor2_pending",
            EvaluationStatus::Completed => "completed",
        }
    }
}

/// Furthest-incomplete stage across all detail rows.
///
/// An empty sheet counts as not started.
pub fn derive_status(details: &[EvaluationDetail]) -> EvaluationStatus {
    if !details.iter().any(EvaluationDetail::has_any_score) {
        return EvaluationStatus::NotStarted;
    }

    let all_scored = |role: ScoreRole| details.iter().all(|detail| detail.score(role).is_some());

    if !all_scored(ScoreRole::SelfReview) {
        EvaluationStatus::SelfPending
    } else if !all_scored(ScoreRole::Supervisor1) {
        EvaluationStatus::Supervisor1Pending
    } else if !all_scored(ScoreRole::Supervisor2) {
        EvaluationStatus::Supervisor2Pending
    } else {
        EvaluationStatus::Completed
    }
}

/// Reject writes from anyone other than the actor designated for `role`.
pub fn authorize(
    evaluation: &Evaluation,
    actor: &EmployeeId,
    role: ScoreRole,
) -> Result<(), LifecycleError> {
    match evaluation.designated_writer(role) {
        Some(writer) if writer == actor => Ok(()),
        _ => Err(LifecycleError::Forbidden {
            actor: actor.clone(),
            role,
            evaluation_id: evaluation.evaluation_id.clone(),
        }),
    }
}

/// Finalized evaluations are frozen for reporting.
pub fn ensure_open(evaluation: &Evaluation) -> Result<(), LifecycleError> {
    if evaluation.is_finalized() {
        return Err(LifecycleError::AlreadyFinalized(
            evaluation.evaluation_id.clone(),
        ));
    }
    Ok(())
}

/// Fix the aggregate percentages of a completed evaluation.
pub fn finalize(
    evaluation: &mut Evaluation,
    details: &[EvaluationDetail],
    finalized_at: DateTime<Utc>,
) -> Result<FinalizedScores, LifecycleError> {
    ensure_open(evaluation)?;

    let status = derive_status(details);
    if status != EvaluationStatus::Completed {
        return Err(LifecycleError::NotCompleted {
            evaluation_id: evaluation.evaluation_id.clone(),
            status,
        });
    }

    let scores = summarize(details);
    let finalized = FinalizedScores {
        scores,
        finalized_at,
    };
    evaluation.aggregates = scores;
    evaluation.finalized = Some(finalized);
    Ok(finalized)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("employee {actor} may not write the {role} score of evaluation {evaluation_id}")]
    Forbidden {
        actor: EmployeeId,
        role: ScoreRole,
        evaluation_id: EvaluationId,
    },
    #[error("evaluation {evaluation_id} is {} and cannot be finalized", .status.label())]
    NotCompleted {
        evaluation_id: EvaluationId,
        status: EvaluationStatus,
    },
    #[error("evaluation {0} is already finalized")]
    AlreadyFinalized(EvaluationId),
}
