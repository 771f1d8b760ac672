use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use super::aggregate::{summarize, total_weight};
use super::config::{EvaluationConfig, WeightPolicy};
use super::domain::{
    DetailId, EmployeeId, EmployeeRef, Evaluation, EvaluationDetail, EvaluationId, Period,
    Responsibility, Score, ScoreError, ScoreRole, ScoreSummary,
};
use super::lifecycle::{self, derive_status, EvaluationStatus, LifecycleError};
use super::repository::{EvaluationRepository, EvaluationSheet, RepositoryError};

/// Request to open an evaluation cycle for one employee and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEvaluation {
    pub employee: EmployeeRef,
    pub position_name: String,
    pub period: Period,
    #[serde(default)]
    pub supervisor_1: Option<EmployeeId>,
    #[serde(default)]
    pub supervisor_2: Option<EmployeeId>,
    pub responsibilities: Vec<Responsibility>,
}

/// Partial update of one detail row. Exactly one field must be present; an
/// explicit `null` clears that slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScorePatch {
    #[serde(default, deserialize_with = "present")]
    pub self_score: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub supervisor_score_1: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub supervisor_score_2: Option<Option<i64>>,
}

impl ScorePatch {
    pub fn single(role: ScoreRole, value: Option<i64>) -> Self {
        let mut patch = Self::default();
        match role {
            ScoreRole::SelfReview => patch.self_score = Some(value),
            ScoreRole::Supervisor1 => patch.supervisor_score_1 = Some(value),
            ScoreRole::Supervisor2 => patch.supervisor_score_2 = Some(value),
        }
        patch
    }

    /// The slot targeted by this patch and its new value.
    pub fn into_write(self) -> Result<(ScoreRole, Option<i64>), EvaluationError> {
        let slots = [
            (ScoreRole::SelfReview, self.self_score),
            (ScoreRole::Supervisor1, self.supervisor_score_1),
            (ScoreRole::Supervisor2, self.supervisor_score_2),
        ];
        let mut written = slots
            .into_iter()
            .filter_map(|(role, value)| value.map(|value| (role, value)));

        match (written.next(), written.next()) {
            (Some(write), None) => Ok(write),
            (None, _) => Err(EvaluationError::InvalidInput(
                "one of self_score, supervisor_score_1 or supervisor_score_2 is required"
                    .to_string(),
            )),
            (Some(_), Some(_)) => Err(EvaluationError::InvalidInput(
                "only one score slot may be written per request".to_string(),
            )),
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// Finalized result of an earlier period for the same employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub evaluation_id: EvaluationId,
    pub period: Period,
    pub position_name: String,
    pub self_score_percentage: f64,
    pub supervisor_score_1_percentage: f64,
    pub supervisor_score_2_percentage: f64,
    pub finalized_at: DateTime<Utc>,
}

/// One evaluation the caller supervises, with the slots the caller may edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubordinateEntry {
    pub employee_id: EmployeeId,
    pub employee_code: String,
    pub employee_name: String,
    pub evaluation_id: EvaluationId,
    pub period: Period,
    pub self_score_percentage: f64,
    pub supervisor_score_1_percentage: f64,
    pub supervisor_score_2_percentage: f64,
    pub status: EvaluationStatus,
    pub finalized: bool,
    pub is_supervisor_1: bool,
    pub is_supervisor_2: bool,
}

/// Service composing the repository, aggregator, and lifecycle rules.
pub struct EvaluationService<R> {
    repository: Arc<R>,
    config: EvaluationConfig,
}

static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

fn detail_id(evaluation_id: &EvaluationId, index: usize) -> DetailId {
    DetailId(format!("{}-d{:02}", evaluation_id.0, index + 1))
}

impl<R> EvaluationService<R>
where
    R: EvaluationRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: EvaluationConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Create the evaluation and snapshot one detail row per responsibility.
    pub fn open(&self, request: OpenEvaluation) -> Result<EvaluationSheet, EvaluationError> {
        validate_supervisors(&request)?;
        validate_responsibilities(&request.responsibilities)?;

        let weight_total: u32 = request
            .responsibilities
            .iter()
            .map(|responsibility| u32::from(responsibility.weight))
            .sum();
        if weight_total != 100 {
            match self.config.weight_policy {
                WeightPolicy::Strict => {
                    return Err(EvaluationError::InvalidInput(format!(
                        "responsibility weights total {weight_total}, expected 100"
                    )));
                }
                WeightPolicy::Lenient => warn!(
                    employee = %request.employee.id,
                    period = %request.period,
                    weight_total,
                    "responsibility weights do not total 100"
                ),
            }
        }

        let already_open = self
            .repository
            .for_employee(&request.employee.id)?
            .iter()
            .any(|evaluation| evaluation.period == request.period);
        if already_open {
            return Err(duplicate_period(&request.employee.id, request.period));
        }

        let evaluation_id = next_evaluation_id();
        let details: Vec<EvaluationDetail> = request
            .responsibilities
            .iter()
            .enumerate()
            .map(|(index, responsibility)| {
                EvaluationDetail::from_responsibility(
                    detail_id(&evaluation_id, index),
                    evaluation_id.clone(),
                    responsibility,
                )
            })
            .collect();

        let evaluation = Evaluation {
            evaluation_id,
            employee: request.employee,
            position_name: request.position_name,
            period: request.period,
            supervisor_1: request.supervisor_1,
            supervisor_2: request.supervisor_2,
            aggregates: ScoreSummary::default(),
            finalized: None,
        };

        // a concurrent open for the same period can pass the check above
        self.repository
            .insert(evaluation.clone(), details.clone())
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    duplicate_period(&evaluation.employee.id, evaluation.period)
                }
                other => other.into(),
            })?;
        info!(
            evaluation_id = %evaluation.evaluation_id,
            employee = %evaluation.employee.id,
            period = %evaluation.period,
            details = details.len(),
            "evaluation opened"
        );

        let status = derive_status(&details);
        Ok(EvaluationSheet {
            evaluation,
            details,
            status,
        })
    }

    /// Evaluation header with its detail rows and freshly derived status.
    pub fn sheet(&self, evaluation_id: &EvaluationId) -> Result<EvaluationSheet, EvaluationError> {
        let evaluation = self.load(evaluation_id)?;
        let details = self.repository.details(evaluation_id)?;
        let status = derive_status(&details);
        Ok(EvaluationSheet {
            evaluation,
            details,
            status,
        })
    }

    pub fn details(
        &self,
        evaluation_id: &EvaluationId,
    ) -> Result<Vec<EvaluationDetail>, EvaluationError> {
        self.load(evaluation_id)?;
        Ok(self.repository.details(evaluation_id)?)
    }

    pub fn status(&self, evaluation_id: &EvaluationId) -> Result<EvaluationStatus, EvaluationError> {
        Ok(derive_status(&self.details(evaluation_id)?))
    }

    /// Write one score slot. Aggregates are not recomputed here.
    pub fn set_score(
        &self,
        actor: &EmployeeId,
        detail_id: &DetailId,
        role: ScoreRole,
        value: i64,
    ) -> Result<EvaluationDetail, EvaluationError> {
        let score = Score::new(value)?;
        self.write_slot(actor, detail_id, role, Some(score))
    }

    pub fn clear_score(
        &self,
        actor: &EmployeeId,
        detail_id: &DetailId,
        role: ScoreRole,
    ) -> Result<EvaluationDetail, EvaluationError> {
        self.write_slot(actor, detail_id, role, None)
    }

    pub fn apply_patch(
        &self,
        actor: &EmployeeId,
        detail_id: &DetailId,
        patch: ScorePatch,
    ) -> Result<EvaluationDetail, EvaluationError> {
        match patch.into_write()? {
            (role, Some(value)) => self.set_score(actor, detail_id, role, value),
            (role, None) => self.clear_score(actor, detail_id, role),
        }
    }

    /// Explicit aggregation step: recompute and store the three percentages.
    pub fn aggregate(&self, evaluation_id: &EvaluationId) -> Result<Evaluation, EvaluationError> {
        let mut evaluation = self.load(evaluation_id)?;
        lifecycle::ensure_open(&evaluation)?;

        let details = self.repository.details(evaluation_id)?;
        evaluation.aggregates = summarize(&details);
        self.repository.update(evaluation.clone())?;

        info!(
            evaluation_id = %evaluation.evaluation_id,
            self_pct = evaluation.aggregates.self_score_percentage,
            supervisor_1_pct = evaluation.aggregates.supervisor_score_1_percentage,
            supervisor_2_pct = evaluation.aggregates.supervisor_score_2_percentage,
            weight_total = total_weight(&details),
            "evaluation aggregated"
        );
        Ok(evaluation)
    }

    pub fn finalize(&self, evaluation_id: &EvaluationId) -> Result<Evaluation, EvaluationError> {
        let mut evaluation = self.load(evaluation_id)?;
        let details = self.repository.details(evaluation_id)?;

        let finalized = lifecycle::finalize(&mut evaluation, &details, Utc::now())?;
        self.repository
            .commit_finalized(evaluation.clone(), &details)?;

        info!(
            evaluation_id = %evaluation.evaluation_id,
            finalized_at = %finalized.finalized_at,
            "evaluation finalized"
        );
        Ok(evaluation)
    }

    /// Finalized evaluations of the same employee for earlier periods, oldest first.
    pub fn history(
        &self,
        evaluation_id: &EvaluationId,
    ) -> Result<Vec<HistoryEntry>, EvaluationError> {
        let evaluation = self.load(evaluation_id)?;

        let mut entries: Vec<HistoryEntry> = self
            .repository
            .for_employee(&evaluation.employee.id)?
            .into_iter()
            .filter(|past| past.period < evaluation.period)
            .filter_map(|past| {
                let finalized = past.finalized?;
                Some(HistoryEntry {
                    evaluation_id: past.evaluation_id,
                    period: past.period,
                    position_name: past.position_name,
                    self_score_percentage: finalized.scores.self_score_percentage,
                    supervisor_score_1_percentage: finalized.scores.supervisor_score_1_percentage,
                    supervisor_score_2_percentage: finalized.scores.supervisor_score_2_percentage,
                    finalized_at: finalized.finalized_at,
                })
            })
            .collect();
        entries.sort_by_key(|entry| entry.period);
        Ok(entries)
    }

    /// Evaluations for `period` in which `actor` is a designated supervisor.
    pub fn subordinates(
        &self,
        actor: &EmployeeId,
        period: Period,
    ) -> Result<Vec<SubordinateEntry>, EvaluationError> {
        let mut entries = Vec::new();

        for evaluation in self.repository.for_period(period)? {
            let is_supervisor_1 = evaluation.supervisor_1.as_ref() == Some(actor);
            let is_supervisor_2 = evaluation.supervisor_2.as_ref() == Some(actor);
            if !is_supervisor_1 && !is_supervisor_2 {
                continue;
            }

            let details = self.repository.details(&evaluation.evaluation_id)?;
            let finalized = evaluation.is_finalized();
            entries.push(SubordinateEntry {
                employee_id: evaluation.employee.id,
                employee_code: evaluation.employee.code,
                employee_name: evaluation.employee.name,
                evaluation_id: evaluation.evaluation_id,
                period: evaluation.period,
                self_score_percentage: evaluation.aggregates.self_score_percentage,
                supervisor_score_1_percentage: evaluation.aggregates.supervisor_score_1_percentage,
                supervisor_score_2_percentage: evaluation.aggregates.supervisor_score_2_percentage,
                status: derive_status(&details),
                finalized,
                is_supervisor_1,
                is_supervisor_2,
            });
        }

        entries.sort_by(|left, right| left.employee_code.cmp(&right.employee_code));
        debug!(actor = %actor, %period, count = entries.len(), "subordinate evaluations listed");
        Ok(entries)
    }

    fn load(&self, evaluation_id: &EvaluationId) -> Result<Evaluation, EvaluationError> {
        self.repository
            .fetch(evaluation_id)?
            .ok_or_else(|| EvaluationError::NotFound(format!("evaluation {evaluation_id}")))
    }

    fn write_slot(
        &self,
        actor: &EmployeeId,
        detail_id: &DetailId,
        role: ScoreRole,
        value: Option<Score>,
    ) -> Result<EvaluationDetail, EvaluationError> {
        let detail = self
            .repository
            .fetch_detail(detail_id)?
            .ok_or_else(|| EvaluationError::NotFound(format!("evaluation detail {detail_id}")))?;
        let evaluation = self.load(&detail.evaluation_id)?;

        lifecycle::ensure_open(&evaluation)?;
        lifecycle::authorize(&evaluation, actor, role)?;

        let updated = self.repository.patch_score(detail_id, role, value)?;
        debug!(
            evaluation_id = %evaluation.evaluation_id,
            %detail_id,
            %role,
            score = value.map(Score::value),
            "score slot written"
        );
        Ok(updated)
    }
}

fn duplicate_period(employee: &EmployeeId, period: Period) -> EvaluationError {
    EvaluationError::InvalidState(format!(
        "employee {employee} already has an evaluation for {period}"
    ))
}

/// Every score slot needs a designated writer.
fn validate_supervisors(request: &OpenEvaluation) -> Result<(), EvaluationError> {
    let missing: Vec<&str> = [
        (ScoreRole::Supervisor1, &request.supervisor_1),
        (ScoreRole::Supervisor2, &request.supervisor_2),
    ]
    .into_iter()
    .filter(|(_, supervisor)| supervisor.is_none())
    .map(|(role, _)| role.label())
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EvaluationError::InvalidInput(format!(
            "no employee designated for {}",
            missing.join(", ")
        )))
    }
}

fn validate_responsibilities(responsibilities: &[Responsibility]) -> Result<(), EvaluationError> {
    if responsibilities.is_empty() {
        return Err(EvaluationError::InvalidInput(
            "at least one responsibility is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for responsibility in responsibilities {
        if responsibility.title.trim().is_empty() {
            return Err(EvaluationError::InvalidInput(format!(
                "responsibility {} is missing a title",
                responsibility.id
            )));
        }
        if responsibility.weight > 100 {
            return Err(EvaluationError::InvalidInput(format!(
                "responsibility {} weight {} is outside the 0-100 range",
                responsibility.id, responsibility.weight
            )));
        }
        if !seen.insert(&responsibility.id) {
            return Err(EvaluationError::InvalidInput(format!(
                "responsibility {} is listed more than once",
                responsibility.id
            )));
        }
    }

    Ok(())
}

/// Error raised by the evaluation service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EvaluationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound("record".to_string()),
            RepositoryError::Conflict
            | RepositoryError::Finalized(_)
            | RepositoryError::Stale => Self::InvalidState(value.to_string()),
            other => Self::Repository(other),
        }
    }
}

impl From<LifecycleError> for EvaluationError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Forbidden { .. } => Self::Forbidden(value.to_string()),
            LifecycleError::NotCompleted { .. } | LifecycleError::AlreadyFinalized(_) => {
                Self::InvalidState(value.to_string())
            }
        }
    }
}

impl From<ScoreError> for EvaluationError {
    fn from(value: ScoreError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}
