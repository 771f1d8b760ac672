use serde::Serialize;

use super::domain::{
    DetailId, EmployeeId, Evaluation, EvaluationDetail, EvaluationId, Period, Score, ScoreRole,
    ScoreSummary,
};
use super::lifecycle::EvaluationStatus;

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Score writes go through [`EvaluationRepository::patch_score`] so that each
/// write touches a single slot of a single row; concurrent writers on other
/// rows or other slots never overwrite each other.
pub trait EvaluationRepository: Send + Sync {
    /// Store a new evaluation with its detail rows.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the id is taken or the
    /// employee already has an evaluation for the same period. The uniqueness
    /// check and the write must be atomic.
    fn insert(
        &self,
        evaluation: Evaluation,
        details: Vec<EvaluationDetail>,
    ) -> Result<(), RepositoryError>;
    /// Replace the header of an open evaluation; a finalized one is left
    /// untouched and reported as [`RepositoryError::Finalized`].
    fn update(&self, evaluation: Evaluation) -> Result<(), RepositoryError>;
    /// Store a finalized header, but only if the detail rows still equal
    /// `details` ([`RepositoryError::Stale`] otherwise) and the stored copy is
    /// not finalized yet. Comparison and write must be atomic.
    fn commit_finalized(
        &self,
        evaluation: Evaluation,
        details: &[EvaluationDetail],
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError>;
    /// Detail rows in creation order.
    fn details(&self, id: &EvaluationId) -> Result<Vec<EvaluationDetail>, RepositoryError>;
    fn fetch_detail(&self, id: &DetailId) -> Result<Option<EvaluationDetail>, RepositoryError>;
    /// Write one slot of one row. Rejected with [`RepositoryError::Finalized`]
    /// when the owning evaluation is finalized, checked atomically with the write.
    fn patch_score(
        &self,
        id: &DetailId,
        role: ScoreRole,
        value: Option<Score>,
    ) -> Result<EvaluationDetail, RepositoryError>;
    fn for_employee(&self, employee: &EmployeeId) -> Result<Vec<Evaluation>, RepositoryError>;
    fn for_period(&self, period: Period) -> Result<Vec<Evaluation>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("evaluation {0} is finalized")]
    Finalized(EvaluationId),
    #[error("detail rows changed since they were read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Evaluation header, detail rows, and derived status as read together.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSheet {
    pub evaluation: Evaluation,
    pub details: Vec<EvaluationDetail>,
    pub status: EvaluationStatus,
}

impl EvaluationSheet {
    pub fn view(&self) -> EvaluationSheetView {
        let evaluation = &self.evaluation;
        EvaluationSheetView {
            evaluation_id: evaluation.evaluation_id.clone(),
            employee_id: evaluation.employee.id.clone(),
            employee_code: evaluation.employee.code.clone(),
            employee_name: evaluation.employee.name.clone(),
            position_name: evaluation.position_name.clone(),
            period: evaluation.period,
            status: self.status,
            finalized: evaluation.is_finalized(),
            aggregates: evaluation.aggregates,
            details: self.details.clone(),
        }
    }
}

/// Flattened read payload for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSheetView {
    pub evaluation_id: EvaluationId,
    pub employee_id: EmployeeId,
    pub employee_code: String,
    pub employee_name: String,
    pub position_name: String,
    pub period: Period,
    pub status: EvaluationStatus,
    pub finalized: bool,
    pub aggregates: ScoreSummary,
    pub details: Vec<EvaluationDetail>,
}
