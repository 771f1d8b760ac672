//! Weighted performance evaluations: per-responsibility scoring by the employee
//! and up to two supervisors, percentage aggregation, derived status, and
//! finalization for historical reporting.

pub mod aggregate;
mod config;
pub mod domain;
pub mod lifecycle;
mod memory;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate, breakdown, summarize, total_weight, RoleAggregate};
pub use config::{EvaluationConfig, WeightPolicy};
pub use domain::{
    DetailId, EmployeeId, EmployeeRef, Evaluation, EvaluationDetail, EvaluationId,
    FinalizedScores, Period, PeriodError, Responsibility, ResponsibilityId, Score, ScoreError,
    ScoreRole, ScoreSummary,
};
pub use lifecycle::{derive_status, EvaluationStatus, LifecycleError};
pub use memory::InMemoryEvaluationRepository;
pub use report::ScoreReport;
pub use repository::{EvaluationRepository, EvaluationSheet, EvaluationSheetView, RepositoryError};
pub use router::{evaluation_router, Actor, ACTOR_HEADER};
pub use service::{
    EvaluationError, EvaluationService, HistoryEntry, OpenEvaluation, ScorePatch,
    SubordinateEntry,
};
