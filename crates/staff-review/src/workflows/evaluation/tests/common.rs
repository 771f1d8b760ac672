use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::evaluation::domain::{
    DetailId, EmployeeId, EmployeeRef, Evaluation, EvaluationDetail, EvaluationId, Period,
    Responsibility, ResponsibilityId, Score, ScoreRole,
};
use crate::workflows::evaluation::repository::{
    EvaluationRepository, EvaluationSheet, RepositoryError,
};
use crate::workflows::evaluation::{
    evaluation_router, EvaluationConfig, EvaluationService, InMemoryEvaluationRepository,
    OpenEvaluation,
};

pub(super) const EMPLOYEE: &str = "emp-100";
pub(super) const SUPERVISOR_1: &str = "emp-200";
pub(super) const SUPERVISOR_2: &str = "emp-300";

pub(super) fn id(raw: &str) -> EmployeeId {
    EmployeeId(raw.to_string())
}

pub(super) fn period(year: i32, month: u32) -> Period {
    Period::new(year, month).expect("valid period")
}

/// Detail row for pure aggregation/status tests.
pub(super) fn detail(
    weight: u8,
    self_score: Option<i64>,
    supervisor_score_1: Option<i64>,
    supervisor_score_2: Option<i64>,
) -> EvaluationDetail {
    let score = |value: Option<i64>| value.map(|raw| Score::new(raw).expect("score in range"));
    EvaluationDetail {
        detail_id: DetailId(format!("d-{weight}")),
        evaluation_id: EvaluationId("eval-test".to_string()),
        responsibility_id: ResponsibilityId(format!("r-{weight}")),
        title: "Responsibility".to_string(),
        description: String::new(),
        weight,
        self_score: score(self_score),
        supervisor_score_1: score(supervisor_score_1),
        supervisor_score_2: score(supervisor_score_2),
    }
}

pub(super) fn responsibilities() -> Vec<Responsibility> {
    vec![
        Responsibility {
            id: ResponsibilityId("resp-payroll".to_string()),
            title: "Payroll close".to_string(),
            description: "Close monthly payroll without corrections".to_string(),
            weight: 60,
        },
        Responsibility {
            id: ResponsibilityId("resp-onboarding".to_string()),
            title: "Onboarding".to_string(),
            description: "Prepare onboarding packets for new hires".to_string(),
            weight: 40,
        },
    ]
}

pub(super) fn open_request(employee: &str, period: Period) -> OpenEvaluation {
    OpenEvaluation {
        employee: EmployeeRef {
            id: id(employee),
            code: format!("NV-{}", employee.trim_start_matches("emp-")),
            name: "Tran Thi Mai".to_string(),
        },
        position_name: "HR Specialist".to_string(),
        period,
        supervisor_1: Some(id(SUPERVISOR_1)),
        supervisor_2: Some(id(SUPERVISOR_2)),
        responsibilities: responsibilities(),
    }
}

pub(super) fn build_service() -> (
    EvaluationService<InMemoryEvaluationRepository>,
    Arc<InMemoryEvaluationRepository>,
) {
    let repository = Arc::new(InMemoryEvaluationRepository::default());
    let service = EvaluationService::new(repository.clone(), EvaluationConfig::default());
    (service, repository)
}

pub(super) fn open_default(
    service: &EvaluationService<InMemoryEvaluationRepository>,
) -> EvaluationSheet {
    service
        .open(open_request(EMPLOYEE, period(2025, 6)))
        .expect("evaluation opens")
}

/// Write `scores` into `role` for each detail, in order, as the designated writer.
pub(super) fn score_role<R>(
    service: &EvaluationService<R>,
    sheet: &EvaluationSheet,
    role: ScoreRole,
    scores: &[i64],
) where
    R: EvaluationRepository + 'static,
{
    let writer = sheet
        .evaluation
        .designated_writer(role)
        .cloned()
        .expect("writer designated");
    for (detail, value) in sheet.details.iter().zip(scores) {
        service
            .set_score(&writer, &detail.detail_id, role, *value)
            .expect("score write succeeds");
    }
}

pub(super) fn complete_sheet<R>(service: &EvaluationService<R>, sheet: &EvaluationSheet)
where
    R: EvaluationRepository + 'static,
{
    score_role(service, sheet, ScoreRole::SelfReview, &[80, 50]);
    score_role(service, sheet, ScoreRole::Supervisor1, &[70, 60]);
    score_role(service, sheet, ScoreRole::Supervisor2, &[90, 75]);
}

pub(super) struct UnavailableRepository;

impl EvaluationRepository for UnavailableRepository {
    fn insert(
        &self,
        _evaluation: Evaluation,
        _details: Vec<EvaluationDetail>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _evaluation: Evaluation) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit_finalized(
        &self,
        _evaluation: Evaluation,
        _details: &[EvaluationDetail],
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn details(&self, _id: &EvaluationId) -> Result<Vec<EvaluationDetail>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_detail(&self, _id: &DetailId) -> Result<Option<EvaluationDetail>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn patch_score(
        &self,
        _id: &DetailId,
        _role: ScoreRole,
        _value: Option<Score>,
    ) -> Result<EvaluationDetail, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_employee(&self, _employee: &EmployeeId) -> Result<Vec<Evaluation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_period(&self, _period: Period) -> Result<Vec<Evaluation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Repository call a [`GatedRepository`] can hold a caller at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Gate {
    AfterEmployeeLookup,
    AfterDetailsRead,
    BeforeScorePatch,
}

/// In-memory repository that parks callers at an armed [`Gate`] until a
/// second party meets them twice on the shared barrier: once on arrival and
/// once on release.
pub(super) struct GatedRepository {
    inner: InMemoryEvaluationRepository,
    barrier: Barrier,
    armed: Mutex<Option<Gate>>,
}

impl GatedRepository {
    pub(super) fn new() -> Self {
        Self {
            inner: InMemoryEvaluationRepository::default(),
            barrier: Barrier::new(2),
            armed: Mutex::new(None),
        }
    }

    pub(super) fn arm(&self, gate: Gate) {
        *self.armed.lock().expect("gate mutex poisoned") = Some(gate);
    }

    pub(super) fn disarm(&self) {
        *self.armed.lock().expect("gate mutex poisoned") = None;
    }

    /// Meet a parked caller from the controlling thread.
    pub(super) fn meet(&self) {
        self.barrier.wait();
    }

    fn hold(&self, gate: Gate) {
        if *self.armed.lock().expect("gate mutex poisoned") == Some(gate) {
            self.barrier.wait();
            self.barrier.wait();
        }
    }
}

impl EvaluationRepository for GatedRepository {
    fn insert(
        &self,
        evaluation: Evaluation,
        details: Vec<EvaluationDetail>,
    ) -> Result<(), RepositoryError> {
        self.inner.insert(evaluation, details)
    }

    fn update(&self, evaluation: Evaluation) -> Result<(), RepositoryError> {
        self.inner.update(evaluation)
    }

    fn commit_finalized(
        &self,
        evaluation: Evaluation,
        details: &[EvaluationDetail],
    ) -> Result<(), RepositoryError> {
        self.inner.commit_finalized(evaluation, details)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn details(&self, id: &EvaluationId) -> Result<Vec<EvaluationDetail>, RepositoryError> {
        let details = self.inner.details(id)?;
        self.hold(Gate::AfterDetailsRead);
        Ok(details)
    }

    fn fetch_detail(&self, id: &DetailId) -> Result<Option<EvaluationDetail>, RepositoryError> {
        self.inner.fetch_detail(id)
    }

    fn patch_score(
        &self,
        id: &DetailId,
        role: ScoreRole,
        value: Option<Score>,
    ) -> Result<EvaluationDetail, RepositoryError> {
        self.hold(Gate::BeforeScorePatch);
        self.inner.patch_score(id, role, value)
    }

    fn for_employee(&self, employee: &EmployeeId) -> Result<Vec<Evaluation>, RepositoryError> {
        let evaluations = self.inner.for_employee(employee)?;
        self.hold(Gate::AfterEmployeeLookup);
        Ok(evaluations)
    }

    fn for_period(&self, period: Period) -> Result<Vec<Evaluation>, RepositoryError> {
        self.inner.for_period(period)
    }
}

pub(super) fn gated_service() -> (EvaluationService<GatedRepository>, Arc<GatedRepository>) {
    let repository = Arc::new(GatedRepository::new());
    let service = EvaluationService::new(repository.clone(), EvaluationConfig::default());
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(
    service: EvaluationService<InMemoryEvaluationRepository>,
) -> axum::Router {
    evaluation_router(Arc::new(service))
}
