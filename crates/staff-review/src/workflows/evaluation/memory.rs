use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    DetailId, EmployeeId, Evaluation, EvaluationDetail, EvaluationId, Period, Score, ScoreRole,
};
use super::repository::{EvaluationRepository, RepositoryError};

/// Process-local repository used by the CLI demo, the default server wiring, and tests.
#[derive(Default, Clone)]
pub struct InMemoryEvaluationRepository {
    store: Arc<Mutex<Store>>,
}

#[derive(Default)]
struct Store {
    evaluations: BTreeMap<EvaluationId, Evaluation>,
    details: HashMap<DetailId, EvaluationDetail>,
    detail_order: HashMap<EvaluationId, Vec<DetailId>>,
}

impl InMemoryEvaluationRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("evaluation store lock poisoned".to_string()))
    }
}

impl Store {
    fn ordered_details(&self, id: &EvaluationId) -> Result<Vec<EvaluationDetail>, RepositoryError> {
        let order = self.detail_order.get(id).ok_or(RepositoryError::NotFound)?;
        Ok(order
            .iter()
            .filter_map(|detail_id| self.details.get(detail_id).cloned())
            .collect())
    }

    fn is_finalized(&self, id: &EvaluationId) -> bool {
        self.evaluations
            .get(id)
            .is_some_and(Evaluation::is_finalized)
    }
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(
        &self,
        evaluation: Evaluation,
        details: Vec<EvaluationDetail>,
    ) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        let period_taken = store.evaluations.values().any(|existing| {
            existing.employee.id == evaluation.employee.id && existing.period == evaluation.period
        });
        if period_taken
            || store.evaluations.contains_key(&evaluation.evaluation_id)
            || details
                .iter()
                .any(|detail| store.details.contains_key(&detail.detail_id))
        {
            return Err(RepositoryError::Conflict);
        }

        let order = details
            .iter()
            .map(|detail| detail.detail_id.clone())
            .collect();
        store
            .detail_order
            .insert(evaluation.evaluation_id.clone(), order);
        for detail in details {
            store.details.insert(detail.detail_id.clone(), detail);
        }
        store
            .evaluations
            .insert(evaluation.evaluation_id.clone(), evaluation);
        Ok(())
    }

    fn update(&self, evaluation: Evaluation) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        match store.evaluations.get_mut(&evaluation.evaluation_id) {
            Some(existing) if existing.is_finalized() => {
                Err(RepositoryError::Finalized(evaluation.evaluation_id))
            }
            Some(existing) => {
                *existing = evaluation;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn commit_finalized(
        &self,
        evaluation: Evaluation,
        details: &[EvaluationDetail],
    ) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;
        if !store.evaluations.contains_key(&evaluation.evaluation_id) {
            return Err(RepositoryError::NotFound);
        }
        if store.is_finalized(&evaluation.evaluation_id) {
            return Err(RepositoryError::Finalized(evaluation.evaluation_id));
        }
        if store.ordered_details(&evaluation.evaluation_id)? != details {
            return Err(RepositoryError::Stale);
        }
        store
            .evaluations
            .insert(evaluation.evaluation_id.clone(), evaluation);
        Ok(())
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        let store = self.lock()?;
        Ok(store.evaluations.get(id).cloned())
    }

    fn details(&self, id: &EvaluationId) -> Result<Vec<EvaluationDetail>, RepositoryError> {
        self.lock()?.ordered_details(id)
    }

    fn fetch_detail(&self, id: &DetailId) -> Result<Option<EvaluationDetail>, RepositoryError> {
        let store = self.lock()?;
        Ok(store.details.get(id).cloned())
    }

    fn patch_score(
        &self,
        id: &DetailId,
        role: ScoreRole,
        value: Option<Score>,
    ) -> Result<EvaluationDetail, RepositoryError> {
        let mut store = self.lock()?;
        let evaluation_id = store
            .details
            .get(id)
            .map(|detail| detail.evaluation_id.clone())
            .ok_or(RepositoryError::NotFound)?;
        if store.is_finalized(&evaluation_id) {
            return Err(RepositoryError::Finalized(evaluation_id));
        }
        let detail = store.details.get_mut(id).ok_or(RepositoryError::NotFound)?;
        detail.set_score(role, value);
        Ok(detail.clone())
    }

    fn for_employee(&self, employee: &EmployeeId) -> Result<Vec<Evaluation>, RepositoryError> {
        let store = self.lock()?;
        Ok(store
            .evaluations
            .values()
            .filter(|evaluation| &evaluation.employee.id == employee)
            .cloned()
            .collect())
    }

    fn for_period(&self, period: Period) -> Result<Vec<Evaluation>, RepositoryError> {
        let store = self.lock()?;
        Ok(store
            .evaluations
            .values()
            .filter(|evaluation| evaluation.period == period)
            .cloned()
            .collect())
    }
}
