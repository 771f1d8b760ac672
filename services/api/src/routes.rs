use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use staff_review::error::AppError;
use staff_review::workflows::evaluation::{
    evaluation_router, EvaluationDetail, EvaluationId, EvaluationRepository, EvaluationService,
    ScoreReport,
};
use staff_review::workflows::sheet::SheetImporter;
use std::io::Cursor;
use std::sync::Arc;

const PREVIEW_EVALUATION_ID: &str = "preview";

#[derive(Debug, Deserialize)]
pub(crate) struct SheetPreviewRequest {
    pub(crate) csv: String,
    #[serde(default)]
    pub(crate) include_details: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SheetPreviewResponse {
    #[serde(flatten)]
    pub(crate) report: ScoreReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) details: Option<Vec<EvaluationDetail>>,
}

pub(crate) fn with_evaluation_routes<R>(service: Arc<EvaluationService<R>>) -> axum::Router
where
    R: EvaluationRepository + 'static,
{
    evaluation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/evaluations/preview",
            axum::routing::post(sheet_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Scores an uploaded sheet without persisting anything.
pub(crate) async fn sheet_preview_endpoint(
    Json(payload): Json<SheetPreviewRequest>,
) -> Result<Json<SheetPreviewResponse>, AppError> {
    let SheetPreviewRequest {
        csv,
        include_details,
    } = payload;

    let reader = Cursor::new(csv.into_bytes());
    let details = SheetImporter::from_reader(
        reader,
        &EvaluationId(PREVIEW_EVALUATION_ID.to_string()),
    )?;
    let report = ScoreReport::build(&details);

    Ok(Json(SheetPreviewResponse {
        report,
        details: include_details.then_some(details),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use staff_review::workflows::evaluation::{
        EvaluationConfig, EvaluationStatus, InMemoryEvaluationRepository, ScoreRole,
    };
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    const SHEET: &str = "Responsibility ID,Title,Description,Weight,Self Score,Supervisor Score 1,Supervisor Score 2\n\
R-1,Close payroll,Monthly payroll close,60,80,70,90\n\
R-2,Audit expenses,,40,50,60,\n";

    fn app() -> axum::Router {
        let service = Arc::new(EvaluationService::new(
            Arc::new(InMemoryEvaluationRepository::default()),
            EvaluationConfig::default(),
        ));
        with_evaluation_routes(service)
    }

    #[tokio::test]
    async fn sheet_preview_endpoint_scores_sheet() {
        let request = SheetPreviewRequest {
            csv: SHEET.to_string(),
            include_details: false,
        };

        let Json(body) = sheet_preview_endpoint(Json(request))
            .await
            .expect("preview builds");

        assert_eq!(body.report.status, EvaluationStatus::Supervisor2Pending);
        assert_eq!(body.report.total_weight, 100);
        let own = body
            .report
            .role(ScoreRole::SelfReview)
            .expect("self aggregate");
        assert_eq!(own.percentage, 68.0);
        let second = body
            .report
            .role(ScoreRole::Supervisor2)
            .expect("supervisor 2 aggregate");
        assert_eq!(second.percentage, 90.0);
        assert!(second.is_partial());
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn sheet_preview_endpoint_can_include_details() {
        let request = SheetPreviewRequest {
            csv: SHEET.to_string(),
            include_details: true,
        };

        let Json(body) = sheet_preview_endpoint(Json(request))
            .await
            .expect("preview builds");

        let details = body.details.expect("details returned");
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].detail_id.0, "preview-d01");
        assert_eq!(details[1].supervisor_score_2, None);
    }

    #[tokio::test]
    async fn invalid_sheet_is_a_bad_request() {
        let body = json!({
            "csv": "Responsibility ID,Title,Description,Weight,Self Score,Supervisor Score 1,Supervisor Score 2\nR-1,Close payroll,,60,150,,\n",
        });
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/evaluations/preview")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(payload["error"]
            .as_str()
            .expect("error message")
            .contains("line 2"));
    }

    #[tokio::test]
    async fn health_and_readiness_report_state() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle(),
            ),
        };
        let response = app()
            .layer(Extension(state))
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
