use metrics_exporter_prometheus::PrometheusHandle;
use staff_review::workflows::evaluation::Period;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_period(raw: &str) -> Result<Period, String> {
    raw.parse::<Period>()
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM ({err})"))
}
