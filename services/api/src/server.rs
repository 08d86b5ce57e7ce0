use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryIssueRepository, TracingStatusNotifier};
use crate::routes::with_issue_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use civic_triage::config::AppConfig;
use civic_triage::error::AppError;
use civic_triage::telemetry;
use civic_triage::workflows::triage::{CivicIssueAnalyzer, GeminiClient, IssueTriageService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    // A missing GEMINI_API_KEY aborts startup.
    let model = Arc::new(GeminiClient::from_config(&config.triage)?);
    let analyzer = Arc::new(CivicIssueAnalyzer::from_config(model, &config.triage));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryIssueRepository::default());
    let notifier = Arc::new(TracingStatusNotifier);
    let triage_service = Arc::new(IssueTriageService::new(analyzer, repository, notifier));

    let app = with_issue_routes(triage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model = %config.triage.model,
        timeout_secs = config.triage.timeout.as_secs(),
        "civic issue triage service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
