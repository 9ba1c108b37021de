use crate::types::{StatusResponse, SyncBody, SyncResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use vigil_triage::{TriageEngine, TriageError};

/// Shared state for the gateway server.
#[derive(Clone)]
struct AppState {
    engine: Arc<TriageEngine>,
}

/// The gateway HTTP server.
///
/// Exposes the triage engine to clients via:
/// - `POST /api/v1/vitals/sync` — submit a vitals batch, get the decision
/// - `GET /api/v1/subjects/:id/status` — current episode snapshot
/// - `GET /health` — health check
pub struct GatewayServer {
    engine: Arc<TriageEngine>,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(engine: Arc<TriageEngine>, host: &str, port: u16) -> Self {
        Self {
            engine,
            host: host.to_string(),
            port,
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
        };
        Router::new()
            .route("/health", get(health))
            .route("/api/v1/vitals/sync", post(handle_sync))
            .route("/api/v1/subjects/:subject_id/status", get(handle_status))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Start the server. This spawns a background task and returns the join handle.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.host, self.port);

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!("Gateway failed to bind {}: {}", addr, e);
                    return;
                }
            };
            tracing::info!("Gateway listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Gateway server error: {}", e);
            }
        })
    }
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

type ErrorBody = (StatusCode, Json<serde_json::Value>);

fn error_body(status: StatusCode, message: impl Into<String>) -> ErrorBody {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

fn map_triage_error(err: TriageError) -> ErrorBody {
    match err {
        TriageError::ProfileMissing { subject_id } => error_body(
            StatusCode::NOT_FOUND,
            format!("no profile for subject {}", subject_id),
        ),
        TriageError::Persistence(e) => {
            tracing::error!("store unavailable: {:#}", e);
            error_body(StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}

/// POST /api/v1/vitals/sync — run one sync through the engine.
///
/// Ingress-level validation: an empty subject id, a batch below the
/// configured minimum length, or non-finite numbers in the payload are
/// rejected here, before the core is reached. Out-of-range but finite
/// samples pass through; the signal processor rejects them and the engine
/// degrades to the client cross-check value.
async fn handle_sync(
    State(state): State<AppState>,
    Json(body): Json<SyncBody>,
) -> Result<Json<SyncResponse>, ErrorBody> {
    if body.subject_id.trim().is_empty() {
        return Err(error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "subject_id must not be empty",
        ));
    }
    if !body.client_variability_ms.is_finite() || body.client_variability_ms < 0.0 {
        return Err(error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "client_variability_ms must be a non-negative finite number",
        ));
    }
    if body.samples.iter().any(|s| !s.is_finite()) {
        return Err(error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "samples must be finite numbers",
        ));
    }
    let min = state.engine.config().min_batch_len;
    if body.samples.len() < min {
        return Err(error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("need at least {} samples, got {}", min, body.samples.len()),
        ));
    }

    let outcome = state
        .engine
        .sync(body.into_request())
        .await
        .map_err(map_triage_error)?;
    Ok(Json(outcome.into()))
}

/// GET /api/v1/subjects/:id/status — current episode snapshot.
async fn handle_status(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<StatusResponse>, ErrorBody> {
    let report = state
        .engine
        .status(&subject_id)
        .await
        .map_err(map_triage_error)?;
    Ok(Json(report.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_advisory::MockAdvisor;
    use vigil_core::{ManualClock, RiskLevel, SubjectProfile, TriageConfig, UiAction};
    use vigil_notify::LogDispatcher;
    use vigil_store::{MemoryProfileStore, MemoryRecordStore};

    async fn state() -> AppState {
        let profiles = MemoryProfileStore::new();
        profiles
            .insert(
                "s1",
                SubjectProfile {
                    name: "Test Subject".into(),
                    contact_address: "+15550100".into(),
                    lifestyle_score: 80,
                    medical_history: vec![],
                },
            )
            .await;
        let engine = TriageEngine::new(
            Arc::new(MemoryRecordStore::new()),
            Arc::new(profiles),
            Arc::new(MockAdvisor::new()),
            Arc::new(LogDispatcher::new()),
            Arc::new(ManualClock::new(1_000)),
            TriageConfig::default(),
        );
        AppState {
            engine: Arc::new(engine),
        }
    }

    fn healthy_body() -> SyncBody {
        SyncBody {
            subject_id: "s1".into(),
            samples: vec![60.0; 30],
            client_variability_ms: 0.0,
            lifestyle_score: None,
            is_active_context: false,
            systolic: 120,
            diastolic: 80,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn sync_happy_path_returns_green() {
        let state = state().await;
        let Json(resp) = handle_sync(State(state), Json(healthy_body()))
            .await
            .unwrap();
        assert_eq!(resp.status, RiskLevel::Green);
        assert!(!resp.degraded);
    }

    #[tokio::test]
    async fn sync_rejects_empty_subject_id() {
        let state = state().await;
        let mut body = healthy_body();
        body.subject_id = "  ".into();
        let (code, _) = handle_sync(State(state), Json(body)).await.unwrap_err();
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn sync_rejects_non_finite_samples() {
        let state = state().await;
        let mut body = healthy_body();
        body.samples[3] = f64::NAN;
        let (code, _) = handle_sync(State(state), Json(body)).await.unwrap_err();
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn sync_rejects_short_batch_even_with_cross_check() {
        let state = state().await;
        let mut body = healthy_body();
        body.samples.truncate(3);
        body.client_variability_ms = 55.0;
        let (code, _) = handle_sync(State(state), Json(body)).await.unwrap_err();
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn sync_degrades_on_implausible_samples() {
        // Finite but out-of-range samples pass the ingress and are rejected
        // by the signal processor; the engine falls back to the cross-check.
        let state = state().await;
        let mut body = healthy_body();
        body.samples[10] = 10.0;
        body.client_variability_ms = 55.0;
        let Json(resp) = handle_sync(State(state), Json(body)).await.unwrap();
        assert!(resp.degraded);
        assert_eq!(resp.variability_ms, 55.0);
    }

    #[tokio::test]
    async fn sync_maps_missing_profile_to_404() {
        let state = state().await;
        let mut body = healthy_body();
        body.subject_id = "nobody".into();
        let (code, _) = handle_sync(State(state), Json(body)).await.unwrap_err();
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_of_unseen_subject_is_fresh_green() {
        let state = state().await;
        let Json(resp) = handle_status(State(state), Path("s1".into())).await.unwrap();
        assert_eq!(resp.status, RiskLevel::Green);
        assert_eq!(resp.ui_action, UiAction::PassiveMonitoring);
        assert!(resp.advisory.is_empty());
    }

    #[tokio::test]
    async fn status_reflects_a_completed_sync() {
        let state = state().await;
        let mut body = healthy_body();
        body.systolic = 185;
        let Json(sync) = handle_sync(State(state.clone()), Json(body)).await.unwrap();
        assert_eq!(sync.status, RiskLevel::Red);
        let Json(resp) = handle_status(State(state), Path("s1".into())).await.unwrap();
        assert_eq!(resp.status, RiskLevel::Red);
        assert_eq!(resp.ui_action, UiAction::CallEmergency);
    }
}
