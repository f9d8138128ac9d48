use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info, warn};

use gonogo_core::api_types::{StartPollingRequest, StartPollingResponse};
use gonogo_core::GonogoError;
use gonogo_polling::{PollingConfig, SharedAggregator};

use crate::state::{make_room, AppState, TrackedSession, MAX_TRACKED_SESSIONS};

fn error_body(message: String) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

/// POST /api/sessions: start polling a workflow session.
/// Returns 202 Accepted; results accumulate in the background.
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartPollingRequest>,
) -> impl IntoResponse {
    let session_id = req.session_id.trim().to_string();
    let max_ticks = req.max_ticks.or(state.config.poll_max_ticks);
    let config = PollingConfig::from_app_config(&state.config, max_ticks);

    let aggregator = SharedAggregator::new(session_id.clone());
    let mut sessions = state.sessions.write().await;
    if !sessions.contains_key(&session_id) && !make_room(&mut sessions, MAX_TRACKED_SESSIONS) {
        warn!(session_id = %session_id, limit = MAX_TRACKED_SESSIONS, "Session table full");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            error_body(format!(
                "Too many sessions in progress (limit {MAX_TRACKED_SESSIONS})"
            )),
        )
            .into_response();
    }

    let handle = match state.coordinator.start_polling(
        &session_id,
        config,
        aggregator.agent_result_callback(),
        aggregator.completion_callback(),
    ) {
        Ok(handle) => handle,
        Err(GonogoError::EmptySessionId) => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("session_id must not be empty".to_string()),
            )
                .into_response();
        }
        Err(GonogoError::AlreadyPolling(id)) => {
            warn!(session_id = %id, "Session already being polled");
            return (
                StatusCode::CONFLICT,
                error_body(format!("Session '{id}' is already being polled")),
            )
                .into_response();
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to start polling");
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string())).into_response();
        }
    };

    sessions.insert(
        session_id.clone(),
        TrackedSession {
            aggregator: aggregator.clone(),
            canceller: handle.canceller(),
        },
    );
    drop(sessions);

    tokio::spawn(async move {
        let outcome = handle.wait().await;
        aggregator.lock().apply_outcome(&outcome);
    });

    info!(session_id = %session_id, max_ticks = ?max_ticks, "Session polling started");

    (
        StatusCode::ACCEPTED,
        Json(StartPollingResponse {
            session_id,
            status: "polling".to_string(),
            max_ticks,
        }),
    )
        .into_response()
}

/// GET /api/sessions/{id}: accumulated results and progress.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&id) {
        Some(tracked) => (StatusCode::OK, Json(tracked.aggregator.snapshot())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            error_body(format!("Session '{id}' not found")),
        )
            .into_response(),
    }
}

/// DELETE /api/sessions/{id}: stop polling. Safe to repeat.
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tracked = state.sessions.read().await.get(&id).cloned();
    match tracked {
        Some(tracked) => {
            tracked.canceller.cancel();
            tracked.aggregator.lock().mark_cancelled();
            (StatusCode::OK, Json(tracked.aggregator.snapshot())).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            error_body(format!("Session '{id}' not found")),
        )
            .into_response(),
    }
}
