use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tokio::process::Command;
use tracing::{info, warn};

use gonogo_core::api_types::HealthResponse;

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

async fn binary_available(binary: &str, version_flag: &str) -> bool {
    match Command::new(binary).arg(version_flag).output().await {
        Ok(output) => output.status.success(),
        Err(e) => {
            warn!(binary, error = %e, "External binary unavailable");
            false
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("Health check requested");

    let renderer_available = binary_available(&state.config.pdftoppm_path, "-v").await;
    let ocr_available = binary_available(&state.config.tesseract_path, "--version").await;

    let status = if renderer_available && ocr_available {
        "ok".to_string()
    } else {
        "degraded".to_string()
    };

    let response = HealthResponse {
        status,
        version: VERSION.to_string(),
        renderer_available,
        ocr_available,
        active_sessions: state.coordinator.active_sessions(),
    };

    (StatusCode::OK, Json(response))
}
