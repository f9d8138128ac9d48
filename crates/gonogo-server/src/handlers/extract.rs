use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

use gonogo_core::api_types::{ExtractQuery, ExtractResponse};
use gonogo_core::document::PDF_MEDIA_TYPE;
use gonogo_core::{Document, ExtractionPipeline};

use crate::state::AppState;

/// POST /api/extract: run the hybrid pipeline over the request body.
pub async fn extract_document(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let document_id = query
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("upload-{}", Uuid::new_v4()));

    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(PDF_MEDIA_TYPE)
        .to_string();

    info!(document_id = %document_id, bytes = body.len(), "Extraction requested");

    let document = Document::new(document_id.clone(), media_type, body);
    let result = state.extraction.extract(&document).await;
    let response = ExtractResponse::from_result(document_id, &result);

    let status = if result.is_text() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    (status, Json(response))
}
