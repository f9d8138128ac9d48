use gonogo_core::agent::{AgentResult, AgentResultRow, DocumentMetadata, SessionRow, SessionStatus};
use gonogo_core::api_types::{
    AggregateState, ExtractResponse, HealthResponse, SessionSnapshot, StartPollingRequest,
    StartPollingResponse,
};
use gonogo_core::config::AppConfig;
use gonogo_core::document::{ExtractionResult, FailureReason, SourceStage};
use serde_json::json;

// ---------------------------------------------------------------------------
// HealthResponse serialization/deserialization
// ---------------------------------------------------------------------------

#[test]
fn health_response_roundtrip() {
    let hr = HealthResponse {
        status: "ok".to_string(),
        version: "0.1.0".to_string(),
        renderer_available: true,
        ocr_available: false,
        active_sessions: 3,
    };

    let json = serde_json::to_string(&hr).expect("failed to serialize HealthResponse");
    let deserialized: HealthResponse =
        serde_json::from_str(&json).expect("failed to deserialize HealthResponse");

    assert_eq!(deserialized.status, "ok");
    assert!(deserialized.renderer_available);
    assert!(!deserialized.ocr_available);
    assert_eq!(deserialized.active_sessions, 3);
}

// ---------------------------------------------------------------------------
// Extraction results on the wire
// ---------------------------------------------------------------------------

#[test]
fn extraction_result_is_tagged_by_outcome() {
    let result = ExtractionResult::text("Invoice No. 4471", SourceStage::Ocr);
    let value = serde_json::to_value(&result).expect("failed to serialize ExtractionResult");

    assert_eq!(
        value,
        json!({ "outcome": "text", "text": "Invoice No. 4471", "stage": "ocr" })
    );
}

#[test]
fn failure_reason_is_tagged_by_kind() {
    let result = ExtractionResult::failure(FailureReason::Render {
        detail: "no page 1".into(),
    });
    let value = serde_json::to_value(&result).expect("failed to serialize ExtractionResult");

    assert_eq!(value["outcome"], "failure");
    assert_eq!(value["reason"]["kind"], "render");
    assert_eq!(value["reason"]["detail"], "no page 1");

    let back: ExtractionResult = serde_json::from_value(value).expect("failed to deserialize");
    assert_eq!(back, result);
}

#[test]
fn extract_response_for_text_layer_hit() {
    let text = "x".repeat(2000);
    let result = ExtractionResult::text(text.clone(), SourceStage::TextLayer);
    let response = ExtractResponse::from_result("contract.pdf".into(), &result);

    let value = serde_json::to_value(&response).expect("failed to serialize ExtractResponse");
    assert_eq!(value["document_id"], "contract.pdf");
    assert_eq!(value["stage"], "text_layer");
    assert_eq!(value["char_count"], 2000);
    assert!(value["error"].is_null());
}

#[test]
fn extract_response_carries_failure_label() {
    let result = ExtractionResult::failure(FailureReason::OcrEmpty);
    let response = ExtractResponse::from_result("blank.pdf".into(), &result);

    assert_eq!(response.error.as_deref(), Some("ERROR_ocr_empty"));
    assert!(response.stage.is_none());
    assert_eq!(response.char_count, 0);
}

// ---------------------------------------------------------------------------
// Session requests and snapshots
// ---------------------------------------------------------------------------

#[test]
fn start_polling_request_max_ticks_is_optional() {
    let req: StartPollingRequest =
        serde_json::from_str(r#"{"session_id":"sess-abc"}"#).expect("failed to deserialize");
    assert_eq!(req.session_id, "sess-abc");
    assert!(req.max_ticks.is_none());

    let req: StartPollingRequest =
        serde_json::from_str(r#"{"session_id":"sess-abc","max_ticks":75}"#)
            .expect("failed to deserialize");
    assert_eq!(req.max_ticks, Some(75));
}

#[test]
fn start_polling_response_roundtrip() {
    let resp = StartPollingResponse {
        session_id: "sess-abc".into(),
        status: "polling".into(),
        max_ticks: Some(75),
    };
    let json = serde_json::to_string(&resp).expect("failed to serialize");
    let back: StartPollingResponse = serde_json::from_str(&json).expect("failed to deserialize");
    assert_eq!(back.session_id, "sess-abc");
    assert_eq!(back.max_ticks, Some(75));
}

#[test]
fn session_snapshot_serializes_state_in_snake_case() {
    let snapshot = SessionSnapshot {
        session_id: "sess-abc".into(),
        state: AggregateState::TimedOut,
        progress: 40,
        status_text: "Timed out waiting for workflow results.".into(),
        results: vec![AgentResult {
            session_id: "sess-abc".into(),
            agent_name: "extractor".into(),
            result: json!("GO"),
            processing_time: 2.5,
            character_count: 2,
            token_usage: 120,
            completed_at: None,
        }],
        document: None,
    };

    let value = serde_json::to_value(&snapshot).expect("failed to serialize SessionSnapshot");
    assert_eq!(value["state"], "timed_out");
    assert_eq!(value["results"][0]["agent_name"], "extractor");
    assert!(value["document"].is_null());
}

#[test]
fn aggregate_state_terminality() {
    assert!(!AggregateState::InProgress.is_terminal());
    assert!(AggregateState::Completed.is_terminal());
    assert!(AggregateState::TimedOut.is_terminal());
    assert!(AggregateState::Cancelled.is_terminal());
    assert!(AggregateState::Failed.is_terminal());
}

// ---------------------------------------------------------------------------
// Source rows
// ---------------------------------------------------------------------------

#[test]
fn agent_row_parses_postgrest_payload() {
    let row: AgentResultRow = serde_json::from_value(json!({
        "agent_name": "merger",
        "result": { "output": "Recommendation: GO" },
        "processing_time": 12.4,
        "token_usage": { "total_tokens": 2048, "prompt_tokens": 1500 },
        "updated_at": "2025-10-22T10:03:00Z",
        "status": "completed"
    }))
    .expect("failed to deserialize AgentResultRow");

    let result = AgentResult::from_row("sess-abc", &row);
    assert_eq!(result.result, json!("Recommendation: GO"));
    assert_eq!(result.token_usage, 2048);
    assert_eq!(result.processing_time, 12.4);
    assert!(result.completed_at.is_some());
}

#[test]
fn agent_row_tolerates_missing_optional_fields() {
    let row: AgentResultRow = serde_json::from_value(json!({ "agent_name": "extractor" }))
        .expect("failed to deserialize AgentResultRow");

    let result = AgentResult::from_row("sess-abc", &row);
    assert_eq!(result.result, serde_json::Value::Null);
    assert_eq!(result.token_usage, 0);
    assert_eq!(result.processing_time, 0.0);
}

#[test]
fn session_row_maps_file_name_to_document_name() {
    let row: SessionRow = serde_json::from_value(json!({
        "status": "completed",
        "metadata": {
            "doc_id": "D1",
            "document_url": "https://docs.example.com/D1",
            "file_name": "Proposal.docx"
        }
    }))
    .expect("failed to deserialize SessionRow");

    assert_eq!(row.status(), SessionStatus::Completed);
    let document = DocumentMetadata::from(&row);
    assert_eq!(document.doc_id.as_deref(), Some("D1"));
    assert_eq!(document.document_name.as_deref(), Some("Proposal.docx"));
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

#[test]
fn app_config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.poll_interval_ms, 4000);
    assert_eq!(config.pdftoppm_path, "pdftoppm");
    assert_eq!(config.tesseract_path, "tesseract");
    assert_eq!(config.server_port, 8080);
}
