use serde::{Deserialize, Serialize};

use crate::agent::{AgentResult, DocumentMetadata};
use crate::document::{ExtractionResult, SourceStage};

// --- Health ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub renderer_available: bool,
    pub ocr_available: bool,
    pub active_sessions: usize,
}

// --- Extraction ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractQuery {
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub document_id: String,
    pub stage: Option<SourceStage>,
    pub text: Option<String>,
    pub char_count: usize,
    pub error: Option<String>,
}

impl ExtractResponse {
    pub fn from_result(document_id: String, result: &ExtractionResult) -> Self {
        match result {
            ExtractionResult::Text { text, stage } => Self {
                document_id,
                stage: Some(*stage),
                char_count: text.chars().count(),
                text: Some(text.clone()),
                error: None,
            },
            ExtractionResult::Failure { reason } => Self {
                document_id,
                stage: None,
                text: None,
                char_count: 0,
                error: Some(reason.label()),
            },
        }
    }
}

// --- Sessions ---

#[derive(Debug, Serialize, Deserialize)]
pub struct StartPollingRequest {
    pub session_id: String,
    pub max_ticks: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartPollingResponse {
    pub session_id: String,
    pub status: String,
    pub max_ticks: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregateState {
    InProgress,
    Completed,
    TimedOut,
    Cancelled,
    Failed,
}

impl AggregateState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AggregateState::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: AggregateState,
    pub progress: u8,
    pub status_text: String,
    pub results: Vec<AgentResult>,
    pub document: Option<DocumentMetadata>,
}
