use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A completed row from the agent-result source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResultRow {
    pub agent_name: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub token_usage: Option<serde_json::Value>,
    #[serde(default)]
    pub character_count: Option<u64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One agent's output, delivered at most once per session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResult {
    pub session_id: String,
    pub agent_name: String,
    pub result: serde_json::Value,
    pub processing_time: f64,
    pub character_count: u64,
    pub token_usage: u64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentResult {
    pub fn from_row(session_id: &str, row: &AgentResultRow) -> Self {
        let raw = row.result.clone().unwrap_or(serde_json::Value::Null);

        // Object payloads wrap the useful part in `output`.
        let result = raw
            .get("output")
            .filter(|output| !output.is_null())
            .cloned()
            .unwrap_or_else(|| raw.clone());

        let character_count = row
            .character_count
            .unwrap_or_else(|| payload_char_count(&raw));

        let token_usage = row
            .token_usage
            .as_ref()
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|total| total.as_u64())
            .unwrap_or(0);

        Self {
            session_id: session_id.to_string(),
            agent_name: row.agent_name.clone(),
            result,
            processing_time: row.processing_time.unwrap_or(0.0),
            character_count,
            token_usage,
            completed_at: row.updated_at,
        }
    }
}

fn payload_char_count(raw: &serde_json::Value) -> u64 {
    match raw {
        serde_json::Value::String(s) => s.chars().count() as u64,
        other => other.to_string().chars().count() as u64,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Completed,
    Other(String),
}

impl SessionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => SessionStatus::Pending,
            "completed" => SessionStatus::Completed,
            other => SessionStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadataRow {
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// The single workflow-session row for a session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub status: String,
    #[serde(default)]
    pub metadata: Option<SessionMetadataRow>,
}

impl SessionRow {
    pub fn status(&self) -> SessionStatus {
        SessionStatus::parse(&self.status)
    }
}

/// Final document produced by a completed workflow session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub doc_id: Option<String>,
    pub document_url: Option<String>,
    pub document_name: Option<String>,
}

impl From<&SessionRow> for DocumentMetadata {
    fn from(row: &SessionRow) -> Self {
        let metadata = row.metadata.clone().unwrap_or_default();
        Self {
            doc_id: metadata.doc_id,
            document_url: metadata.document_url,
            document_name: metadata.file_name,
        }
    }
}

#[async_trait]
pub trait AgentResultSource: Send + Sync {
    fn name(&self) -> &str;

    /// All rows for `session_id` whose status is `completed`. Order is not significant.
    async fn completed_results(&self, session_id: &str) -> Result<Vec<AgentResultRow>>;
}

#[async_trait]
pub trait SessionStatusSource: Send + Sync {
    fn name(&self) -> &str;

    /// The session row, if one exists yet.
    async fn session_status(&self, session_id: &str) -> Result<Option<SessionRow>>;
}
