//! Scripted stand-ins for the extraction stages and the result sources.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

use gonogo_core::agent::{AgentResultRow, AgentResultSource, SessionMetadataRow, SessionRow, SessionStatusSource};
use gonogo_core::document::{PixelFormat, RasterPage};
use gonogo_core::error::{GonogoError, Result};
use gonogo_core::extraction::{OcrEngine, OcrWorker, RasterRenderer, TextLayerExtractor};

// ---------------------------------------------------------------------------
// Extraction stages
// ---------------------------------------------------------------------------

pub enum TextLayerScript {
    Text(String),
    Undecodable,
    Fault,
}

pub struct StubTextLayer {
    script: TextLayerScript,
    pub calls: AtomicUsize,
}

impl StubTextLayer {
    pub fn new(script: TextLayerScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn text(text: impl Into<String>) -> Arc<Self> {
        Self::new(TextLayerScript::Text(text.into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextLayerExtractor for StubTextLayer {
    async fn extract_text_layer(&self, _bytes: Bytes) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.script {
            TextLayerScript::Text(text) => Ok(text.clone()),
            TextLayerScript::Undecodable => {
                Err(GonogoError::TextLayerDecode("no text layer".into()))
            }
            TextLayerScript::Fault => Err(GonogoError::Internal("decoder state corrupted".into())),
        }
    }
}

pub struct StubRenderer {
    fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Bytes>>,
}

impl StubRenderer {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail_with: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(detail: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(detail.to_string()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterRenderer for StubRenderer {
    async fn render_first_page(&self, bytes: Bytes) -> Result<RasterPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(bytes);
        match &self.fail_with {
            Some(detail) => Err(GonogoError::Render(detail.clone())),
            None => Ok(RasterPage::new(2, 2, PixelFormat::Luma8, vec![255; 4])),
        }
    }
}

pub enum OcrScript {
    Text(String),
    Unavailable,
    Crash,
}

pub struct StubOcr {
    script: OcrScript,
    pub acquired: AtomicUsize,
    pub released: Arc<AtomicUsize>,
}

impl StubOcr {
    pub fn new(script: OcrScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            acquired: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn text(text: impl Into<String>) -> Arc<Self> {
        Self::new(OcrScript::Text(text.into()))
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

struct StubWorker {
    text: Option<String>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl OcrWorker for StubWorker {
    async fn recognize(&mut self, page: RasterPage) -> Result<String> {
        assert!(page.is_well_formed());
        self.text
            .clone()
            .ok_or_else(|| GonogoError::Ocr("recognition crashed".into()))
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OcrEngine for StubOcr {
    fn name(&self) -> &str {
        "stub"
    }

    async fn acquire(&self, language: &str) -> Result<Box<dyn OcrWorker>> {
        assert_eq!(language, "eng");
        let text = match &self.script {
            OcrScript::Unavailable => {
                return Err(GonogoError::Ocr("engine failed to initialize".into()))
            }
            OcrScript::Text(text) => Some(text.clone()),
            OcrScript::Crash => None,
        };
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubWorker {
            text,
            released: self.released.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Result sources
// ---------------------------------------------------------------------------

pub fn agent_row(agent_name: &str, minute: u32) -> AgentResultRow {
    AgentResultRow {
        agent_name: agent_name.to_string(),
        result: Some(serde_json::json!({ "output": format!("{agent_name} says GO") })),
        processing_time: Some(1.5),
        token_usage: Some(serde_json::json!({ "total_tokens": 100 })),
        character_count: None,
        updated_at: Some(at_minute(minute)),
    }
}

pub fn at_minute(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 22, 10, minute, 0).unwrap()
}

pub fn pending_row() -> SessionRow {
    SessionRow {
        status: "pending".to_string(),
        metadata: None,
    }
}

pub fn completed_row(doc_id: &str, document_url: &str, file_name: &str) -> SessionRow {
    SessionRow {
        status: "completed".to_string(),
        metadata: Some(SessionMetadataRow {
            doc_id: Some(doc_id.to_string()),
            document_url: Some(document_url.to_string()),
            file_name: Some(file_name.to_string()),
        }),
    }
}

/// Answers each tick from a script. Call `n` (0-based) uses entry `n`, or the
/// last entry once the script runs out.
pub struct ScriptedSource {
    agent_ticks: Vec<Vec<AgentResultRow>>,
    session_ticks: Vec<Option<SessionRow>>,
    failing_agent_calls: HashSet<usize>,
    agent_calls: AtomicUsize,
    session_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(
        agent_ticks: Vec<Vec<AgentResultRow>>,
        session_ticks: Vec<Option<SessionRow>>,
    ) -> Self {
        Self {
            agent_ticks,
            session_ticks,
            failing_agent_calls: HashSet::new(),
            agent_calls: AtomicUsize::new(0),
            session_calls: AtomicUsize::new(0),
        }
    }

    /// Make the agent query fail on the given 0-based calls.
    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.failing_agent_calls = calls.iter().copied().collect();
        self
    }

    pub fn agent_calls(&self) -> usize {
        self.agent_calls.load(Ordering::SeqCst)
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    fn pick<T: Clone>(script: &[T], call: usize) -> Option<T> {
        script.get(call).or_else(|| script.last()).cloned()
    }
}

#[async_trait]
impl AgentResultSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn completed_results(&self, session_id: &str) -> Result<Vec<AgentResultRow>> {
        let call = self.agent_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_agent_calls.contains(&call) {
            return Err(GonogoError::PollQuery {
                source_name: "scripted".into(),
                message: format!("connection reset while polling {session_id}"),
            });
        }
        Ok(Self::pick(&self.agent_ticks, call).unwrap_or_default())
    }
}

#[async_trait]
impl SessionStatusSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn session_status(&self, _session_id: &str) -> Result<Option<SessionRow>> {
        let call = self.session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::pick(&self.session_ticks, call).flatten())
    }
}
