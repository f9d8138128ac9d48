//! Accumulates agent deliveries for one session into a displayable state.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use gonogo_core::agent::{AgentResult, DocumentMetadata};
use gonogo_core::api_types::{AggregateState, SessionSnapshot};

use crate::coordinator::{AgentResultCallback, CompletionCallback, PollOutcome};

/// Progress once the workflows have been triggered and polling begins.
pub const PROGRESS_STARTED: u8 = 20;
pub const PROGRESS_PER_AGENT: u8 = 10;
/// Agent deliveries alone never report more than this.
pub const PROGRESS_AGENT_CAP: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone)]
pub struct ResultAggregator {
    session_id: String,
    state: AggregateState,
    results: Vec<AgentResult>,
    progress: u8,
    status_text: String,
    document: Option<DocumentMetadata>,
}

impl ResultAggregator {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: AggregateState::InProgress,
            results: Vec::new(),
            progress: PROGRESS_STARTED,
            status_text: "Workflows started. Waiting for AI results...".to_string(),
            document: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> AggregateState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Results in the order they were first delivered.
    pub fn results(&self) -> &[AgentResult] {
        &self.results
    }

    pub fn document(&self) -> Option<&DocumentMetadata> {
        self.document.as_ref()
    }

    /// Record a delivery. Returns `false` once the session is terminal.
    pub fn record(&mut self, result: AgentResult) -> bool {
        if self.state.is_terminal() {
            debug!(
                session_id = %self.session_id,
                agent_name = %result.agent_name,
                "Ignoring agent result after terminal state"
            );
            return false;
        }

        self.status_text = format!("Agent {} completed", result.agent_name);
        self.progress = self
            .progress
            .saturating_add(PROGRESS_PER_AGENT)
            .min(PROGRESS_AGENT_CAP);
        self.results.push(result);
        true
    }

    /// Returns `false` if the session had already reached a terminal state.
    pub fn complete(&mut self, document: DocumentMetadata) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = AggregateState::Completed;
        self.progress = PROGRESS_DONE;
        self.status_text = "Analysis completed successfully!".to_string();
        self.document = Some(document);
        true
    }

    pub fn mark_timed_out(&mut self) -> bool {
        self.finish(
            AggregateState::TimedOut,
            "Timed out waiting for workflow results.",
        )
    }

    pub fn mark_cancelled(&mut self) -> bool {
        self.finish(AggregateState::Cancelled, "Polling stopped.")
    }

    pub fn mark_failed(&mut self, reason: &str) -> bool {
        self.finish(AggregateState::Failed, &format!("Polling failed: {reason}"))
    }

    /// Fold a loop's terminal outcome into the aggregate.
    pub fn apply_outcome(&mut self, outcome: &PollOutcome) -> bool {
        match outcome {
            PollOutcome::Completed(document) => self.complete(document.clone()),
            PollOutcome::TimedOut { .. } => self.mark_timed_out(),
            PollOutcome::Cancelled => self.mark_cancelled(),
            PollOutcome::Failed(reason) => self.mark_failed(reason),
        }
    }

    fn finish(&mut self, state: AggregateState, status_text: &str) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = state;
        self.status_text = status_text.to_string();
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            state: self.state,
            progress: self.progress,
            status_text: self.status_text.clone(),
            results: self.results.clone(),
            document: self.document.clone(),
        }
    }
}

/// A `ResultAggregator` shared between the polling task and readers.
#[derive(Debug, Clone)]
pub struct SharedAggregator {
    inner: Arc<Mutex<ResultAggregator>>,
}

impl SharedAggregator {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResultAggregator::new(session_id))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ResultAggregator> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn agent_result_callback(&self) -> AgentResultCallback {
        let shared = self.clone();
        Box::new(move |result| {
            shared.lock().record(result);
        })
    }

    pub fn completion_callback(&self) -> CompletionCallback {
        let shared = self.clone();
        Box::new(move |_session_id, document| {
            shared.lock().complete(document);
        })
    }
}
