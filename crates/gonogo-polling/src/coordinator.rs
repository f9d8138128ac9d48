//! Interval polling of workflow results for one session at a time.
//!
//! Each `start_polling` call spawns one task that owns a `PollingSession`:
//! the delivered-agent map, the tick counter, the interval timer and the
//! session's active registration. The registration is the re-entrancy guard;
//! while it is held, a second `start_polling` for the same id is refused.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gonogo_core::agent::{
    AgentResult, AgentResultRow, AgentResultSource, DocumentMetadata, SessionStatus,
    SessionStatusSource,
};
use gonogo_core::config::AppConfig;
use gonogo_core::error::{GonogoError, Result};

pub type AgentResultCallback = Box<dyn Fn(AgentResult) + Send + Sync>;
pub type CompletionCallback = Box<dyn FnOnce(String, DocumentMetadata) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Ticks allowed before the session times out. `None` polls until
    /// completion or cancellation.
    pub max_ticks: Option<u32>,
}

impl PollingConfig {
    pub fn new(interval: Duration, max_ticks: Option<u32>) -> Self {
        Self {
            interval,
            max_ticks,
        }
    }

    pub fn from_app_config(config: &AppConfig, max_ticks: Option<u32>) -> Self {
        Self::new(config.poll_interval(), max_ticks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(DocumentMetadata),
    TimedOut { ticks: u32 },
    Cancelled,
    /// The polling task died without reaching one of the states above.
    Failed(String),
}

type ActiveSessions = Arc<Mutex<HashMap<String, u64>>>;

fn lock(active: &ActiveSessions) -> MutexGuard<'_, HashMap<String, u64>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds a session id in the active set. Release only removes the entry it
/// inserted, so a stale registration cannot evict a newer loop.
struct ActiveRegistration {
    active: ActiveSessions,
    session_id: String,
    generation: u64,
}

impl ActiveRegistration {
    fn claim(active: &ActiveSessions, session_id: &str, generation: u64) -> Option<Self> {
        let mut sessions = lock(active);
        if sessions.contains_key(session_id) {
            return None;
        }
        sessions.insert(session_id.to_string(), generation);
        Some(Self {
            active: active.clone(),
            session_id: session_id.to_string(),
            generation,
        })
    }

    fn release(&self) {
        let mut sessions = lock(&self.active);
        if sessions.get(&self.session_id) == Some(&self.generation) {
            sessions.remove(&self.session_id);
        }
    }
}

impl Drop for ActiveRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Clone)]
pub struct PollingCoordinator {
    agent_results: Arc<dyn AgentResultSource>,
    sessions: Arc<dyn SessionStatusSource>,
    active: ActiveSessions,
    generation: Arc<AtomicU64>,
}

impl PollingCoordinator {
    pub fn new(
        agent_results: Arc<dyn AgentResultSource>,
        sessions: Arc<dyn SessionStatusSource>,
    ) -> Self {
        Self {
            agent_results,
            sessions,
            active: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_polling(&self, session_id: &str) -> bool {
        lock(&self.active).contains_key(session_id)
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.active).len()
    }

    /// Start polling `session_id`. Fails with `AlreadyPolling` if a loop for
    /// the same id is still running; the running loop is left untouched.
    pub fn start_polling<A, C>(
        &self,
        session_id: &str,
        config: PollingConfig,
        on_agent_result: A,
        on_complete: C,
    ) -> Result<PollingHandle>
    where
        A: Fn(AgentResult) + Send + Sync + 'static,
        C: FnOnce(String, DocumentMetadata) + Send + 'static,
    {
        if session_id.is_empty() {
            return Err(GonogoError::EmptySessionId);
        }
        if config.interval.is_zero() {
            return Err(GonogoError::Config(
                "polling interval must be greater than zero".to_string(),
            ));
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let registration = ActiveRegistration::claim(&self.active, session_id, generation)
            .ok_or_else(|| {
                debug!(session_id, "Polling already running, ignoring start");
                GonogoError::AlreadyPolling(session_id.to_string())
            })?;
        let registration = Arc::new(registration);

        let token = CancellationToken::new();
        let session = PollingSession {
            session_id: session_id.to_string(),
            config,
            agent_results: self.agent_results.clone(),
            sessions: self.sessions.clone(),
            delivered: HashMap::new(),
            ticks: 0,
            registration: registration.clone(),
        };

        info!(
            session_id,
            interval_ms = config.interval.as_millis() as u64,
            max_ticks = ?config.max_ticks,
            "Starting session polling"
        );

        let task = tokio::spawn(session.run(
            token.clone(),
            Box::new(on_agent_result),
            Box::new(on_complete),
        ));

        Ok(PollingHandle {
            canceller: PollingCanceller {
                session_id: session_id.to_string(),
                token,
                registration,
            },
            task,
        })
    }
}

/// Cheap, cloneable way to stop a polling loop. Safe to call any number of
/// times, before or after the loop has finished.
#[derive(Clone)]
pub struct PollingCanceller {
    session_id: String,
    token: CancellationToken,
    registration: Arc<ActiveRegistration>,
}

impl PollingCanceller {
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            info!(session_id = %self.session_id, "Stopping session polling");
        }
        self.token.cancel();
        self.registration.release();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

pub struct PollingHandle {
    canceller: PollingCanceller,
    task: JoinHandle<PollOutcome>,
}

impl PollingHandle {
    pub fn session_id(&self) -> &str {
        self.canceller.session_id()
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> PollingCanceller {
        self.canceller.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to reach a terminal state.
    pub async fn wait(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => PollOutcome::Cancelled,
            Err(e) => {
                error!(session_id = %self.canceller.session_id, error = %e, "Polling task failed");
                self.canceller.registration.release();
                PollOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Per-session polling state, owned by the polling task.
struct PollingSession {
    session_id: String,
    config: PollingConfig,
    agent_results: Arc<dyn AgentResultSource>,
    sessions: Arc<dyn SessionStatusSource>,
    /// Delivered agent names and the last `updated_at` observed for each.
    delivered: HashMap<String, Option<DateTime<Utc>>>,
    ticks: u32,
    registration: Arc<ActiveRegistration>,
}

impl Drop for PollingSession {
    // Runs when the loop returns and when it unwinds, even while a
    // canceller still holds the registration.
    fn drop(&mut self) {
        self.registration.release();
    }
}

impl PollingSession {
    async fn run(
        mut self,
        token: CancellationToken,
        on_agent_result: AgentResultCallback,
        on_complete: CompletionCallback,
    ) -> PollOutcome {
        let mut on_complete = Some(on_complete);
        let period = self.config.interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            if let Some(max_ticks) = self.config.max_ticks {
                if self.ticks >= max_ticks {
                    break PollOutcome::TimedOut { ticks: self.ticks };
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break PollOutcome::Cancelled,
                _ = interval.tick() => {}
            }
            self.ticks += 1;

            let polled = tokio::select! {
                biased;
                _ = token.cancelled() => break PollOutcome::Cancelled,
                polled = self.poll_once(&on_agent_result) => polled,
            };

            match polled {
                Ok(Some(metadata)) => {
                    info!(
                        session_id = %self.session_id,
                        doc_id = ?metadata.doc_id,
                        ticks = self.ticks,
                        "Session complete, document ready"
                    );
                    if let Some(callback) = on_complete.take() {
                        callback(self.session_id.clone(), metadata.clone());
                    }
                    break PollOutcome::Completed(metadata);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(session_id = %self.session_id, tick = self.ticks, error = %e, "Polling error");
                }
            }
        };

        match &outcome {
            PollOutcome::TimedOut { ticks } => {
                warn!(session_id = %self.session_id, ticks, "Session polling timed out")
            }
            PollOutcome::Cancelled => {
                info!(session_id = %self.session_id, ticks = self.ticks, "Stopped polling for session")
            }
            PollOutcome::Completed(_) | PollOutcome::Failed(_) => {}
        }

        outcome
    }

    /// One poll cycle. Returns the document metadata once the session row
    /// reports completion.
    async fn poll_once(
        &mut self,
        on_agent_result: &AgentResultCallback,
    ) -> Result<Option<DocumentMetadata>> {
        let rows = self.agent_results.completed_results(&self.session_id).await?;
        for row in &rows {
            if let Some(result) = self.observe(row) {
                debug!(
                    session_id = %self.session_id,
                    agent_name = %result.agent_name,
                    "Delivering agent result"
                );
                on_agent_result(result);
            }
        }

        let status = self.sessions.session_status(&self.session_id).await?;
        Ok(status
            .filter(|row| row.status() == SessionStatus::Completed)
            .map(|row| DocumentMetadata::from(&row)))
    }

    /// First observation of an agent wins. Later rows for the same agent are
    /// ignored; a changed `updated_at` is logged once per change.
    fn observe(&mut self, row: &AgentResultRow) -> Option<AgentResult> {
        match self.delivered.get_mut(&row.agent_name) {
            None => {
                self.delivered
                    .insert(row.agent_name.clone(), row.updated_at);
                Some(AgentResult::from_row(&self.session_id, row))
            }
            Some(last_seen) => {
                if *last_seen != row.updated_at {
                    warn!(
                        session_id = %self.session_id,
                        agent_name = %row.agent_name,
                        updated_at = ?row.updated_at,
                        "Ignoring revised result for already delivered agent"
                    );
                    *last_seen = row.updated_at;
                }
                None
            }
        }
    }
}
