use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use gonogo_core::AppConfig;
use gonogo_extraction::HybridExtractionPipeline;
use gonogo_polling::{PollingCanceller, PollingCoordinator, SharedAggregator};

/// Upper bound on tracked sessions, live and finished together.
pub const MAX_TRACKED_SESSIONS: usize = 100;

#[derive(Clone)]
pub struct TrackedSession {
    pub aggregator: SharedAggregator,
    pub canceller: PollingCanceller,
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub extraction: Arc<HybridExtractionPipeline>,
    pub coordinator: PollingCoordinator,
    pub sessions: Arc<RwLock<HashMap<String, TrackedSession>>>,
}

/// Prune finished sessions once the table holds `capacity` entries. Returns
/// `false` when every slot still belongs to a live session.
pub fn make_room(sessions: &mut HashMap<String, TrackedSession>, capacity: usize) -> bool {
    if sessions.len() < capacity {
        return true;
    }
    sessions.retain(|_, tracked| !tracked.aggregator.lock().state().is_terminal());
    sessions.len() < capacity
}
