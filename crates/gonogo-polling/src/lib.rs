mod aggregator;
mod coordinator;
mod supabase;

pub use aggregator::{
    ResultAggregator, SharedAggregator, PROGRESS_AGENT_CAP, PROGRESS_DONE, PROGRESS_PER_AGENT,
    PROGRESS_STARTED,
};
pub use coordinator::{
    AgentResultCallback, CompletionCallback, PollOutcome, PollingCanceller, PollingConfig,
    PollingCoordinator, PollingHandle,
};
pub use supabase::{SupabaseSource, AGENT_RESULTS_TABLE, WORKFLOW_SESSIONS_TABLE};
