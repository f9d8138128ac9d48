//! Result sources backed by Supabase's PostgREST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use gonogo_core::agent::{AgentResultRow, AgentResultSource, SessionRow, SessionStatusSource};
use gonogo_core::config::AppConfig;
use gonogo_core::error::{GonogoError, Result};

pub const AGENT_RESULTS_TABLE: &str = "ai_agent_results";
pub const WORKFLOW_SESSIONS_TABLE: &str = "workflow_sessions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct SupabaseSource {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl SupabaseSource {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.supabase_url).map_err(|e| {
            GonogoError::Config(format!("invalid SUPABASE_URL {:?}: {e}", config.supabase_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GonogoError::Config(format!(
                "SUPABASE_URL cannot be used as a base URL: {base_url}"
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("gonogo/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.supabase_key.clone(),
        })
    }

    /// `<base>/rest/v1/<table>?select=*&<filters>`
    pub fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["rest", "v1", table]);
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (key, value) in filters {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, table: &str, url: Url) -> Result<Vec<T>> {
        debug!(table, url = %url, "Querying PostgREST");

        let query_error = |message: String| GonogoError::PollQuery {
            source_name: table.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| query_error(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(query_error(format!(
                "PostgREST returned HTTP {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| query_error(format!("Failed to parse rows: {e}")))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl AgentResultSource for SupabaseSource {
    fn name(&self) -> &str {
        AGENT_RESULTS_TABLE
    }

    async fn completed_results(&self, session_id: &str) -> Result<Vec<AgentResultRow>> {
        let url = self.table_url(
            AGENT_RESULTS_TABLE,
            &[("session_id", eq(session_id)), ("status", eq("completed"))],
        );
        self.fetch_rows(AGENT_RESULTS_TABLE, url).await
    }
}

#[async_trait]
impl SessionStatusSource for SupabaseSource {
    fn name(&self) -> &str {
        WORKFLOW_SESSIONS_TABLE
    }

    async fn session_status(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let url = self.table_url(
            WORKFLOW_SESSIONS_TABLE,
            &[("session_id", eq(session_id)), ("limit", "1".to_string())],
        );
        let rows: Vec<SessionRow> = self.fetch_rows(WORKFLOW_SESSIONS_TABLE, url).await?;
        Ok(rows.into_iter().next())
    }
}
