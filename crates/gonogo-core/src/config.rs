use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    pub server_host: String,
    pub server_port: u16,
    pub poll_interval_ms: u64,
    /// Tick cap applied by the HTTP layer when a request does not name one.
    pub poll_max_ticks: Option<u32>,
    pub pdftoppm_path: String,
    pub tesseract_path: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            supabase_url: std::env::var("SUPABASE_URL")
                .unwrap_or_else(|_| "http://localhost:54321".into()),
            supabase_key: std::env::var("SUPABASE_KEY").unwrap_or_default(),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            poll_interval_ms: parse_poll_interval(std::env::var("POLL_INTERVAL_MS").ok().as_deref()),
            poll_max_ticks: std::env::var("POLL_MAX_TICKS")
                .ok()
                .and_then(|v| v.parse().ok()),
            pdftoppm_path: std::env::var("PDFTOPPM_PATH").unwrap_or_else(|_| "pdftoppm".into()),
            tesseract_path: std::env::var("TESSERACT_PATH")
                .unwrap_or_else(|_| "tesseract".into()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".into(),
            supabase_key: String::new(),
            server_host: "0.0.0.0".into(),
            server_port: 8080,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_max_ticks: None,
            pdftoppm_path: "pdftoppm".into(),
            tesseract_path: "tesseract".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Zero, negative or unparseable intervals fall back to the default.
fn parse_poll_interval(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
}
