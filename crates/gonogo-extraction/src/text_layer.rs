//! Direct text-layer extraction with lopdf.
//!
//! Decoding never renders anything. A document whose text layer is missing or
//! too short is not an error here; `TextLayerOutcome` tells the pipeline
//! whether to stop or fall through to rendering.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use gonogo_core::error::{GonogoError, Result};
use gonogo_core::extraction::TextLayerExtractor;

/// A text layer counts as usable only when its trimmed length is strictly
/// greater than this many characters.
pub const USABLE_TEXT_THRESHOLD: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextLayerOutcome {
    /// Trimmed text long enough to return as-is.
    Usable(String),
    /// Decoded, but at or under the threshold.
    Inconclusive { chars: usize },
    /// The document could not be decoded for text at all.
    Undecodable(String),
}

impl TextLayerOutcome {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let chars = trimmed.chars().count();
        if chars > USABLE_TEXT_THRESHOLD {
            TextLayerOutcome::Usable(trimmed.to_string())
        } else {
            TextLayerOutcome::Inconclusive { chars }
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, TextLayerOutcome::Usable(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LopdfTextLayer;

impl LopdfTextLayer {
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: &[u8]) -> Result<String> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| GonogoError::TextLayerDecode(format!("failed to parse PDF: {e}")))?;

        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Err(GonogoError::TextLayerDecode("document has no pages".into()));
        }

        let mut parts = Vec::with_capacity(pages.len());
        for page in &pages {
            match document.extract_text(&[*page]) {
                Ok(text) => parts.push(text),
                Err(e) => debug!(page = *page, error = %e, "Skipping undecodable page"),
            }
        }

        Ok(parts.join(" "))
    }
}

#[async_trait]
impl TextLayerExtractor for LopdfTextLayer {
    async fn extract_text_layer(&self, bytes: Bytes) -> Result<String> {
        let len = bytes.len();
        let text = tokio::task::spawn_blocking(move || Self::decode(&bytes))
            .await
            .map_err(|e| GonogoError::Unexpected(format!("text layer task failed: {e}")))??;

        debug!(bytes = len, chars = text.chars().count(), "Decoded text layer");
        Ok(text)
    }
}
