use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use gonogo_core::config::AppConfig;
use gonogo_core::document::{Document, ExtractionResult, FailureReason, SourceStage};
use gonogo_core::error::{GonogoError, Result};
use gonogo_core::extraction::{
    ExtractionPipeline, OcrEngine, RasterRenderer, TextLayerExtractor,
};

use crate::ocr::{OcrSession, TesseractEngine};
use crate::render::PdftoppmRenderer;
use crate::text_layer::{LopdfTextLayer, TextLayerOutcome};

/// Upper bound on returned text, in characters, whichever stage produced it.
pub const MAX_OUTPUT_CHARS: usize = 5000;

pub const OCR_LANGUAGE: &str = "eng";

/// Trim and cap text to `MAX_OUTPUT_CHARS` characters.
pub fn cap_text(text: &str) -> String {
    text.trim().chars().take(MAX_OUTPUT_CHARS).collect()
}

/// Text layer first, then first-page render + OCR.
#[derive(Clone)]
pub struct HybridExtractionPipeline {
    text_layer: Arc<dyn TextLayerExtractor>,
    renderer: Arc<dyn RasterRenderer>,
    ocr: Arc<dyn OcrEngine>,
}

impl HybridExtractionPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_stages(
            Arc::new(LopdfTextLayer::new()),
            Arc::new(PdftoppmRenderer::new(config.pdftoppm_path.clone())),
            Arc::new(TesseractEngine::new(config.tesseract_path.clone())),
        )
    }

    pub fn with_stages(
        text_layer: Arc<dyn TextLayerExtractor>,
        renderer: Arc<dyn RasterRenderer>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            text_layer,
            renderer,
            ocr,
        }
    }

    async fn read_text_layer(&self, document: &Document) -> Result<TextLayerOutcome> {
        match self.text_layer.extract_text_layer(document.view()).await {
            Ok(raw) => Ok(TextLayerOutcome::classify(&raw)),
            Err(GonogoError::TextLayerDecode(reason)) => Ok(TextLayerOutcome::Undecodable(reason)),
            Err(e) => Err(e),
        }
    }

    async fn run_stages(&self, document: &Document) -> Result<ExtractionResult> {
        match self.read_text_layer(document).await? {
            TextLayerOutcome::Usable(text) => {
                return Ok(ExtractionResult::text(cap_text(&text), SourceStage::TextLayer));
            }
            TextLayerOutcome::Inconclusive { chars } => {
                debug!(document_id = %document.id, chars, "Text layer too short, rendering");
            }
            TextLayerOutcome::Undecodable(reason) => {
                debug!(document_id = %document.id, reason = %reason, "No text layer, rendering");
            }
        }

        let page = match self.renderer.render_first_page(document.view()).await {
            Ok(page) => page,
            Err(GonogoError::Render(detail)) => {
                warn!(document_id = %document.id, detail = %detail, "Render failed");
                return Ok(ExtractionResult::failure(FailureReason::Render { detail }));
            }
            Err(e) => return Err(e),
        };

        let mut session = match OcrSession::acquire(self.ocr.as_ref(), OCR_LANGUAGE).await {
            Ok(session) => session,
            Err(GonogoError::Ocr(detail)) => {
                warn!(document_id = %document.id, detail = %detail, "OCR engine unavailable");
                return Ok(ExtractionResult::failure(FailureReason::Ocr { detail }));
            }
            Err(e) => return Err(e),
        };
        let recognized = session.recognize(page).await;
        session.release();

        let text = match recognized {
            Ok(text) => cap_text(&text),
            Err(GonogoError::Ocr(detail)) => {
                warn!(document_id = %document.id, detail = %detail, "OCR failed");
                return Ok(ExtractionResult::failure(FailureReason::Ocr { detail }));
            }
            Err(e) => return Err(e),
        };

        if text.is_empty() {
            Ok(ExtractionResult::failure(FailureReason::OcrEmpty))
        } else {
            Ok(ExtractionResult::text(text, SourceStage::Ocr))
        }
    }
}

#[async_trait]
impl ExtractionPipeline for HybridExtractionPipeline {
    async fn extract(&self, document: &Document) -> ExtractionResult {
        info!(
            document_id = %document.id,
            media_type = %document.media_type,
            bytes = document.len(),
            "Starting hybrid extraction"
        );

        let staged = AssertUnwindSafe(self.run_stages(document))
            .catch_unwind()
            .await;

        let result = match staged {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(document_id = %document.id, error = %e, "Extraction faulted");
                ExtractionResult::failure(FailureReason::Exception {
                    document_id: document.id.clone(),
                })
            }
            Err(_) => {
                error!(document_id = %document.id, "Extraction stage panicked");
                ExtractionResult::failure(FailureReason::Exception {
                    document_id: document.id.clone(),
                })
            }
        };

        match &result {
            ExtractionResult::Text { text, stage } => info!(
                document_id = %document.id,
                stage = %stage,
                chars = text.chars().count(),
                "Extraction complete"
            ),
            ExtractionResult::Failure { reason } => warn!(
                document_id = %document.id,
                reason = %reason,
                "Extraction failed"
            ),
        }

        result
    }

    async fn extract_batch(&self, documents: &[Document]) -> Vec<ExtractionResult> {
        info!(count = documents.len(), "Starting batch extraction");

        let mut join_set = tokio::task::JoinSet::new();

        for (i, doc) in documents.iter().enumerate() {
            let pipeline = self.clone();
            let doc = doc.clone();
            join_set.spawn(async move { (i, pipeline.extract(&doc).await) });
        }

        let mut slots: Vec<Option<ExtractionResult>> = vec![None; documents.len()];

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((i, result)) => slots[i] = Some(result),
                Err(join_err) => {
                    error!(error = %join_err, "Extraction task failed to join");
                }
            }
        }

        let results: Vec<ExtractionResult> = slots
            .into_iter()
            .zip(documents)
            .map(|(slot, doc)| {
                slot.unwrap_or_else(|| {
                    ExtractionResult::failure(FailureReason::Exception {
                        document_id: doc.id.clone(),
                    })
                })
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_text()).count();
        info!(
            succeeded,
            failed = results.len() - succeeded,
            "Batch extraction completed"
        );

        results
    }
}
