//! Tesseract recognition and the scoped worker guard.
//!
//! Workers are handed out by an `OcrEngine` and must be released after use.
//! `OcrSession` owns one worker and releases it when dropped, so early
//! returns and panics during recognition cannot leak the worker.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use gonogo_core::document::{PixelFormat, RasterPage};
use gonogo_core::error::{GonogoError, Result};
use gonogo_core::extraction::{OcrEngine, OcrWorker};

const TESSERACT_NOT_FOUND: &str = "tesseract not found (install tesseract-ocr)";

/// An acquired OCR worker. Released exactly once: explicitly via
/// [`OcrSession::release`] or implicitly on drop.
pub struct OcrSession {
    engine: String,
    worker: Option<Box<dyn OcrWorker>>,
}

impl OcrSession {
    pub async fn acquire(engine: &dyn OcrEngine, language: &str) -> Result<Self> {
        let worker = engine.acquire(language).await?;
        debug!(engine = engine.name(), language, "Acquired OCR worker");
        Ok(Self {
            engine: engine.name().to_string(),
            worker: Some(worker),
        })
    }

    pub async fn recognize(&mut self, page: RasterPage) -> Result<String> {
        match self.worker.as_mut() {
            Some(worker) => worker.recognize(page).await,
            None => Err(GonogoError::Ocr("OCR worker already released".into())),
        }
    }

    pub fn release(mut self) {
        self.release_worker();
    }

    fn release_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.release();
            debug!(engine = %self.engine, "Released OCR worker");
        }
    }
}

impl Drop for OcrSession {
    fn drop(&mut self) {
        self.release_worker();
    }
}

/// Tesseract via its command-line binary.
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn check_binary(&self) -> Result<()> {
        match Command::new(&self.binary).arg("--version").output().await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(GonogoError::Ocr(format!(
                "tesseract failed to start: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(GonogoError::Ocr(TESSERACT_NOT_FOUND.to_string()))
            }
            Err(e) => Err(GonogoError::Ocr(format!("tesseract failed to start: {e}"))),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn acquire(&self, language: &str) -> Result<Box<dyn OcrWorker>> {
        self.check_binary().await?;
        let workspace = TempDir::new()
            .map_err(|e| GonogoError::Ocr(format!("failed to create OCR workspace: {e}")))?;
        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            language: language.to_string(),
            workspace: Some(workspace),
        }))
    }
}

/// One recognition worker. Owns a scratch directory for page images.
pub struct TesseractWorker {
    binary: String,
    language: String,
    workspace: Option<TempDir>,
}

impl TesseractWorker {
    fn write_page(&self, page: RasterPage) -> Result<PathBuf> {
        let workspace = self
            .workspace
            .as_ref()
            .ok_or_else(|| GonogoError::Ocr("OCR worker already released".into()))?;
        let path = workspace.path().join("page.png");

        let RasterPage {
            width,
            height,
            format,
            pixels,
        } = page;
        let saved = match format {
            PixelFormat::Luma8 => image::GrayImage::from_raw(width, height, pixels)
                .map(|img| img.save(&path)),
            PixelFormat::Rgba8 => image::RgbaImage::from_raw(width, height, pixels)
                .map(|img| img.save(&path)),
        };

        match saved {
            Some(Ok(())) => Ok(path),
            Some(Err(e)) => Err(GonogoError::Ocr(format!("failed to write page image: {e}"))),
            None => Err(GonogoError::Ocr(
                "pixel buffer does not match page dimensions".into(),
            )),
        }
    }
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, page: RasterPage) -> Result<String> {
        let image_path = self.write_page(page)?;

        let output = Command::new(&self.binary)
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(GonogoError::Ocr(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(GonogoError::Ocr(TESSERACT_NOT_FOUND.to_string()))
            }
            Err(e) => Err(GonogoError::Io(e)),
        }
    }

    fn release(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            if let Err(e) = workspace.close() {
                warn!(error = %e, "Failed to remove OCR workspace");
            }
        }
    }
}
