use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// An uploaded document. The payload is immutable; every stage that reads it
/// gets its own `Bytes` view.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub media_type: String,
    bytes: Bytes,
}

impl Document {
    pub fn new(id: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn pdf(id: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self::new(id, PDF_MEDIA_TYPE, bytes)
    }

    /// A fresh view over the payload for one stage.
    pub fn view(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceStage {
    TextLayer,
    Ocr,
}

impl SourceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStage::TextLayer => "text_layer",
            SourceStage::Ocr => "ocr",
        }
    }
}

impl fmt::Display for SourceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    Render { detail: String },
    Ocr { detail: String },
    OcrEmpty,
    Exception { document_id: String },
}

impl FailureReason {
    /// User-facing label for a failed extraction.
    pub fn label(&self) -> String {
        match self {
            FailureReason::Render { detail } => format!("ERROR_render: {detail}"),
            FailureReason::Ocr { detail } => format!("ERROR_ocr: {detail}"),
            FailureReason::OcrEmpty => "ERROR_ocr_empty".to_string(),
            FailureReason::Exception { document_id } => format!("ERROR_{document_id}"),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Render { detail } => write!(f, "render failed: {detail}"),
            FailureReason::Ocr { detail } => write!(f, "ocr failed: {detail}"),
            FailureReason::OcrEmpty => f.write_str("ocr produced no text"),
            FailureReason::Exception { document_id } => write!(f, "exception: {document_id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionResult {
    Text { text: String, stage: SourceStage },
    Failure { reason: FailureReason },
}

impl ExtractionResult {
    pub fn text(text: impl Into<String>, stage: SourceStage) -> Self {
        ExtractionResult::Text {
            text: text.into(),
            stage,
        }
    }

    pub fn failure(reason: FailureReason) -> Self {
        ExtractionResult::Failure { reason }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ExtractionResult::Text { .. })
    }

    pub fn stage(&self) -> Option<SourceStage> {
        match self {
            ExtractionResult::Text { stage, .. } => Some(*stage),
            ExtractionResult::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            ExtractionResult::Text { .. } => None,
            ExtractionResult::Failure { reason } => Some(reason),
        }
    }

    /// The extracted text, or the labeled error string for a failure.
    pub fn display_text(&self) -> String {
        match self {
            ExtractionResult::Text { text, .. } => text.clone(),
            ExtractionResult::Failure { reason } => reason.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Luma8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One rendered page. Moved into OCR and dropped once recognition returns.
#[derive(Debug)]
pub struct RasterPage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl RasterPage {
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    /// Whether the buffer length matches the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}
