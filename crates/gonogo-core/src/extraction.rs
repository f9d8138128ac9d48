use async_trait::async_trait;
use bytes::Bytes;

use crate::document::{Document, ExtractionResult, RasterPage};
use crate::error::Result;

/// Reads an embedded text layer straight out of the document structure.
#[async_trait]
pub trait TextLayerExtractor: Send + Sync {
    async fn extract_text_layer(&self, bytes: Bytes) -> Result<String>;
}

/// Renders the first page of a document into a pixel buffer.
#[async_trait]
pub trait RasterRenderer: Send + Sync {
    async fn render_first_page(&self, bytes: Bytes) -> Result<RasterPage>;
}

/// Hands out recognition workers. A worker must be released after use; wrap
/// it in an `OcrSession` so that happens on every exit path.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    async fn acquire(&self, language: &str) -> Result<Box<dyn OcrWorker>>;
}

#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, page: RasterPage) -> Result<String>;

    /// Free the worker's resources. Must tolerate being called more than once.
    fn release(&mut self);
}

#[async_trait]
pub trait ExtractionPipeline: Send + Sync {
    async fn extract(&self, document: &Document) -> ExtractionResult;
    async fn extract_batch(&self, documents: &[Document]) -> Vec<ExtractionResult>;
}
