pub mod agent;
pub mod api_types;
pub mod config;
pub mod document;
pub mod error;
pub mod extraction;

pub use agent::{
    AgentResult, AgentResultRow, AgentResultSource, DocumentMetadata, SessionMetadataRow,
    SessionRow, SessionStatus, SessionStatusSource,
};
pub use config::AppConfig;
pub use document::{
    Document, ExtractionResult, FailureReason, PixelFormat, RasterPage, SourceStage,
};
pub use error::{GonogoError, Result};
pub use extraction::{ExtractionPipeline, OcrEngine, OcrWorker, RasterRenderer, TextLayerExtractor};
