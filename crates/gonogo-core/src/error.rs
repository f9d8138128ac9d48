use thiserror::Error;

#[derive(Error, Debug)]
pub enum GonogoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document has no decodable text layer. Recovered by the pipeline.
    #[error("Text layer decode error: {0}")]
    TextLayerDecode(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Unexpected extraction fault: {0}")]
    Unexpected(String),

    #[error("Poll query error ({source_name}): {message}")]
    PollQuery {
        source_name: String,
        message: String,
    },

    #[error("Session identifier must not be empty")]
    EmptySessionId,

    #[error("Session is already being polled: {0}")]
    AlreadyPolling(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GonogoError>;
