pub mod ocr;
pub mod pipeline;
pub mod render;
pub mod text_layer;

pub use ocr::{OcrSession, TesseractEngine};
pub use pipeline::{cap_text, HybridExtractionPipeline, MAX_OUTPUT_CHARS, OCR_LANGUAGE};
pub use render::{PdftoppmRenderer, RENDER_SCALE};
pub use text_layer::{LopdfTextLayer, TextLayerOutcome, USABLE_TEXT_THRESHOLD};
