//! First-page rasterization through poppler's `pdftoppm`.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use gonogo_core::document::{PixelFormat, RasterPage};
use gonogo_core::error::{GonogoError, Result};
use gonogo_core::extraction::RasterRenderer;

/// PDF user space is 72 units per inch.
const BASE_DPI: u32 = 72;

/// Upscaling applied before recognition.
pub const RENDER_SCALE: u32 = 2;

const PDFTOPPM_NOT_FOUND: &str = "pdftoppm not found (install poppler-utils)";

pub struct PdftoppmRenderer {
    binary: String,
}

impl PdftoppmRenderer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn dpi() -> u32 {
        BASE_DPI * RENDER_SCALE
    }

    async fn rasterize(&self, input: &Path, output_prefix: &Path) -> Result<()> {
        let dpi = Self::dpi().to_string();
        let output = Command::new(&self.binary)
            .args(["-png", "-gray", "-singlefile", "-r", &dpi, "-f", "1", "-l", "1"])
            .arg(input)
            .arg(output_prefix)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(GonogoError::Render(format!(
                    "pdftoppm exited with {}: {}",
                    output.status,
                    stderr.trim()
                )))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(GonogoError::Render(PDFTOPPM_NOT_FOUND.to_string()))
            }
            Err(e) => Err(GonogoError::Io(e)),
        }
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

/// Decode a rendered PNG into an owned grayscale buffer.
pub fn decode_page(png: &[u8]) -> Result<RasterPage> {
    let image = image::load_from_memory(png)
        .map_err(|e| GonogoError::Render(format!("failed to decode rendered page: {e}")))?;
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(GonogoError::Render("rendered page is empty".into()));
    }
    Ok(RasterPage::new(width, height, PixelFormat::Luma8, gray.into_raw()))
}

#[async_trait]
impl RasterRenderer for PdftoppmRenderer {
    async fn render_first_page(&self, bytes: Bytes) -> Result<RasterPage> {
        if bytes.is_empty() {
            return Err(GonogoError::Render("document is empty".into()));
        }

        // Dropped (and deleted) on every return path below.
        let scratch = TempDir::new()?;
        let input = scratch.path().join("input.pdf");
        let output_prefix = scratch.path().join("page");
        tokio::fs::write(&input, &bytes).await?;

        self.rasterize(&input, &output_prefix).await?;

        let rendered = scratch.path().join("page.png");
        let png = match tokio::fs::read(&rendered).await {
            Ok(png) => png,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GonogoError::Render("document has no renderable pages".into()));
            }
            Err(e) => return Err(GonogoError::Io(e)),
        };

        let page = decode_page(&png)?;
        debug!(
            width = page.width,
            height = page.height,
            dpi = Self::dpi(),
            "Rendered first page"
        );
        Ok(page)
    }
}
