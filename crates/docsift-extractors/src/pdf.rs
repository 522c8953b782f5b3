//! PDF text extraction through `pdftotext`, with an OCR fallback for
//! scanned documents.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::limits::SCANNED_PDF_MIN_CHARS;
use crate::error::ExtractResult;
use crate::tools::ExternalTools;
use crate::types::{ContentSource, ExtractedContent, Modality};
use crate::Extractor;

/// Prefix of the page images rendered for OCR.
const PAGE_PREFIX: &str = "page";

/// PDF content extractor.
///
/// All work is delegated to an [`ExternalTools`] implementation; a failing
/// tool degrades to a bracketed note in the text rather than an error.
#[derive(Clone)]
pub struct PdfExtractor {
    tools: Arc<dyn ExternalTools>,
    min_text_chars: usize,
}

impl PdfExtractor {
    pub fn new(tools: Arc<dyn ExternalTools>) -> Self {
        Self {
            tools,
            min_text_chars: SCANNED_PDF_MIN_CHARS,
        }
    }

    /// Override the scanned-document threshold.
    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    /// True when the text layer is too thin to be the real content.
    pub fn looks_scanned(&self, text: &str) -> bool {
        text.chars().filter(|c| !c.is_whitespace()).count() < self.min_text_chars
    }

    /// Render and recognise every page, appending to `texts` as it goes so
    /// pages read before a failure are kept.
    async fn ocr_pages(&self, path: &Path, texts: &mut Vec<String>) -> ExtractResult<()> {
        // Page images only live as long as this directory.
        let scratch = tempfile::tempdir()?;
        let pages = self
            .tools
            .render_pages(path, scratch.path(), PAGE_PREFIX)
            .await?;
        debug!(pages = pages.len(), "Rendered PDF pages for OCR");

        for page in &pages {
            texts.push(self.tools.ocr_image(page).await?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for PdfExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfExtractor")
            .field("min_text_chars", &self.min_text_chars)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, path: &Path, _out_dir: &Path) -> ExtractResult<ExtractedContent> {
        let mut text = match self.tools.pdf_to_text(path).await {
            Ok(text) => text,
            Err(err) => {
                warn!(file = %path.display(), "pdftotext failed: {err}");
                format!("[pdftotext error: {err}]")
            }
        };

        let scanned = self.looks_scanned(&text);
        let mut ocr_pages = 0usize;
        if scanned {
            info!(file = %path.display(), "Text layer is sparse, running OCR");
            let mut texts = Vec::new();
            let outcome = self.ocr_pages(path, &mut texts).await;
            ocr_pages = texts.len();
            if let Err(err) = outcome {
                warn!(file = %path.display(), "OCR failed: {err}");
                texts.push(format!("[ocr error: {err}]"));
            }
            text.push('\n');
            text.push_str(&texts.join("\n"));
        }

        Ok(
            ExtractedContent::new(text, Modality::Pdf, ContentSource::Path(path.to_path_buf()))
                .with_metadata("ocr_used", scanned)
                .with_metadata("ocr_pages", ocr_pages),
        )
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }
}
