//! docsift-extractors - Review-report extraction for DOCX, XLSX and PDF.
//!
//! Turns a submitted document into a plain-text report for a human
//! reviewer: body text, tracked insertions and deletions, comments,
//! spreadsheet formulas and previews, and files embedded inside Word
//! documents.
//!
//! # Features
//!
//! - `pdf` (default) - PDF text via `pdftotext`, OCR fallback via
//!   `pdftoppm` + `tesseract`
//!
//! # Example
//!
//! ```ignore
//! use docsift_extractors::{ExtractionPipeline, ExtractorConfig};
//!
//! let pipeline = ExtractionPipeline::from_config(&ExtractorConfig::from_env());
//! let stats = pipeline.process_path(input, out_dir).await?;
//! println!("{} written, {} failed", stats.written, stats.failed);
//! ```

pub mod config;
pub mod container;
mod error;
mod factory;
pub mod ole10;
mod pipeline;
pub mod recovery;
pub mod report;
pub mod spreadsheet;
pub mod tools;
mod types;
pub mod word;
mod xml;

mod docx;
mod xlsx;

#[cfg(feature = "pdf")]
mod pdf;

pub use config::ExtractorConfig;
pub use container::{CompoundContainer, Container, Package};
pub use docx::{DocxExtractor, EMBEDDED_DIR};
pub use error::{ExtractError, ExtractResult, FailurePolicy};
pub use factory::ExtractorFactory;
pub use ole10::Ole10Native;
pub use pipeline::{BatchStats, ExtractionPipeline, ProcessedFile};
pub use recovery::{recover_embedded, RecoveredFile};
pub use tools::{check_dependencies, ExternalTools, SystemTools, ToolStatus};
pub use types::{
    Comment, ContentSource, EmbeddedPayload, ExtractedContent, Modality, RevisionEntry,
    RevisionKind, SpreadsheetModel,
};
pub use xlsx::{workbook_report, XlsxExtractor};

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

use std::path::Path;

use async_trait::async_trait;

/// Core Extractor trait - one implementation per input format.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Build the report for the file at `path`.
    ///
    /// Side outputs such as recovered embedded files are written under
    /// `out_dir`.
    async fn extract(&self, path: &Path, out_dir: &Path) -> ExtractResult<ExtractedContent>;

    /// Lowercase file extensions this extractor handles, without the dot.
    fn supported_extensions(&self) -> &[&str];

    /// Check if this extractor handles the given extension (any case).
    fn supports(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.supported_extensions().contains(&extension.as_str())
    }

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;

    /// Report written in place of a file whose extraction aborted.
    fn failure_report(&self, err: &ExtractError) -> String {
        format!("[{} extract error: {err}]", self.name())
    }
}
