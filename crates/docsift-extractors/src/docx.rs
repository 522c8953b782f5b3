//! Word document extractor.
//!
//! Produces the body, track-changes and comments report, then recovers
//! embedded objects and inlines a report for each recovered spreadsheet.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::container::Package;
use crate::error::ExtractResult;
use crate::recovery::{recover_embedded, RecoveredFile};
use crate::report::{assemble, EmbeddedSection};
use crate::types::{ContentSource, ExtractedContent, Modality};
use crate::word::{self, WordDocument};
use crate::xlsx::workbook_report;
use crate::Extractor;

/// Subdirectory of the output directory that receives recovered files.
pub const EMBEDDED_DIR: &str = "embedded";

/// DOCX content extractor.
///
/// Package parsing and embedded recovery are synchronous and run inside
/// `spawn_blocking`.
#[derive(Debug, Clone, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    /// Create new DOCX extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract synchronously (called within spawn_blocking).
    fn extract_sync(
        path: PathBuf,
        out_dir: PathBuf,
    ) -> ExtractResult<(WordDocument, Vec<RecoveredFile>, String)> {
        let mut package = Package::open(&path)?;
        let document = word::read_document(&mut package);
        let mut text = word::render(&document);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let recovered = recover_embedded(&mut package, &stem, &out_dir.join(EMBEDDED_DIR));
        drop(package);

        let sections: Vec<EmbeddedSection> = recovered.iter().map(embedded_section).collect();
        text = assemble(&text, &sections);

        Ok((document, recovered, text))
    }
}

fn embedded_section(file: &RecoveredFile) -> EmbeddedSection {
    let name = file.file_name();
    if file.is_spreadsheet() {
        info!(file = %file.path.display(), "Parsing embedded spreadsheet");
        EmbeddedSection::Spreadsheet {
            report: workbook_report(&file.path),
            name,
        }
    } else {
        EmbeddedSection::Unparsed { name }
    }
}

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(&self, path: &Path, out_dir: &Path) -> ExtractResult<ExtractedContent> {
        let owned_path = path.to_path_buf();
        let owned_out = out_dir.to_path_buf();

        let (document, recovered, text) =
            tokio::task::spawn_blocking(move || Self::extract_sync(owned_path, owned_out))
                .await??;

        let embedded: Vec<String> = recovered
            .iter()
            .map(|file| file.path.display().to_string())
            .collect();

        Ok(
            ExtractedContent::new(text, Modality::Docx, ContentSource::Path(path.to_path_buf()))
                .with_metadata("insertions", document.insertions().len())
                .with_metadata("deletions", document.deletions().len())
                .with_metadata("comments", document.comments.len())
                .with_metadata("embedded_files", embedded),
        )
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn name(&self) -> &str {
        "docx"
    }
}
