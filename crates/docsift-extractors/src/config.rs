//! Extraction configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output caps for review reports.
///
/// These bound the size of a report a human has to read. Anything past a
/// cap is summarised with an `... and N more` line rather than dropped
/// silently.
pub mod limits {
    /// Insertions listed in the track-changes section.
    pub const MAX_INSERTIONS: usize = 50;
    /// Deletions listed in the track-changes section.
    pub const MAX_DELETIONS: usize = 50;
    /// Comments listed in the comments section.
    pub const MAX_COMMENTS: usize = 30;
    /// Formulas listed per workbook.
    pub const MAX_FORMULAS: usize = 200;
    /// Distinct shared strings listed per workbook.
    pub const MAX_UNIQUE_STRINGS: usize = 200;
    /// Rows previewed per sheet.
    pub const MAX_SHEET_ROWS: usize = 40;
    /// Characters of comment text spliced inline into the body.
    pub const COMMENT_PREVIEW_CHARS: usize = 50;
    /// Characters shown per insertion or deletion.
    pub const REVISION_TEXT_CHARS: usize = 200;
    /// Characters shown per comment.
    pub const COMMENT_TEXT_CHARS: usize = 300;
    /// Below this many non-whitespace characters a PDF is treated as scanned.
    pub const SCANNED_PDF_MIN_CHARS: usize = 200;
}

/// Settings for the external tools and batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// `pdftotext` binary.
    pub pdftotext: String,
    /// `pdftoppm` binary.
    pub pdftoppm: String,
    /// `tesseract` binary.
    pub tesseract: String,
    /// Upper bound on a single tool invocation.
    #[serde(with = "duration_secs")]
    pub tool_timeout: Duration,
    /// Resolution of page images fed to OCR.
    pub ocr_dpi: u32,
    /// Files processed at once in a batch.
    pub concurrency: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            pdftotext: "pdftotext".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            tesseract: "tesseract".to_string(),
            tool_timeout: Duration::from_secs(120),
            ocr_dpi: 200,
            concurrency: 1,
        }
    }
}

impl ExtractorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bin) = std::env::var("DOCSIFT_PDFTOTEXT") {
            config.pdftotext = bin;
        }

        if let Ok(bin) = std::env::var("DOCSIFT_PDFTOPPM") {
            config.pdftoppm = bin;
        }

        if let Ok(bin) = std::env::var("DOCSIFT_TESSERACT") {
            config.tesseract = bin;
        }

        if let Ok(secs) = std::env::var("DOCSIFT_TOOL_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.tool_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(dpi) = std::env::var("DOCSIFT_OCR_DPI") {
            if let Ok(dpi) = dpi.parse() {
                config.ocr_dpi = dpi;
            }
        }

        if let Ok(jobs) = std::env::var("DOCSIFT_JOBS") {
            if let Ok(jobs) = jobs.parse::<usize>() {
                config.concurrency = jobs.max(1);
            }
        }

        config
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
