//! Core types for content extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Format of the submitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Word-processing package.
    Docx,
    /// Spreadsheet package.
    Xlsx,
    /// PDF document.
    Pdf,
}

/// Source reference for original content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSource {
    /// Content read from a file on disk.
    Path(PathBuf),
}

/// Whether a tracked change added or removed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Insertion,
    Deletion,
}

/// One tracked change, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    /// Author attribute, `"Unknown"` when absent.
    pub author: String,
    /// Date attribute as written in the part; never parsed.
    pub date: String,
    pub text: String,
    pub kind: RevisionKind,
}

/// A reviewer comment from `word/comments.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub date: String,
    pub text: String,
}

/// A file recovered from an `Ole10Native` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPayload {
    /// Filename recorded in the envelope, if any.
    pub original_filename: Option<String>,
    pub bytes: Vec<u8>,
    /// Package entry the payload was recovered from.
    pub source_entry: String,
}

/// Everything read out of one spreadsheet package.
///
/// Rows, formulas and unique strings are capped at render time, see
/// [`crate::config::limits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetModel {
    /// Shared-string table; a cell's index is a position in this list.
    pub shared_strings: Vec<String>,
    /// Sheet names in workbook declaration order.
    pub sheet_names: Vec<String>,
    /// Non-empty rows per sheet, at most `MAX_SHEET_ROWS` each.
    pub sheet_rows: HashMap<String, Vec<Vec<String>>>,
    /// Non-empty rows seen per sheet, including those past the cap.
    pub sheet_row_totals: HashMap<String, usize>,
    /// Formula text in the order encountered, at most `MAX_FORMULAS`.
    pub formulas: Vec<String>,
    /// Formulas seen across the workbook, including those past the cap.
    pub formula_total: usize,
    /// Chart part names present in the package.
    pub chart_parts: Vec<String>,
}

impl SpreadsheetModel {
    /// Resolve a shared-string reference; anything out of range is empty.
    pub fn shared_string(&self, raw_index: &str) -> &str {
        raw_index
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| self.shared_strings.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Extracted report with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Rendered review report.
    pub text: String,

    /// Original content modality.
    pub modality: Modality,

    /// Reference to original content.
    pub source: ContentSource,

    /// Additional metadata (format-specific).
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExtractedContent {
    /// Create new extracted content.
    pub fn new(text: String, modality: Modality, source: ContentSource) -> Self {
        Self {
            text,
            modality,
            source,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if extraction produced meaningful content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Get content length.
    pub fn len(&self) -> usize {
        self.text.len()
    }
}
