//! Spreadsheet extractor.

use std::path::Path;

use async_trait::async_trait;

use crate::container::Package;
use crate::error::{ExtractError, ExtractResult};
use crate::spreadsheet;
use crate::types::{ContentSource, ExtractedContent, Modality, SpreadsheetModel};
use crate::Extractor;

/// Open a workbook on disk and read it in full.
pub fn read_workbook_file(path: &Path) -> ExtractResult<SpreadsheetModel> {
    let mut package = Package::open(path)?;
    spreadsheet::read_workbook(&mut package)
}

/// Workbook report for `path`, or the `ERROR:` line that stands in for it.
pub fn workbook_report(path: &Path) -> String {
    let file_name = display_name(path);
    match read_workbook_file(path) {
        Ok(model) => spreadsheet::render(&file_name, &model),
        Err(err) => {
            tracing::warn!(file = %path.display(), "Workbook unreadable: {err}");
            error_line(&err)
        }
    }
}

fn error_line(err: &ExtractError) -> String {
    format!("ERROR: {err}")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Renders shared strings, formulas, charts and a row preview per sheet.
///
/// Any failure while reading the workbook fails the whole file; there is
/// no partial workbook output.
#[derive(Debug, Clone, Default)]
pub struct XlsxExtractor;

impl XlsxExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for XlsxExtractor {
    async fn extract(&self, path: &Path, _out_dir: &Path) -> ExtractResult<ExtractedContent> {
        let owned = path.to_path_buf();
        let model = tokio::task::spawn_blocking(move || read_workbook_file(&owned)).await??;

        let text = spreadsheet::render(&display_name(path), &model);
        Ok(
            ExtractedContent::new(text, Modality::Xlsx, ContentSource::Path(path.to_path_buf()))
                .with_metadata("sheets", model.sheet_names.len())
                .with_metadata("formulas", model.formula_total)
                .with_metadata("shared_strings", model.shared_strings.len())
                .with_metadata("charts", model.chart_parts.len()),
        )
    }

    fn supported_extensions(&self) -> &[&str] {
        &["xlsx"]
    }

    fn name(&self) -> &str {
        "xlsx"
    }

    fn failure_report(&self, err: &ExtractError) -> String {
        error_line(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xlsx_extractor_identity() {
        let extractor = XlsxExtractor::new();
        assert_eq!(extractor.name(), "xlsx");
        assert!(extractor.supports("xlsx"));
        assert!(extractor.supports("XLSX"));
        assert!(!extractor.supports("xlsm"));
    }

    #[test]
    fn test_failure_report_format() {
        let err = ExtractError::Container("not a zip package: invalid Zip archive".into());
        assert_eq!(
            XlsxExtractor::new().failure_report(&err),
            "ERROR: Container error: not a zip package: invalid Zip archive"
        );
    }

    #[tokio::test]
    async fn test_not_a_zip_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"plain text").unwrap();

        let err = XlsxExtractor::new()
            .extract(&path, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Container(_)));
        assert!(workbook_report(&path).starts_with("ERROR: "));
    }
}
