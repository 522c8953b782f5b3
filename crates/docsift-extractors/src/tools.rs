//! External command-line tools used on the PDF path.
//!
//! The extractor talks to [`ExternalTools`] only, so tests can swap in a
//! fake and never spawn `pdftotext`, `pdftoppm` or `tesseract`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, ExtractResult};

/// Text extraction, page rendering and OCR.
#[async_trait]
pub trait ExternalTools: Send + Sync {
    /// Text layer of a PDF.
    async fn pdf_to_text(&self, pdf: &Path) -> ExtractResult<String>;

    /// Render every page of `pdf` to PNG files named `<prefix>-<n>.png`
    /// in `dir`, returned in page order.
    async fn render_pages(&self, pdf: &Path, dir: &Path, prefix: &str)
        -> ExtractResult<Vec<PathBuf>>;

    /// Recognised text of one page image.
    async fn ocr_image(&self, png: &Path) -> ExtractResult<String>;
}

/// Runs the real binaries named in [`ExtractorConfig`].
#[derive(Debug, Clone)]
pub struct SystemTools {
    config: ExtractorConfig,
}

impl SystemTools {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Run `binary` to completion and return its stdout.
    async fn run<I, S>(&self, binary: &str, args: I) -> ExtractResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(tool = binary, "Running external tool");
        let output = run_with_timeout(binary, cmd.output(), self.config.tool_timeout)
            .await?
            .map_err(|e| ExtractError::ToolFailed {
                tool: binary.to_string(),
                message: format!("failed to execute: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::ToolFailed {
                tool: binary.to_string(),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

async fn run_with_timeout<F, T>(tool: &str, fut: F, limit: Duration) -> ExtractResult<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ExtractError::ToolTimeout {
            tool: tool.to_string(),
            seconds: limit.as_secs(),
        })
}

#[async_trait]
impl ExternalTools for SystemTools {
    async fn pdf_to_text(&self, pdf: &Path) -> ExtractResult<String> {
        self.run(
            &self.config.pdftotext,
            [pdf.as_os_str(), OsStr::new("-")],
        )
        .await
    }

    async fn render_pages(
        &self,
        pdf: &Path,
        dir: &Path,
        prefix: &str,
    ) -> ExtractResult<Vec<PathBuf>> {
        let dpi = self.config.ocr_dpi.to_string();
        let root = dir.join(prefix);
        self.run(
            &self.config.pdftoppm,
            [
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                pdf.as_os_str(),
                root.as_os_str(),
            ],
        )
        .await?;

        page_images(dir, prefix)
    }

    async fn ocr_image(&self, png: &Path) -> ExtractResult<String> {
        self.run(
            &self.config.tesseract,
            [png.as_os_str(), OsStr::new("stdout")],
        )
        .await
    }
}

/// PNG files `<prefix>-<n>.png` in `dir`, ordered by page number.
///
/// `pdftoppm` zero-pads `n` to the width of the page count, so the number
/// is compared numerically rather than as text.
pub fn page_images(dir: &Path, prefix: &str) -> ExtractResult<Vec<PathBuf>> {
    let mut pages: Vec<(u64, PathBuf)> = Vec::new();
    let head = format!("{prefix}-");

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        let page = name
            .strip_prefix(&head)
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(page) = page {
            pages.push((page, path));
        }
    }

    pages.sort_by_key(|(page, _)| *page);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Availability of one external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    /// Role of the tool, e.g. `pdftotext`.
    pub tool: &'static str,
    /// Binary looked up on `PATH`.
    pub binary: String,
    /// Resolved location, `None` when not found.
    pub path: Option<PathBuf>,
    /// What the tool is used for.
    pub purpose: &'static str,
}

impl ToolStatus {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// Look up every external tool the PDF path relies on.
pub fn check_dependencies(config: &ExtractorConfig) -> Vec<ToolStatus> {
    [
        ("pdftotext", &config.pdftotext, "PDF text extraction"),
        ("pdftoppm", &config.pdftoppm, "PDF page rendering for OCR"),
        ("tesseract", &config.tesseract, "OCR of scanned PDF pages"),
    ]
    .into_iter()
    .map(|(tool, binary, purpose)| ToolStatus {
        tool,
        binary: binary.clone(),
        path: which::which(binary).ok(),
        purpose,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_images_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "other-3.png", "page-x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = page_images(dir.path(), "page").unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn test_page_images_zero_padded() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-02.png", "page-01.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = page_images(dir.path(), "page").unwrap();
        assert!(pages[0].ends_with("page-01.png"));
        assert!(pages[1].ends_with("page-02.png"));
    }

    #[test]
    fn test_check_dependencies_reports_missing() {
        let config = ExtractorConfig {
            tesseract: "docsift-no-such-binary".to_string(),
            ..Default::default()
        };

        let statuses = check_dependencies(&config);
        assert_eq!(statuses.len(), 3);
        let tesseract = statuses.iter().find(|s| s.tool == "tesseract").unwrap();
        assert!(!tesseract.found());
        assert_eq!(tesseract.binary, "docsift-no-such-binary");
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_failure() {
        let tools = SystemTools::new(ExtractorConfig {
            pdftotext: "docsift-no-such-binary".to_string(),
            ..Default::default()
        });

        let err = tokio_test::assert_err!(tools.pdf_to_text(Path::new("x.pdf")).await);
        assert!(matches!(err, ExtractError::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_tool_timeout() {
        let err = run_with_timeout(
            "sleepy",
            tokio::time::sleep(Duration::from_secs(5)),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::ToolTimeout { ref tool, .. } if tool == "sleepy"));
    }
}
