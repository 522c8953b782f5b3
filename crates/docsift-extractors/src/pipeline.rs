//! Extraction pipeline: routes files to extractors and writes reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::types::ExtractedContent;
use crate::Extractor;

/// Outcome of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    pub input: PathBuf,
    /// The `.txt` report that was written.
    pub output: PathBuf,
    /// Why extraction aborted; the report then holds a placeholder.
    pub error: Option<String>,
}

/// Counts for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Recognised input files.
    pub total: usize,
    /// Files whose full report was written.
    pub written: usize,
    /// Files that aborted or whose report could not be written.
    pub failed: usize,
}

impl BatchStats {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Pipeline for extracting content using registered extractors.
///
/// Routes each file by its extension, case-insensitively.
pub struct ExtractionPipeline {
    extractors: Vec<Arc<dyn Extractor>>,
    concurrency: usize,
}

impl ExtractionPipeline {
    /// Create new empty pipeline.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
            concurrency: 1,
        }
    }

    /// Create pipeline with all available extractors.
    pub fn with_defaults() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }

    /// Create pipeline with all available extractors, configured.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            extractors: crate::ExtractorFactory::all(config),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Add an extractor to the pipeline.
    pub fn add_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Number of files processed at once by [`Self::process_path`].
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Extractor for the file at `path`, judged by its extension.
    pub fn extractor_for(&self, path: &Path) -> Option<&Arc<dyn Extractor>> {
        let extension = path.extension()?.to_str()?;
        self.extractors.iter().find(|e| e.supports(extension))
    }

    /// Extract a single file with the appropriate extractor.
    pub async fn extract(&self, path: &Path, out_dir: &Path) -> ExtractResult<ExtractedContent> {
        match self.extractor_for(path) {
            Some(extractor) => extractor.extract(path, out_dir).await,
            None => Err(unsupported(path)),
        }
    }

    /// Extract one file and write `<file name>.txt` into `out_dir`.
    ///
    /// An extraction failure still writes a report, holding the
    /// extractor's placeholder text; only an unsupported extension or a
    /// failed write is returned as an error.
    pub async fn process_file(&self, path: &Path, out_dir: &Path) -> ExtractResult<ProcessedFile> {
        let extractor = self.extractor_for(path).ok_or_else(|| unsupported(path))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| unsupported(path))?
            .to_string_lossy();
        let output = out_dir.join(format!("{file_name}.txt"));

        debug!(file = %path.display(), extractor = extractor.name(), "Extracting");
        let (text, error) = match extractor.extract(path, out_dir).await {
            Ok(content) => (content.text, None),
            Err(err) => {
                error!(file = %path.display(), policy = ?err.policy(), "Extraction aborted: {err}");
                (extractor.failure_report(&err), Some(err.to_string()))
            }
        };

        tokio::fs::write(&output, text.as_bytes()).await?;
        info!(file = %path.display(), output = %output.display(), "Wrote report");

        Ok(ProcessedFile {
            input: path.to_path_buf(),
            output,
            error,
        })
    }

    /// Process one file, or every recognised file directly inside a
    /// directory, writing reports into `out_dir`.
    pub async fn process_path(&self, input: &Path, out_dir: &Path) -> ExtractResult<BatchStats> {
        let files = self.collect_inputs(input).await?;
        tokio::fs::create_dir_all(out_dir).await?;
        info!(files = files.len(), concurrency = self.concurrency, "Processing batch");

        let results: Vec<ExtractResult<ProcessedFile>> = stream::iter(files.iter())
            .map(|file| self.process_file(file, out_dir))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut stats = BatchStats {
            total: files.len(),
            ..Default::default()
        };
        for result in results {
            match result {
                Ok(processed) if processed.error.is_none() => stats.written += 1,
                Ok(_) => stats.failed += 1,
                Err(err) => {
                    error!("Could not write report: {err}");
                    stats.failed += 1;
                }
            }
        }

        info!(
            total = stats.total,
            written = stats.written,
            failed = stats.failed,
            "Batch complete"
        );
        Ok(stats)
    }

    /// Inputs for [`Self::process_path`], sorted by name.
    ///
    /// Directories are not descended into; unrecognised files inside a
    /// directory are ignored.
    pub async fn collect_inputs(&self, input: &Path) -> ExtractResult<Vec<PathBuf>> {
        let metadata = tokio::fs::metadata(input).await?;
        if !metadata.is_dir() {
            if self.extractor_for(input).is_none() {
                return Err(unsupported(input));
            }
            return Ok(vec![input.to_path_buf()]);
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(input).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && self.extractor_for(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Check if pipeline can handle a given extension.
    pub fn supports(&self, extension: &str) -> bool {
        self.extractors.iter().any(|e| e.supports(extension))
    }

    /// List all supported extensions.
    pub fn supported_extensions(&self) -> Vec<&str> {
        self.extractors
            .iter()
            .flat_map(|e| e.supported_extensions().iter().copied())
            .collect()
    }

    /// Get the number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check if the pipeline has no registered extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn unsupported(path: &Path) -> ExtractError {
    ExtractError::UnsupportedType(path.display().to_string())
}
