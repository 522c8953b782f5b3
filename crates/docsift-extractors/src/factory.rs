//! Factory for creating extractors.

use std::sync::Arc;

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::{DocxExtractor, Extractor, XlsxExtractor};

#[cfg(feature = "pdf")]
use crate::tools::{ExternalTools, SystemTools};
#[cfg(feature = "pdf")]
use crate::PdfExtractor;

/// Factory for creating content extractors.
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Create a DOCX extractor.
    pub fn docx() -> Arc<dyn Extractor> {
        Arc::new(DocxExtractor::new())
    }

    /// Create an XLSX extractor.
    pub fn xlsx() -> Arc<dyn Extractor> {
        Arc::new(XlsxExtractor::new())
    }

    /// Create a PDF extractor backed by the given tools.
    #[cfg(feature = "pdf")]
    pub fn pdf(tools: Arc<dyn ExternalTools>) -> Arc<dyn Extractor> {
        Arc::new(PdfExtractor::new(tools))
    }

    /// Create a PDF extractor that runs the binaries named in `config`.
    #[cfg(feature = "pdf")]
    pub fn pdf_with_config(config: &ExtractorConfig) -> Arc<dyn Extractor> {
        Self::pdf(Arc::new(SystemTools::new(config.clone())))
    }

    /// Create extractor for a file extension (with or without the dot).
    #[cfg_attr(not(feature = "pdf"), allow(unused_variables))]
    pub fn for_extension(
        extension: &str,
        config: &ExtractorConfig,
    ) -> ExtractResult<Arc<dyn Extractor>> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "docx" => Ok(Self::docx()),
            "xlsx" => Ok(Self::xlsx()),

            #[cfg(feature = "pdf")]
            "pdf" => Ok(Self::pdf_with_config(config)),

            _ => Err(ExtractError::UnsupportedType(extension.to_string())),
        }
    }

    /// Get all available extractors.
    #[allow(clippy::vec_init_then_push)]
    #[cfg_attr(not(feature = "pdf"), allow(unused_variables))]
    pub fn all(config: &ExtractorConfig) -> Vec<Arc<dyn Extractor>> {
        let mut extractors: Vec<Arc<dyn Extractor>> = Vec::new();

        extractors.push(Self::docx());
        extractors.push(Self::xlsx());

        #[cfg(feature = "pdf")]
        extractors.push(Self::pdf_with_config(config));

        extractors
    }
}
