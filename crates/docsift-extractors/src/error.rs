//! Extraction error types.

use thiserror::Error;

/// Errors that can occur during content extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File extension is not handled by any extractor.
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    /// Archive or compound file could not be opened or read.
    #[error("Container error: {0}")]
    Container(String),

    /// Named entry does not exist in the container.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// An expected XML part is absent from the package.
    #[error("Part missing: {0}")]
    PartMissing(String),

    /// Embedded-object envelope violates the expected layout.
    #[error("Malformed Ole10Native stream: {0}")]
    MalformedOle10Native(String),

    /// XML part is not well formed.
    #[error("XML error in {part}: {message}")]
    Xml {
        /// Package part being parsed.
        part: String,
        /// Parser diagnostic.
        message: String,
    },

    /// External tool exited unsuccessfully or could not be spawned.
    #[error("{tool} failed: {message}")]
    ToolFailed {
        /// Binary that was invoked.
        tool: String,
        /// Exit status and stderr, or the spawn error.
        message: String,
    },

    /// External tool did not finish within the configured timeout.
    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout {
        /// Binary that was invoked.
        tool: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// IO error during extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ExtractError {
    /// Build an XML error for the given part.
    pub fn xml(part: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.into(),
            message: err.to_string(),
        }
    }

    /// How far a failure of this kind is allowed to reach.
    ///
    /// Embedded recovery narrows every kind to [`FailurePolicy::SkipEntry`]
    /// since its scope is a single embeddings entry.
    pub fn policy(&self) -> FailurePolicy {
        match self {
            Self::Container(_) | Self::Io(_) | Self::UnsupportedType(_) | Self::TaskJoin(_) => {
                FailurePolicy::AbortFile
            }
            Self::MalformedOle10Native(_) | Self::EntryNotFound(_) => FailurePolicy::SkipEntry,
            Self::PartMissing(_)
            | Self::Xml { .. }
            | Self::ToolFailed { .. }
            | Self::ToolTimeout { .. } => FailurePolicy::SkipSection,
        }
    }
}

/// Scope of the damage a failure is allowed to cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop one embedded entry, keep recovering its siblings.
    SkipEntry,
    /// Replace one report section with a bracketed diagnostic.
    SkipSection,
    /// Give up on the whole input file.
    AbortFile,
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
