//! Error types for the pipeline

use thiserror::Error;

/// Failures while writing, bundling or retrieving archives.
///
/// Always fatal for a run: a partially written archive is worse than none.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Compression container error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Record serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Identifier that cannot name an archive in the store
    #[error("Invalid archive id: {0}")]
    InvalidId(String),

    /// No archive with this identifier
    #[error("Archive not found: {0}")]
    NotFound(String),
}

/// Run-level failures; each ends a run with a single `FatalError` event
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Document has no text to process
    #[error("Document is empty or could not be read")]
    EmptyDocument,

    /// Segmentation produced nothing
    #[error("No sections to process")]
    NoSections,

    /// Section processing finished without a single record
    #[error("No section records were produced")]
    NoRecords,

    /// Storage or archival failure
    #[error("Storage error: {0}")]
    Archive(#[from] ArchiveError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline task failed unexpectedly
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Archive(ArchiveError::Io(e))
    }
}
