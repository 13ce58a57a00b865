//! Error types for content extraction

use thiserror::Error;

/// Errors that can occur while reading an uploaded file
#[derive(Error, Debug)]
pub enum ReadError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Extension not handled by this extractor
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the configured size limit
    #[error("File too large: {0} bytes (max: {1})")]
    FileTooLarge(u64, u64),

    /// The container or its parts could not be decoded
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// PDF text extraction failed
    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(String),
}

impl From<zip::result::ZipError> for ReadError {
    fn from(e: zip::result::ZipError) -> Self {
        ReadError::Malformed(e.to_string())
    }
}

impl From<quick_xml::Error> for ReadError {
    fn from(e: quick_xml::Error) -> Self {
        ReadError::Malformed(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ReadError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ReadError::Malformed(e.to_string())
    }
}
