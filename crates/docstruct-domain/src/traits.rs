//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and the
//! capabilities it consumes. Implementations live in other crates.

use crate::KeywordSet;
use std::future::Future;
use std::path::Path;

/// Classification every structuring error must expose
pub trait ServiceFailure: std::error::Error + Send + Sync + 'static {
    /// Whether a later attempt could succeed (timeouts, rate limits, 5xx)
    fn is_retryable(&self) -> bool;

    /// Short failure class used in fallback titles, e.g. "Rate Limit"
    fn class(&self) -> &'static str;
}

/// Turns one section of text into a raw, untrusted structuring response
///
/// Implemented by the infrastructure layer (docstruct-llm)
pub trait StructuringService: Send + Sync {
    /// Error type for structuring calls
    type Error: ServiceFailure;

    /// Structure `section_text`, guided by the document-wide keywords.
    ///
    /// The returned string is expected to hold a JSON object with `title`,
    /// `body` and `tags`, but callers must treat it as untrusted.
    fn structure(
        &self,
        section_text: &str,
        keywords: &KeywordSet,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Reads an uploaded file into plain text
///
/// Implemented by the infrastructure layer (docstruct-ingest)
pub trait ContentExtractor {
    /// Error type for read failures
    type Error;

    /// Extract plain text from the file at `path`, dispatching on its extension
    fn extract(&self, path: &Path) -> Result<String, Self::Error>;

    /// File extensions (lower case, without dot) this extractor understands
    fn supported_extensions(&self) -> &[&str];
}
