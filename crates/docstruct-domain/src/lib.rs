//! docstruct Domain Layer
//!
//! Value types shared by every layer of the document-structuring pipeline,
//! plus the trait seams for the collaborators the pipeline drives but does
//! not implement.
//!
//! ## Key Concepts
//!
//! - **Document**: extracted plain text and the name of the uploaded file
//! - **Section**: a 1-indexed, immutable slice of a document; the unit of work
//! - **KeywordSet**: document-wide salient terms, shared read-only by a run
//! - **StructuredRecord**: `{title, body, tags, section_number}`, one per section
//! - **RunMetadata**: the summary written next to the section records
//! - **ProgressEvent**: the incremental protocol reported to the caller
//!
//! ## Architecture
//!
//! No I/O lives here. Providers (`docstruct-llm`), file readers
//! (`docstruct-ingest`) and the pipeline itself (`docstruct-pipeline`)
//! depend on this crate, never the other way round.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod keywords;
pub mod progress;
pub mod record;
pub mod run;
pub mod traits;

// Re-exports for convenience
pub use document::{Document, Section};
pub use keywords::KeywordSet;
pub use progress::ProgressEvent;
pub use record::{RunMetadata, StructuredRecord, ERROR_TITLE_PREFIX, UNTITLED_SECTION};
pub use run::RunId;
pub use traits::{ContentExtractor, ServiceFailure, StructuringService};
