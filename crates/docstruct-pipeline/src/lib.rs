//! docstruct Pipeline
//!
//! Turns a document into an archive of structured section records.
//!
//! # Overview
//!
//! A run segments the document, extracts document-wide keywords, asks a
//! [`StructuringService`](docstruct_domain::StructuringService) to structure
//! every section (with bounded retries), writes one record per section plus a
//! metadata summary, and bundles everything into a zip archive. Progress is
//! reported incrementally as a stream of
//! [`ProgressEvent`](docstruct_domain::ProgressEvent)s.
//!
//! # Architecture
//!
//! ```text
//! Document → Segmenter → Sections ─┐
//!          → KeywordExtractor ─────┤
//!                                  ▼
//!            SectionProcessor (RetryingInvoker → StructuringService)
//!                                  ▼
//!            ArchiveBuilder → structured_data_*.zip
//! ```
//!
//! # Guarantees
//!
//! - Every section yields exactly one record; failures degrade to a
//!   fallback record titled `Error: <class>` instead of aborting the run
//! - Progress is reported in section order, also with `concurrency > 1`
//! - Every run ends with exactly one `Completed` or `FatalError` event,
//!   unless the consumer drops the stream first (which cancels the run)
//!
//! # Example Usage
//!
//! ```no_run
//! use docstruct_domain::{Document, ProgressEvent};
//! use docstruct_llm::MockProvider;
//! use docstruct_pipeline::{PipelineConfig, PipelineRunner};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = PipelineRunner::new(MockProvider::echo(), PipelineConfig::default())?;
//!
//! let mut events = runner.run(Document::new("# Intro\nHello\n# Usage\nRun it", "notes.txt"));
//! while let Some(event) = events.next().await {
//!     if let ProgressEvent::Completed { archive_id, .. } = event {
//!         println!("Archive ready: {}", archive_id);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod archive;
mod config;
mod error;
mod keywords;
mod metrics;
mod parser;
mod retry;
mod runner;
mod section;
mod segmenter;
mod stopwords;


pub use archive::{
    section_file_name, ArchiveBuilder, ArchiveStore, FileHandle, METADATA_FILE_NAME,
};
pub use config::{KeywordLanguage, PipelineConfig, RetryConfig};
pub use error::{ArchiveError, PipelineError};
pub use keywords::KeywordExtractor;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use parser::{parse_response, ParsedFields, ResponseError};
pub use retry::{CallError, RetryingInvoker};
pub use runner::{ParsedDocument, PipelineRunner, ProgressStream};
pub use section::{ErrorCollector, SectionOutcome, SectionProcessor};
pub use segmenter::{starts_with_heading, Segmenter};
