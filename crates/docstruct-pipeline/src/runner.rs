//! Whole-document runs and their progress stream

use crate::archive::{ArchiveBuilder, ArchiveStore};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::keywords::KeywordExtractor;
use crate::metrics::PipelineMetrics;
use crate::section::{ErrorCollector, SectionProcessor};
use crate::segmenter::Segmenter;
use chrono::Local;
use docstruct_domain::{
    Document, KeywordSet, ProgressEvent, RunId, RunMetadata, Section, StructuringService,
};
use futures::stream::{self, Stream, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, info_span, Instrument};

/// Events buffered between a run and its consumer
const PROGRESS_BUFFER: usize = 4;

/// The events of one run, in order, ending with `Completed` or `FatalError`
///
/// Dropping the stream cancels the run: no further sections are started,
/// in-flight calls are abandoned and the working directory is removed.
#[derive(Debug)]
pub struct ProgressStream {
    inner: ReceiverStream<ProgressEvent>,
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// A document split into sections, before any structuring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Name of the uploaded file
    pub original_filename: String,
    /// Section texts in order
    pub parsed_sections: Vec<String>,
    /// Document-wide keywords
    pub keywords: Vec<String>,
}

enum RunInput {
    Document(Document),
    Sections {
        original_file: String,
        sections: Vec<String>,
        keywords: KeywordSet,
    },
}

impl RunInput {
    fn original_file(&self) -> &str {
        match self {
            RunInput::Document(document) => &document.original_file,
            RunInput::Sections { original_file, .. } => original_file,
        }
    }
}

enum RunOutcome {
    Completed {
        archive_id: String,
        errors: Vec<String>,
    },
    Cancelled,
}

/// Drives documents through segmentation, structuring and archival
pub struct PipelineRunner<S> {
    inner: Arc<RunnerInner<S>>,
}

impl<S> Clone for PipelineRunner<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct RunnerInner<S> {
    processor: Arc<SectionProcessor<S>>,
    segmenter: Segmenter,
    keywords: KeywordExtractor,
    config: PipelineConfig,
    store: ArchiveStore,
    metrics: PipelineMetrics,
}

impl<S> PipelineRunner<S>
where
    S: StructuringService + 'static,
{
    /// Create a runner with its own metrics
    pub fn new(service: S, config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_metrics(service, config, PipelineMetrics::new())
    }

    /// Create a runner reporting into shared metrics
    ///
    /// Validates the configuration and creates the archive directory.
    pub fn with_metrics(
        service: S,
        config: PipelineConfig,
        metrics: PipelineMetrics,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        let store = ArchiveStore::open(&config.archive_dir)?;

        let processor = SectionProcessor::new(Arc::new(service), &config, metrics.clone());
        Ok(Self {
            inner: Arc::new(RunnerInner {
                processor: Arc::new(processor),
                segmenter: Segmenter::new(config.segment_window_tokens),
                keywords: KeywordExtractor::new(config.keyword_language),
                config,
                store,
                metrics,
            }),
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Shared counters
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.inner.metrics
    }

    /// Where finalized archives are kept
    pub fn archives(&self) -> &ArchiveStore {
        &self.inner.store
    }

    /// Segment a document and extract its keywords without structuring it
    pub fn parse(&self, document: &Document) -> Result<ParsedDocument, PipelineError> {
        if document.is_blank() {
            return Err(PipelineError::EmptyDocument);
        }
        Ok(ParsedDocument {
            original_filename: document.original_file.clone(),
            parsed_sections: self.inner.segmenter.segment(&document.text),
            keywords: self
                .inner
                .keywords
                .extract(&document.text, self.inner.config.keyword_top_k),
        })
    }

    /// Start a full run over a document
    ///
    /// Must be called from within a Tokio runtime. The run proceeds in a
    /// background task and reports through the returned stream.
    pub fn run(&self, document: Document) -> ProgressStream {
        self.spawn(RunInput::Document(document))
    }

    /// Start a run over sections that were segmented earlier (see [`Self::parse`])
    pub fn run_sections(
        &self,
        original_file: impl Into<String>,
        sections: Vec<String>,
        keywords: Vec<String>,
    ) -> ProgressStream {
        self.spawn(RunInput::Sections {
            original_file: original_file.into(),
            sections,
            keywords: KeywordSet::new(keywords),
        })
    }

    fn spawn(&self, input: RunInput) -> ProgressStream {
        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id, file = %input.original_file());

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.drive(input, tx).instrument(span));

        ProgressStream {
            inner: ReceiverStream::new(rx),
        }
    }
}

impl<S> RunnerInner<S>
where
    S: StructuringService + 'static,
{
    /// Run to the end and report exactly one terminal event
    async fn drive(self: Arc<Self>, input: RunInput, tx: mpsc::Sender<ProgressEvent>) {
        self.metrics.record_run_started();

        let outcome = AssertUnwindSafe(self.execute(input, &tx))
            .catch_unwind()
            .await;

        let fatal = match outcome {
            Ok(Ok(RunOutcome::Completed { archive_id, errors })) => {
                self.metrics.record_run_completed();
                info!("Run completed: {} ({} section errors)", archive_id, errors.len());
                let _ = tx
                    .send(ProgressEvent::Completed { archive_id, errors })
                    .await;
                return;
            }
            Ok(Ok(RunOutcome::Cancelled)) => {
                self.metrics.record_run_cancelled();
                info!("Run cancelled by consumer");
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => PipelineError::Internal(panic_message(panic.as_ref())).to_string(),
        };

        self.metrics.record_run_failed();
        error!("Run failed: {}", fatal);
        let _ = tx.send(ProgressEvent::FatalError { message: fatal }).await;
    }

    async fn execute(
        &self,
        input: RunInput,
        tx: &mpsc::Sender<ProgressEvent>,
    ) -> Result<RunOutcome, PipelineError> {
        let (original_file, sections, keywords) = self.prepare(input)?;
        let total = sections.len();
        info!("Processing {} sections (keywords: {})", total, keywords);

        // Removed on every exit path when dropped
        let work_dir = tempfile::Builder::new().prefix("docstruct-run-").tempdir()?;
        let builder = ArchiveBuilder::new(work_dir.path(), total);
        let errors = ErrorCollector::new();
        let keywords = Arc::new(keywords);

        let mut records = stream::iter(sections)
            .map(|section| {
                let processor = Arc::clone(&self.processor);
                let keywords = Arc::clone(&keywords);
                let errors = errors.clone();
                async move { processor.process(&section, &keywords, &errors).await }
            })
            .buffered(self.config.concurrency);

        let mut handles = Vec::with_capacity(total + 1);
        loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => return Ok(RunOutcome::Cancelled),
                next = records.next() => next,
            };
            let Some(outcome) = next else { break };

            let number = outcome.record.section_number;
            handles.push(builder.write(&outcome.record)?);
            self.metrics.record_section(outcome.degraded);
            debug!("Section {}/{} written", number, total);

            if tx
                .send(ProgressEvent::Progress { index: number, total })
                .await
                .is_err()
            {
                return Ok(RunOutcome::Cancelled);
            }
            for message in errors.messages_for(number) {
                if tx.send(ProgressEvent::SectionError { message }).await.is_err() {
                    return Ok(RunOutcome::Cancelled);
                }
            }
        }
        drop(records);

        if handles.is_empty() {
            return Err(PipelineError::NoRecords);
        }

        let errors = errors.messages();
        let metadata = RunMetadata {
            original_file,
            total_sections: total,
            processed_sections: handles.len(),
            global_keywords: keywords.terms().to_vec(),
            processed_date: Local::now().to_rfc3339(),
            errors: errors.clone(),
        };
        handles.push(builder.write_metadata(&metadata)?);

        let store = self.store.clone();
        let archive_id = tokio::task::spawn_blocking(move || builder.finalize(&handles, &store))
            .await
            .map_err(|e| PipelineError::Internal(format!("archive task failed: {}", e)))??;

        Ok(RunOutcome::Completed { archive_id, errors })
    }

    fn prepare(&self, input: RunInput) -> Result<(String, Vec<Section>, KeywordSet), PipelineError> {
        match input {
            RunInput::Document(document) => {
                if document.is_blank() {
                    return Err(PipelineError::EmptyDocument);
                }
                let pieces = self.segmenter.segment(&document.text);
                if pieces.is_empty() {
                    return Err(PipelineError::NoSections);
                }
                let keywords = self
                    .keywords
                    .extract(&document.text, self.config.keyword_top_k);
                Ok((
                    document.original_file,
                    Section::numbered(pieces),
                    KeywordSet::new(keywords),
                ))
            }
            RunInput::Sections {
                original_file,
                sections,
                keywords,
            } => {
                if sections.is_empty() {
                    return Err(PipelineError::NoSections);
                }
                Ok((original_file, Section::numbered(sections), keywords))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "run task panicked".to_string()
    }
}
