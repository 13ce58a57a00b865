//! Turning one section into exactly one record

use crate::config::PipelineConfig;
use crate::metrics::PipelineMetrics;
use crate::parser::{parse_response, ParsedFields};
use crate::retry::{CallError, RetryingInvoker};
use docstruct_domain::{
    KeywordSet, Section, ServiceFailure, StructuredRecord, StructuringService, UNTITLED_SECTION,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Body used when a response has no body and raw echoing is off
const MISSING_BODY: &str = "No content was returned for this section.";

/// Per-run list of section failures, safe to share between section tasks
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    entries: Arc<Mutex<Vec<(usize, String)>>>,
}

impl ErrorCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for a section; the message is prefixed with its number
    pub fn report(&self, section_number: usize, detail: impl std::fmt::Display) {
        let message = format!("Section {}: {}", section_number, detail);
        self.lock().push((section_number, message));
    }

    /// Messages recorded for one section, in report order
    pub fn messages_for(&self, section_number: usize) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(n, _)| *n == section_number)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing failed
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All messages ordered by section number
    pub fn messages(&self) -> Vec<String> {
        let mut entries = self.lock().clone();
        entries.sort_by_key(|(n, _)| *n);
        entries.into_iter().map(|(_, m)| m).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(usize, String)>> {
        // A poisoned list is still a valid list of strings
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The record produced for one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOutcome {
    /// Record to archive
    pub record: StructuredRecord,
    /// Set when `record` is a fallback synthesized from a failure
    pub degraded: bool,
}

impl SectionOutcome {
    fn structured(record: StructuredRecord) -> Self {
        Self {
            record,
            degraded: false,
        }
    }

    fn fallback(record: StructuredRecord) -> Self {
        Self {
            record,
            degraded: true,
        }
    }
}

/// Structures single sections; never fails
#[derive(Debug)]
pub struct SectionProcessor<S> {
    service: Arc<S>,
    invoker: RetryingInvoker,
    call_timeout: Duration,
    echo_raw_response: bool,
    metrics: PipelineMetrics,
}

impl<S: StructuringService> SectionProcessor<S> {
    /// Create a processor around a structuring service
    pub fn new(service: Arc<S>, config: &PipelineConfig, metrics: PipelineMetrics) -> Self {
        Self {
            service,
            invoker: RetryingInvoker::new(config.retry.clone(), metrics.clone()),
            call_timeout: config.call_timeout(),
            echo_raw_response: config.echo_raw_response,
            metrics,
        }
    }

    /// Produce the record for `section`
    ///
    /// Service failures (after retries) and unreadable responses yield a
    /// fallback record titled `Error: <class>`, marked degraded, and one
    /// entry in `errors`. A title alone never marks a record degraded.
    pub async fn process(
        &self,
        section: &Section,
        keywords: &KeywordSet,
        errors: &ErrorCollector,
    ) -> SectionOutcome {
        let number = section.number();
        let response = self
            .invoker
            .invoke(|| self.call(section.text(), keywords))
            .await;

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                let attempts = self.invoker.config().max_attempts;
                warn!("Section {} failed: {}", number, e);
                let detail = if e.is_retryable() {
                    format!("{} (gave up after {} attempts)", e, attempts)
                } else {
                    e.to_string()
                };
                errors.report(number, &detail);
                let record = StructuredRecord::fallback(e.class(), detail, number);
                return SectionOutcome::fallback(record);
            }
        };

        match parse_response(&raw) {
            Ok(fields) => SectionOutcome::structured(self.complete(fields, &raw, number)),
            Err(e) => {
                warn!("Section {} returned an unusable response: {}", number, e);
                errors.report(number, &e);
                let diagnostic = if self.echo_raw_response {
                    format!("{}\n\nRaw response:\n{}", e, raw)
                } else {
                    e.to_string()
                };
                let record = StructuredRecord::fallback(e.class(), diagnostic, number);
                SectionOutcome::fallback(record)
            }
        }
    }

    async fn call(
        &self,
        section_text: &str,
        keywords: &KeywordSet,
    ) -> Result<String, CallError<S::Error>> {
        self.metrics.record_call();
        match tokio::time::timeout(self.call_timeout, self.service.structure(section_text, keywords))
            .await
        {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => Err(CallError::Service(e)),
            Err(_) => Err(CallError::TimedOut(self.call_timeout)),
        }
    }

    /// Fill fields the response left out
    fn complete(&self, fields: ParsedFields, raw: &str, number: usize) -> StructuredRecord {
        let missing = fields.missing();
        if !missing.is_empty() {
            debug!("Section {} response lacks {:?}, using defaults", number, missing);
        }

        let body = fields.body.unwrap_or_else(|| {
            if self.echo_raw_response {
                raw.trim().to_string()
            } else {
                MISSING_BODY.to_string()
            }
        });

        StructuredRecord::new(
            fields.title.unwrap_or_else(|| UNTITLED_SECTION.to_string()),
            body,
            fields.tags.unwrap_or_default(),
            number,
        )
    }
}
