//! Structured output records

use serde::{Deserialize, Serialize};

/// Title used when a structuring response omits one
pub const UNTITLED_SECTION: &str = "Untitled Section";

/// Prefix of the title of every fallback record
pub const ERROR_TITLE_PREFIX: &str = "Error:";

/// The structured form of one section.
///
/// Every section yields exactly one record, either from the structuring
/// service or synthesized after a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// Short heading for the section
    pub title: String,

    /// Main content
    pub body: String,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// 1-based index of the section this record was produced from
    pub section_number: usize,
}

impl StructuredRecord {
    /// Create a record
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
        section_number: usize,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags,
            section_number,
        }
    }

    /// Synthesize a degraded record whose title names the failure class
    ///
    /// # Examples
    ///
    /// ```
    /// use docstruct_domain::StructuredRecord;
    ///
    /// let record = StructuredRecord::fallback("Timeout", "no answer after 3 attempts", 4);
    /// assert_eq!(record.title, "Error: Timeout");
    /// assert!(record.tags.is_empty());
    /// ```
    pub fn fallback(class: &str, diagnostic: impl Into<String>, section_number: usize) -> Self {
        Self {
            title: format!("{} {}", ERROR_TITLE_PREFIX, class),
            body: diagnostic.into(),
            tags: Vec::new(),
            section_number,
        }
    }
}

/// Run-level summary stored alongside the section records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Name of the uploaded file
    pub original_file: String,

    /// Number of sections the document was split into
    pub total_sections: usize,

    /// Number of section records written (degraded ones included)
    pub processed_sections: usize,

    /// Document-wide keywords sent with every section
    pub global_keywords: Vec<String>,

    /// RFC 3339 timestamp of when the run finished
    pub processed_date: String,

    /// One message per degraded section, in section order
    #[serde(default)]
    pub errors: Vec<String>,
}
