//! Document-wide keyword set

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Ordered, most-salient-first keywords of a whole document.
///
/// Computed once per run and shared read-only by all section work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    /// Wrap an already ranked keyword list
    pub fn new(terms: Vec<String>) -> Self {
        Self(terms)
    }

    /// Borrow the terms in rank order
    pub fn terms(&self) -> &[String] {
        &self.0
    }

    /// Consume into the underlying list
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for KeywordSet {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(terms: Vec<String>) -> Self {
        Self(terms)
    }
}

impl fmt::Display for KeywordSet {
    /// Comma separated, as embedded in structuring prompts
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}
