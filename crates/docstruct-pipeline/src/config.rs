//! Configuration for the pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Stop-word language used by keyword extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordLanguage {
    /// English stop words
    #[default]
    English,
    /// Norwegian (bokmål and nynorsk) stop words
    Norwegian,
}

/// Bounded retry with clamped exponential backoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Delay before the first retry, doubled for each further retry
    pub base_delay_ms: u64,

    /// Lower clamp for any delay
    pub min_delay_ms: u64,

    /// Upper clamp for any delay
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use docstruct_pipeline::RetryConfig;
    /// use std::time::Duration;
    ///
    /// let retry = RetryConfig::default();
    /// assert_eq!(retry.delay_after(1), Duration::from_secs(4));
    /// assert_eq!(retry.delay_after(4), Duration::from_secs(8));
    /// assert_eq!(retry.delay_after(9), Duration::from_secs(10));
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let raw = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(raw.clamp(self.min_delay_ms, self.max_delay_ms))
    }

    /// Same attempt budget without any waiting (tests, local providers)
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            min_delay_ms: 4_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tokens per section when a document has no headings
    pub segment_window_tokens: usize,

    /// Stop-word language for keyword extraction
    pub keyword_language: KeywordLanguage,

    /// Number of document-wide keywords
    pub keyword_top_k: usize,

    /// Sections structured at the same time (1 = strictly sequential)
    pub concurrency: usize,

    /// Retry policy for structuring calls
    pub retry: RetryConfig,

    /// Bound on a single structuring attempt (seconds)
    pub call_timeout_secs: u64,

    /// Copy raw service output into degraded records for debugging
    pub echo_raw_response: bool,

    /// Directory finalized archives are written to
    pub archive_dir: PathBuf,
}

impl PipelineConfig {
    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.segment_window_tokens == 0 {
            return Err("segment_window_tokens must be greater than 0".to_string());
        }
        if self.keyword_top_k == 0 {
            return Err("keyword_top_k must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be greater than 0".to_string());
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err("retry.min_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        if self.archive_dir.as_os_str().is_empty() {
            return Err("archive_dir must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    /// Sequential processing with the reference retry policy
    fn default() -> Self {
        Self {
            segment_window_tokens: 500,
            keyword_language: KeywordLanguage::English,
            keyword_top_k: 10,
            concurrency: 1,
            retry: RetryConfig::default(),
            call_timeout_secs: 120,
            echo_raw_response: true,
            archive_dir: PathBuf::from("archives"),
        }
    }
}

impl PipelineConfig {
    /// Sequential preset: one section at a time, progress after each
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Parallel preset: up to `workers` sections in flight
    pub fn parallel(workers: usize) -> Self {
        Self {
            concurrency: workers,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
