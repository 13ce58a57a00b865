//! docstruct LLM Provider Layer
//!
//! Implementations of the `StructuringService` trait from `docstruct-domain`.
//! Each provider performs exactly one attempt per call; retry policy belongs
//! to the pipeline, which uses [`LlmError`]'s classification to decide.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable stub for testing
//! - `OpenAiProvider`: OpenAI-compatible chat completions API
//! - `OllamaProvider`: Local Ollama API integration
//! - `AnyProvider`: Runtime selection from [`LlmConfig`]
//!
//! # Examples
//!
//! ```
//! use docstruct_llm::MockProvider;
//! use docstruct_domain::{KeywordSet, StructuringService};
//!
//! let provider = MockProvider::new(r#"{"title":"T","body":"B","tags":[]}"#);
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let result = rt.block_on(provider.structure("text", &KeywordSet::default())).unwrap();
//! assert!(result.starts_with('{'));
//! ```

#![warn(missing_docs)]

pub mod any;
pub mod ollama;
pub mod openai;
pub mod prompt;

use docstruct_domain::{KeywordSet, ServiceFailure, StructuringService};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use any::AnyProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use prompt::PromptBuilder;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or transport failure before a response arrived
    #[error("Communication error: {0}")]
    Communication(String),

    /// The call did not finish in time
    #[error("Request timed out")]
    Timeout,

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider-side failure (HTTP 5xx)
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Credentials rejected (HTTP 401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Request rejected as malformed (other HTTP 4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Response envelope could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider misconfigured (missing key, bad endpoint)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => LlmError::Authentication(body),
            404 => LlmError::ModelNotAvailable(body),
            408 => LlmError::Timeout,
            429 => LlmError::RateLimitExceeded,
            500..=599 => LlmError::Server {
                status,
                message: body,
            },
            _ => LlmError::InvalidRequest(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Classify a transport-level reqwest failure
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Communication(e.to_string())
        }
    }
}

impl ServiceFailure for LlmError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_)
                | LlmError::Timeout
                | LlmError::RateLimitExceeded
                | LlmError::Server { .. }
        )
    }

    fn class(&self) -> &'static str {
        match self {
            LlmError::Communication(_) => "Communication",
            LlmError::Timeout => "Timeout",
            LlmError::RateLimitExceeded => "Rate Limit",
            LlmError::Server { .. } => "Service Unavailable",
            LlmError::Authentication(_) => "Authentication",
            LlmError::InvalidRequest(_) => "Invalid Request",
            LlmError::ModelNotAvailable(_) => "Model Not Available",
            LlmError::InvalidResponse(_) => "Invalid Response",
            LlmError::Configuration(_) => "Configuration",
        }
    }
}

/// Which provider to build and how to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// One of "openai", "ollama", "mock"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g. "gpt-3.5-turbo", "llama3")
    #[serde(default = "default_model")]
    pub model: String,

    /// Override the provider's default endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Completion token budget per section
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// How the mock answers when no scripted reply or marker rule applies
#[derive(Debug, Clone)]
enum MockDefault {
    Fixed(String),
    Echo,
}

/// Mock structuring provider for deterministic testing
///
/// Replies are chosen in this order: the next queued reply (see
/// [`MockProvider::push_reply`]), the first marker rule whose marker occurs in
/// the section text, then the default (fixed text or JSON echo).
///
/// # Examples
///
/// ```
/// use docstruct_llm::{LlmError, MockProvider};
/// use docstruct_domain::{KeywordSet, StructuringService};
///
/// let provider = MockProvider::echo();
/// provider.fail_when_contains("BROKEN", LlmError::InvalidRequest("bad".into()));
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let keywords = KeywordSet::default();
/// assert!(rt.block_on(provider.structure("fine", &keywords)).is_ok());
/// assert!(rt.block_on(provider.structure("BROKEN text", &keywords)).is_err());
/// assert_eq!(provider.call_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default: MockDefault,
    queue: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    rules: Arc<Mutex<Vec<(String, Result<String, LlmError>)>>>,
    delays: Arc<Mutex<Vec<(String, Duration)>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all sections
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_default(MockDefault::Fixed(response.into()))
    }

    /// Create a MockProvider that answers with a valid JSON record built from
    /// the section: first line as title, full text as body, keywords as tags
    pub fn echo() -> Self {
        Self::with_default(MockDefault::Echo)
    }

    fn with_default(default: MockDefault) -> Self {
        Self {
            default,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            rules: Arc::new(Mutex::new(Vec::new())),
            delays: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a one-shot reply consumed by the next call
    pub fn push_reply(&self, reply: Result<String, LlmError>) {
        self.queue.lock().unwrap().push_back(reply);
    }

    /// Queue a one-shot failure consumed by the next call
    pub fn push_error(&self, error: LlmError) {
        self.push_reply(Err(error));
    }

    /// Always answer `response` for sections containing `marker`
    pub fn respond_when_contains(&self, marker: impl Into<String>, response: impl Into<String>) {
        self.rules
            .lock()
            .unwrap()
            .push((marker.into(), Ok(response.into())));
    }

    /// Always fail with `error` for sections containing `marker`
    pub fn fail_when_contains(&self, marker: impl Into<String>, error: LlmError) {
        self.rules.lock().unwrap().push((marker.into(), Err(error)));
    }

    /// Sleep `delay` before answering sections containing `marker`
    pub fn delay_when_contains(&self, marker: impl Into<String>, delay: Duration) {
        self.delays.lock().unwrap().push((marker.into(), delay));
    }

    /// Get the number of times structure was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *self.call_count.lock().unwrap() = 0;
    }

    fn delay_for(&self, section_text: &str) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .find(|(marker, _)| section_text.contains(marker.as_str()))
            .map(|(_, delay)| *delay)
    }

    fn reply_for(&self, section_text: &str, keywords: &KeywordSet) -> Result<String, LlmError> {
        if let Some(reply) = self.queue.lock().unwrap().pop_front() {
            return reply;
        }

        let rules = self.rules.lock().unwrap();
        if let Some((_, reply)) = rules
            .iter()
            .find(|(marker, _)| section_text.contains(marker.as_str()))
        {
            return reply.clone();
        }

        match &self.default {
            MockDefault::Fixed(response) => Ok(response.clone()),
            MockDefault::Echo => {
                let title = section_text
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("Untitled Section");
                Ok(serde_json::json!({
                    "title": title,
                    "body": section_text,
                    "tags": keywords.terms(),
                })
                .to_string())
            }
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::echo()
    }
}

impl StructuringService for MockProvider {
    type Error = LlmError;

    async fn structure(
        &self,
        section_text: &str,
        keywords: &KeywordSet,
    ) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap() += 1;

        if let Some(delay) = self.delay_for(section_text) {
            tokio::time::sleep(delay).await;
        }

        self.reply_for(section_text, keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> KeywordSet {
        KeywordSet::new(vec!["alpha".into(), "beta".into()])
    }

    #[tokio::test]
    async fn test_mock_provider_fixed() {
        let provider = MockProvider::new("Test response");
        let result = provider.structure("any section", &keywords()).await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_echo_builds_record() {
        let provider = MockProvider::echo();
        let raw = provider
            .structure("\n# Heading\nbody text", &keywords())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["title"], "# Heading");
        assert_eq!(json["tags"][1], "beta");
    }

    #[tokio::test]
    async fn test_mock_provider_queue_takes_precedence() {
        let provider = MockProvider::new("default");
        provider.push_error(LlmError::Timeout);
        provider.push_reply(Ok("second".into()));

        assert_eq!(
            provider.structure("x", &keywords()).await,
            Err(LlmError::Timeout)
        );
        assert_eq!(provider.structure("x", &keywords()).await.unwrap(), "second");
        assert_eq!(provider.structure("x", &keywords()).await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_mock_provider_marker_rules() {
        let provider = MockProvider::new("default");
        provider.respond_when_contains("special", "special answer");
        provider.fail_when_contains("broken", LlmError::RateLimitExceeded);

        assert_eq!(
            provider.structure("a special one", &keywords()).await.unwrap(),
            "special answer"
        );
        assert_eq!(
            provider.structure("a broken one", &keywords()).await,
            Err(LlmError::RateLimitExceeded)
        );
    }

    #[tokio::test]
    async fn test_mock_provider_call_count_shared_between_clones() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.structure("a", &keywords()).await.unwrap();
        provider2.structure("b", &keywords()).await.unwrap();

        assert_eq!(provider1.call_count(), 2);
        provider2.reset_call_count();
        assert_eq!(provider1.call_count(), 0);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(LlmError::from_status(429, ""), LlmError::RateLimitExceeded);
        assert_eq!(LlmError::from_status(408, ""), LlmError::Timeout);
        assert!(matches!(
            LlmError::from_status(401, "no key"),
            LlmError::Authentication(_)
        ));
        assert!(matches!(
            LlmError::from_status(503, "busy"),
            LlmError::Server { status: 503, .. }
        ));
        assert!(matches!(
            LlmError::from_status(400, "bad"),
            LlmError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::RateLimitExceeded.is_retryable());
        assert!(LlmError::Communication("reset".into()).is_retryable());
        assert!(LlmError::from_status(502, "").is_retryable());

        assert!(!LlmError::InvalidRequest("bad".into()).is_retryable());
        assert!(!LlmError::Authentication("no".into()).is_retryable());
        assert!(!LlmError::InvalidResponse("??".into()).is_retryable());
    }

    #[test]
    fn test_failure_classes() {
        assert_eq!(LlmError::RateLimitExceeded.class(), "Rate Limit");
        assert_eq!(LlmError::InvalidRequest("x".into()).class(), "Invalid Request");
    }

    #[test]
    fn test_llm_config_defaults() {
        let config: LlmConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.max_tokens, 1000);
    }
}
