//! Runtime provider selection

use crate::{LlmConfig, LlmError, MockProvider, OllamaProvider, OpenAiProvider};
use docstruct_domain::{KeywordSet, StructuringService};
use tracing::info;

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given expression for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $expr,
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::Mock($p) => $expr,
        }
    };
}

/// A provider chosen from configuration at startup
#[derive(Debug, Clone)]
pub enum AnyProvider {
    /// OpenAI-compatible chat completions
    OpenAi(OpenAiProvider),
    /// Local Ollama
    Ollama(OllamaProvider),
    /// Echoing mock (development without credentials)
    Mock(MockProvider),
}

impl AnyProvider {
    /// Build the provider described by `config`.
    ///
    /// For `openai` the API key is read from the environment variable named by
    /// `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for an unknown provider name or a
    /// missing API key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "openai" => {
                let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                    LlmError::Configuration(format!(
                        "environment variable {} is not set",
                        config.api_key_env
                    ))
                })?;
                let mut provider =
                    OpenAiProvider::new(api_key, &config.model)?.with_max_tokens(config.max_tokens);
                if let Some(endpoint) = &config.endpoint {
                    provider = provider.with_endpoint(endpoint.as_str());
                }
                AnyProvider::OpenAi(provider)
            }
            "ollama" => {
                let endpoint = config
                    .endpoint
                    .as_deref()
                    .unwrap_or(crate::ollama::DEFAULT_ENDPOINT);
                AnyProvider::Ollama(OllamaProvider::new(endpoint, &config.model))
            }
            "mock" => AnyProvider::Mock(MockProvider::echo()),
            other => {
                return Err(LlmError::Configuration(format!(
                    "unknown provider '{}'",
                    other
                )))
            }
        };

        info!("Using {} provider with model '{}'", provider.name(), config.model);
        Ok(provider)
    }

    /// Short provider name for logs
    pub fn name(&self) -> &'static str {
        match self {
            AnyProvider::OpenAi(_) => "openai",
            AnyProvider::Ollama(_) => "ollama",
            AnyProvider::Mock(_) => "mock",
        }
    }
}

impl StructuringService for AnyProvider {
    type Error = LlmError;

    async fn structure(
        &self,
        section_text: &str,
        keywords: &KeywordSet,
    ) -> Result<String, Self::Error> {
        delegate_provider!(self, |p| p.structure(section_text, keywords).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_from_config() {
        let config = LlmConfig {
            provider: "Mock".to_string(),
            ..LlmConfig::default()
        };
        let provider = AnyProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_ollama_from_config() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(AnyProvider::from_config(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn test_openai_requires_key() {
        let config = LlmConfig {
            api_key_env: "DOCSTRUCT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let result = AnyProvider::from_config(&config);
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        assert!(AnyProvider::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_delegates_to_inner_provider() {
        let provider = AnyProvider::Mock(MockProvider::new("fixed"));
        let out = provider.structure("x", &KeywordSet::default()).await.unwrap();
        assert_eq!(out, "fixed");
    }
}
