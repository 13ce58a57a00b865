//! Configuration file parsing for the server.
//!
//! Loads the bind address, upload limits, provider selection and the
//! pipeline settings from a TOML file.

use docstruct_llm::LlmConfig;
use docstruct_pipeline::PipelineConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 5000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Largest accepted upload in bytes (default: 16 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Accepted file extensions, lower case without dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Structuring provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    5000
}

/// Default upload limit: 16 MiB
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["txt", "pdf", "docx", "xlsx"].iter().map(|s| s.to_string()).collect()
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: ServerConfig = toml::from_str(contents)?;
        config.allowed_extensions = config
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Check limits and the nested pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_extensions must not be empty".to_string(),
            ));
        }
        self.pipeline.validate().map_err(ConfigError::Invalid)
    }

    /// Development configuration: local bind, echoing mock provider
    pub fn default_dev_config() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
            llm: LlmConfig {
                provider: "mock".to_string(),
                ..LlmConfig::default()
            },
            pipeline: PipelineConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Whether uploads with this extension are accepted
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstruct_pipeline::KeywordLanguage;

    #[test]
    fn test_default_dev_config() {
        let config = ServerConfig::default_dev_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.llm.provider, "mock");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            allowed_extensions = [".TXT", "docx"]

            [llm]
            provider = "ollama"
            model = "llama3"
            endpoint = "http://localhost:11434"

            [pipeline]
            concurrency = 4
            keyword_language = "norwegian"
            archive_dir = "/var/lib/docstruct"

            [pipeline.retry]
            max_attempts = 5
        "#;

        let config = ServerConfig::from_toml(toml).unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.allowed_extensions, vec!["txt", "docx"]);
        assert!(config.allows_extension("TXT"));
        assert!(!config.allows_extension("pdf"));
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.pipeline.keyword_language, KeywordLanguage::Norwegian);
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.segment_window_tokens, 500);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.allowed_extensions.len(), 4);
    }

    #[test]
    fn test_invalid_pipeline_rejected() {
        let toml = r#"
            [pipeline]
            concurrency = 0
        "#;
        assert!(matches!(
            ServerConfig::from_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
    }
}
