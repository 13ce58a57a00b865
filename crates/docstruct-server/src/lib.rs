//! docstruct Server
//!
//! HTTP host for the document-structuring pipeline: file upload with a
//! section preview, streaming processing (newline-delimited progress
//! events), and archive download.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, ServerConfig};
use docstruct_ingest::FileExtractor;
use docstruct_llm::{AnyProvider, LlmError};
use docstruct_pipeline::{PipelineError, PipelineMetrics, PipelineRunner};
use handlers::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider could not be built
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// Pipeline could not be set up
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the shared state for a configuration
///
/// Selects the provider, validates the pipeline settings and opens the
/// archive directory.
pub fn build_state(config: ServerConfig) -> Result<AppState, ServerError> {
    config.validate()?;
    let provider = AnyProvider::from_config(&config.llm)?;
    build_state_with(config, provider)
}

/// Build the shared state around an existing provider
pub fn build_state_with(config: ServerConfig, provider: AnyProvider) -> Result<AppState, ServerError> {
    let runner =
        PipelineRunner::with_metrics(provider, config.pipeline.clone(), PipelineMetrics::new())?;
    let extractor = FileExtractor::new(config.max_upload_bytes as u64);

    Ok(AppState {
        runner,
        extractor: Arc::new(extractor),
        config: Arc::new(config),
    })
}

/// Start the HTTP server
///
/// Builds the application state and serves until the process exits.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting docstruct server");
    info!("Bind address: {}", config.bind_addr());
    info!("Provider: {} ({})", config.llm.provider, config.llm.model);
    info!(
        "Archive directory: {}",
        config.pipeline.archive_dir.display()
    );
    info!("Section concurrency: {}", config.pipeline.concurrency);

    let bind_addr = config.bind_addr();
    let state = build_state(config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state_with_mock_provider() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = ServerConfig::default_dev_config();
        config.pipeline.archive_dir = dir.path().join("archives");

        let state = build_state(config).unwrap();
        assert!(state.runner.archives().dir().exists());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = ServerConfig::default_dev_config();
        config.llm.provider = "telepathy".to_string();

        assert!(matches!(build_state(config), Err(ServerError::Provider(_))));
    }
}
