//! docstruct server binary
//!
//! Starts the HTTP server for uploading, structuring and downloading documents.

use anyhow::Context;
use docstruct_server::{config::ServerConfig, start_server};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        let config_path = &args[2];
        ServerConfig::from_file(config_path)
            .with_context(|| format!("loading {}", config_path))?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using development configuration (mock provider)");
        eprintln!("Usage: docstruct-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default_dev_config()
    };

    start_server(config).await?;
    Ok(())
}

fn print_help() {
    println!("docstruct server - Turn documents into archives of structured sections");
    println!();
    println!("USAGE:");
    println!("    docstruct-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address, bind_port: where to listen (default 127.0.0.1:5000)");
    println!("    - max_upload_bytes: upload limit (default 16 MiB)");
    println!("    - allowed_extensions: accepted formats (default txt, pdf, docx, xlsx)");
    println!("    - [llm]: provider (openai | ollama | mock), model, endpoint, api_key_env");
    println!("    - [pipeline]: concurrency, keyword_language, retry, archive_dir, ...");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG           Log filter (default: info)");
    println!("    OPENAI_API_KEY     API key for the openai provider");
}
