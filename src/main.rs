//! PDF Page Index CLI
//!
//! Builds per-page PDF indexes with LLM summaries, ranks them against
//! queries, and reads stored page details.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_page_index::{
    api::PdfIndexService,
    config::Config,
    llm::HttpCompletionClient,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// PDF Page Index - LLM-powered per-page PDF indexing and retrieval
#[derive(Parser)]
#[command(name = "pdf-index")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or reuse) the index for a PDF, optionally ranking it against a query
    Index {
        /// Path to the PDF file
        pdf: PathBuf,

        /// Search query; when given, prints ranked pages instead of the full index
        #[arg(short, long)]
        query: Option<String>,

        /// Number of search results to return
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },

    /// Show the stored text and summary of one page
    Detail {
        /// Path to the PDF file
        pdf: PathBuf,

        /// Page number (1-based)
        page: usize,
    },

    /// Test connectivity to the configured completion endpoint
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { pdf, query, top_k } => cmd_index(pdf, query, top_k).await,
        Commands::Detail { pdf, page } => cmd_detail(pdf, page),
        Commands::Test => cmd_test().await,
    }
}

async fn cmd_index(pdf: PathBuf, query: Option<String>, top_k: usize) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let service = PdfIndexService::from_config(&config);

    let start = Instant::now();
    let response = service
        .get_index(&pdf.to_string_lossy(), query.as_deref(), top_k)
        .await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    eprintln!("Completed in {:.2?}", start.elapsed());

    Ok(())
}

fn cmd_detail(pdf: PathBuf, page: usize) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let service = PdfIndexService::from_config(&config);
    let response = service.get_detail(&pdf.to_string_lossy(), page);

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing completion endpoint...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  Base URL:  {}", config.llm.base_url);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        &config.llm.api_key[..config.llm.api_key.len().min(8)]
    );
    println!(
        "  OCR:       {}",
        if config.is_ocr_configured() {
            config.ocr.model.as_str()
        } else {
            "not configured"
        }
    );
    println!();

    if !config.is_llm_configured() {
        println!("No completion endpoint configured. Set PAGEINDEX_LLM_BASE_URL and PAGEINDEX_LLM_API_KEY.");
        return Ok(());
    }

    let client = HttpCompletionClient::from_llm_config(&config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}
