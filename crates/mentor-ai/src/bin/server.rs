//! Mentor AI server binary
//!
//! Run with: cargo run -p mentor-ai --bin mentor-ai-server -- --config mentor.toml

use clap::Parser;
use mentor_ai::{MentorConfig, MentorServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mentor-ai-server")]
#[command(about = "Student tips, university site scraping and chatbot API", version)]
struct Args {
    /// TOML configuration file (falls back to MENTOR_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentor_ai=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = MentorConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Database: {}", config.database.path.display());
    tracing::info!("  - LLM provider: {:?} ({})", config.llm.provider, config.llm.model);
    tracing::info!("  - Scrape target: {}", config.scraper.default_url);
    match config.scraper.interval_secs {
        Some(secs) => tracing::info!("  - Scheduled crawl every {}s", secs),
        None => tracing::info!("  - Scheduled crawl disabled"),
    }

    let server = MentorServer::new(config)?;

    println!("\nServer starting...");
    println!("  API:    http://{}/api/v1", server.address());
    println!("  Health: http://{}/api/v1/health", server.address());
    println!("  Info:   http://{}/api/v1/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
