//! Rebuild the knowledge base from stored tips and scraped pages
//!
//! Run with: cargo run -p mentor-ai --bin mentor-ai-index

use clap::Parser;
use mentor_ai::{knowledge::KnowledgeBase, MentorConfig, MentorDb};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mentor-ai-index")]
#[command(about = "Index stored tips and pages into the knowledge base", version)]
struct Args {
    /// TOML configuration file (falls back to MENTOR_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long)]
    db: Option<PathBuf>,

    /// Number of sample records to print afterwards
    #[arg(long, default_value = "5")]
    sample: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentor_ai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = MentorConfig::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.database.path = db;
    }
    config.validate()?;

    let db = MentorDb::open(&config.database.path)?;
    let knowledge = KnowledgeBase::new(db, config.knowledge.clone());

    let report = knowledge.rebuild()?;
    println!(
        "Pages: {:>5} indexed, {:>5} skipped, {:>5} errors, {:>6} chunks",
        report.pages.indexed, report.pages.skipped, report.pages.errors, report.pages.total_chunks
    );
    println!(
        "Tips:  {:>5} indexed, {:>5} skipped, {:>5} errors",
        report.tips.indexed, report.tips.skipped, report.tips.errors
    );

    let summary = knowledge.summary(args.sample)?;
    println!("\n{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
