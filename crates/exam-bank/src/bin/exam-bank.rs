//! Question bank CLI
//!
//! Run with: cargo run -p exam-bank -- ingest data

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exam_bank::{
    config::BankConfig, pipeline::FileOutcome, providers::build_provider, storage::ProblemStore,
    IngestPipeline,
};

#[derive(Parser)]
#[command(name = "exam-bank")]
#[command(about = "Build a multiple-choice question bank from exam-prep documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract questions from every PDF/PPT(X) in a directory
    Ingest {
        /// Input directory (not searched recursively)
        #[arg(default_value = "data")]
        dir: PathBuf,

        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Maximum chunk length in characters
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Print the stored problem count and preview the first problems
    Show {
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Number of problems to preview
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exam_bank=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = BankConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Ingest { dir, db, max_chars } => {
            if let Some(db) = db {
                config.storage.database_path = db;
            }
            if let Some(max_chars) = max_chars {
                config.chunking.max_chars = max_chars;
            }
            ingest(config, dir).await
        }
        Commands::Show { db, limit } => {
            if let Some(db) = db {
                config.storage.database_path = db;
            }
            show(&config, limit)
        }
    }
}

async fn ingest(config: BankConfig, dir: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.llm.backend);
    tracing::info!("  - Model: {}", config.llm.model());
    tracing::info!("  - Chunk size: {} chars", config.chunking.max_chars);
    tracing::info!("  - Database: {}", config.storage.database_path.display());

    let llm = build_provider(&config.llm)?;
    match llm.health_check().await {
        Ok(true) => tracing::info!("{} is reachable", llm.name()),
        _ => tracing::warn!("{} health check failed; requests may fail", llm.name()),
    }

    let pipeline = IngestPipeline::new(&config, llm)?;
    let summary = pipeline
        .run(&dir)
        .await
        .with_context(|| format!("Ingestion of {} failed", dir.display()))?;

    println!();
    for report in &summary.files {
        let status = match &report.outcome {
            FileOutcome::Ingested => "ok".to_string(),
            FileOutcome::NoText => "no text".to_string(),
            FileOutcome::Failed(reason) => format!("failed: {}", reason),
        };
        println!(
            "  {} [{}] chunks={} parsed={} stored={} ({})",
            report.filename, report.subject, report.chunks, report.parsed, report.inserted, status
        );
    }
    println!(
        "\nStored {} problems from {} chunks in {} files ({} failed, {}ms)",
        summary.total_inserted(),
        summary.total_chunks(),
        summary.files.len(),
        summary.failed_files(),
        summary.elapsed_ms
    );

    Ok(())
}

fn show(config: &BankConfig, limit: usize) -> anyhow::Result<()> {
    let Some(store) = ProblemStore::open_existing(&config.storage.database_path)? else {
        println!(
            "No database at {} yet. Run `exam-bank ingest` first.",
            config.storage.database_path.display()
        );
        return Ok(());
    };
    println!("{} problems in {}", store.count()?, store.path().display());

    for problem in store.list_problems(limit)? {
        println!("\n[{}] #{} {}", problem.subject, problem.id, problem.question);
        for (i, choice) in problem.choices.iter().enumerate() {
            println!("  {}. {}", i + 1, choice);
        }
        println!("  정답: {}", problem.answer);
    }

    Ok(())
}
