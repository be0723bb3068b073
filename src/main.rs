//! Insight Archive - operator CLI
//!
//! Stores, queries and inspects a topic-indexed insight archive on disk.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insight_archive::{config::ArchiveConfig, KnowledgeArchive};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "insight-archive")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Persistent topic-indexed insight memory")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "INSIGHT_ARCHIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the storage root directory
    #[arg(long, env = "INSIGHT_ARCHIVE_DIR")]
    memory_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an insight under one or more topics
    Add {
        /// Insight text
        insight: String,

        /// Task the insight was learned from
        #[arg(long)]
        task: Option<String>,

        /// Topic to index the insight under (repeatable)
        #[arg(short, long = "topic", required = true)]
        topics: Vec<String>,
    },

    /// Store a task with a worked solution
    Demo {
        /// Task description
        task: String,

        /// Worked solution
        demonstration: String,

        /// Topic to index the demonstration under (repeatable)
        #[arg(short, long = "topic", required = true)]
        topics: Vec<String>,
    },

    /// List insights relevant to the given topics
    Query {
        /// Task being attempted
        #[arg(long)]
        task: Option<String>,

        /// Topic to match against (repeatable)
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// Show at most this many insights
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show archive statistics
    Stats,

    /// Delete every stored insight and association
    Reset,

    /// Run diagnostics
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("insight_archive={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let mut config = match cli.config.or_else(default_config_path) {
        Some(path) => ArchiveConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => ArchiveConfig::default(),
    };
    if let Some(dir) = cli.memory_dir {
        config.storage.memory_dir = dir;
    }

    match cli.command {
        Commands::Add {
            insight,
            task,
            topics,
        } => {
            let mut archive = KnowledgeArchive::open(&config).await?;
            let id = archive
                .add_insight(&insight, task.as_deref(), &topics)
                .await?;
            println!("Stored insight {}", id);
        }
        Commands::Demo {
            task,
            demonstration,
            topics,
        } => {
            let mut archive = KnowledgeArchive::open(&config).await?;
            let id = archive
                .add_demonstration(&task, &demonstration, &topics)
                .await?;
            println!("Stored demonstration {}", id);
        }
        Commands::Query {
            task,
            topics,
            limit,
        } => {
            let archive = KnowledgeArchive::open(&config).await?;
            run_query(&archive, task.as_deref(), &topics, limit).await?;
        }
        Commands::Stats => {
            let archive = KnowledgeArchive::open(&config).await?;
            show_stats(&archive, &config);
        }
        Commands::Reset => {
            let mut archive = KnowledgeArchive::open(&config).await?;
            let count = archive.len();
            archive.reset().await?;
            println!("Removed {} insights", count);
        }
        Commands::Doctor => {
            run_doctor(&config);
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_query(
    archive: &KnowledgeArchive,
    task: Option<&str>,
    topics: &[String],
    limit: Option<usize>,
) -> Result<()> {
    let relevance = archive.get_relevant_insights(task, topics).await?;
    let mut ranked = KnowledgeArchive::rank(relevance);
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    if ranked.is_empty() {
        println!("No relevant insights");
        return Ok(());
    }

    for (text, score) in ranked {
        println!("[{:.3}] {}", score, text);
    }
    Ok(())
}

fn show_stats(archive: &KnowledgeArchive, config: &ArchiveConfig) {
    println!("Run directory: {}", config.storage.run_dir().display());
    println!("Insights:      {}", archive.len());
    println!("Next id:       {}", archive.store().next_id_counter() + 1);

    let mut topics: Vec<&str> = archive
        .store()
        .iter()
        .flat_map(|insight| insight.topics.iter().map(String::as_str))
        .collect();
    topics.sort_unstable();
    topics.dedup();
    println!("Topics:        {}", topics.len());
}

fn run_doctor(config: &ArchiveConfig) {
    println!("Insight Archive Doctor");
    println!();

    println!("Checking configuration...");
    match default_config_path() {
        Some(path) => println!("  ✓ Configuration file found: {}", path.display()),
        None => println!("  ℹ No configuration file found (using defaults)"),
    }

    println!();
    println!("Checking storage...");
    let run_dir = config.storage.run_dir();
    if run_dir.exists() {
        println!("  ✓ Run directory: {}", run_dir.display());
    } else {
        println!("  ℹ Run directory will be created: {}", run_dir.display());
    }
    let insights = config.storage.insights_path();
    if insights.exists() {
        println!("  ✓ Insight snapshot: {}", insights.display());
    } else {
        println!("  ℹ No insight snapshot yet");
    }

    println!();
    println!("Doctor check complete!");
}

fn show_config(config: Option<&ArchiveConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}

/// `<config_dir>/insight-archive/config.toml`, if it exists
fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir()
        .map(|p| p.join("insight-archive").join("config.toml"))
        .filter(|p| p.exists())
}
