//! # Orrery CLI
//!
//! Command-line front end for the ingestion and aggregation pipeline.
//!
//! ## Usage
//!
//! ```bash
//! orrery --config ./config/orrery.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `orrery sync` | Full cycle: fetch listing, download snapshots, load, aggregate, compose |
//! | `orrery load` | Offline cycle: load existing snapshots, aggregate, compose |
//! | `orrery versions <repo>` | List a repository's extracted versions, marking the current one |
//! | `orrery article <repo>` | Print a repository's composed page HTML |
//! | `orrery index` | Print the composed site index HTML |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use orrery::config;
use orrery::pipeline::{Pipeline, RepoOutcome};
use orrery::version::current_version;

/// Orrery — a snapshot ingestion and aggregation pipeline for org-wide
/// content sites.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file naming the GitHub org and the snapshot root directory.
#[derive(Parser)]
#[command(
    name = "orrery",
    about = "Orrery — snapshot ingestion and aggregation for org-wide content sites",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/orrery.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the full ingestion cycle.
    ///
    /// Fetches the org repository listing, downloads and extracts every
    /// repository's tarball snapshot, loads metadata and markup from the
    /// current versions, rebuilds the aggregate indices, and composes all
    /// pages. Individual repository failures are reported, never fatal
    /// for the batch.
    Sync,

    /// Run the offline cycle against existing snapshots.
    ///
    /// Skips all network access: loads metadata and markup from the
    /// snapshots already on disk, rebuilds the aggregate indices, and
    /// composes all pages.
    Load,

    /// List a repository's extracted snapshot versions.
    ///
    /// Shows each version directory with its modification time and marks
    /// the one the resolver selects as current.
    Versions {
        /// Repository name.
        repo: String,
    },

    /// Print a repository's composed page HTML.
    ///
    /// Runs the offline cycle first, then prints the page.
    Article {
        /// Repository name.
        repo: String,
    },

    /// Print the composed site index HTML.
    ///
    /// Runs the offline cycle first, then prints the index.
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orrery=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let pipeline = Pipeline::new(&cfg)?;

    match cli.command {
        Commands::Sync => {
            let outcomes = pipeline.run().await?;
            report(&pipeline, &outcomes).await;
        }
        Commands::Load => {
            let outcomes = pipeline.refresh().await?;
            report(&pipeline, &outcomes).await;
        }
        Commands::Versions { repo } => {
            let versions = pipeline.store().list_versions(&repo)?;
            if versions.is_empty() {
                println!("{}: no versions extracted yet", repo);
                return Ok(());
            }
            let current = current_version(&versions).cloned();
            for version in &versions {
                let marker = if Some(version) == current.as_ref() {
                    " (current)"
                } else {
                    ""
                };
                let modified = chrono::DateTime::<chrono::Utc>::from(version.modified);
                println!(
                    "{}  {}{}",
                    modified.format("%Y-%m-%dT%H:%M:%SZ"),
                    version.path.display(),
                    marker
                );
            }
        }
        Commands::Article { repo } => {
            pipeline.refresh().await?;
            match pipeline.get_article(&repo).await {
                Some(html) => println!("{}", html),
                None => {
                    eprintln!("Error: no composed article for '{}'", repo);
                    std::process::exit(1);
                }
            }
        }
        Commands::Index => {
            pipeline.refresh().await?;
            match pipeline.get_index().await {
                Some(html) => println!("{}", html),
                None => {
                    eprintln!("Error: index not composed");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn report(pipeline: &Pipeline, outcomes: &[RepoOutcome]) {
    let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let failed = outcomes.len() - ok;
    let aggregates = pipeline.aggregates().await;

    println!("repositories processed: {}", outcomes.len());
    println!("  succeeded: {}", ok);
    println!("  failed: {}", failed);
    println!("aggregates:");
    println!("  contributors: {}", aggregates.contributors.len());
    println!("  tags: {}", aggregates.tags.len());
    println!("  categories: {}", aggregates.categories.len());
    println!("  difficulty buckets: {}", aggregates.difficulties.len());

    for outcome in outcomes {
        if let Err(err) = &outcome.result {
            println!("  {} failed: {}", outcome.name, err);
        }
    }
    println!("ok");
}
