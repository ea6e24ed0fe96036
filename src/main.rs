//! # SWOT Harness CLI (`swot`)
//!
//! ## Usage
//!
//! ```bash
//! swot --config ./swot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `swot init` | Create the SQLite database and run schema migrations |
//! | `swot analyze <source>` | Analyse a document, compare with the previous run, write reports |
//! | `swot history` | List stored analyses |
//! | `swot show <id>` | Re-render a stored analysis or its comparison |
//! | `swot compare <old> <new>` | Compare two stored analyses |
//!
//! Exit status is 1 on any error, with a summary and the full cause chain
//! printed to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use swot_harness::analyze::{self, AnalyzeArgs};
use swot_harness::config;
use swot_harness::history;
use swot_harness::progress::ProgressMode;
use swot_harness::store::Store;

/// SWOT Harness: model-driven SWOT analysis with run-over-run comparison.
#[derive(Parser)]
#[command(name = "swot", version)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./swot.toml")]
    config: PathBuf,

    /// Progress output on stderr.
    #[arg(long, global = true, value_enum, default_value_t = ProgressMode::Human)]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init {
        /// Override `[db].path`.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Analyse a source document.
    ///
    /// Runs the analysis pipeline, stores the result, compares it with the
    /// latest stored analysis if there is one, and writes Markdown reports.
    Analyze {
        /// Markdown document to analyse.
        source_file: PathBuf,

        /// Company context file. Missing means empty context.
        #[arg(long, default_value = "context.md")]
        context: PathBuf,

        /// Override `[db].path`.
        #[arg(long)]
        db: Option<PathBuf>,

        /// Override `[outputs].dir`.
        #[arg(long)]
        outputs: Option<PathBuf>,

        /// Also write a condensed pull-request comment here.
        #[arg(long)]
        comment_file: Option<PathBuf>,
    },

    /// List stored analyses, newest first.
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,

        /// Override `[db].path`.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print a stored analysis report.
    Show {
        id: i64,

        /// Show the comparison that produced this analysis instead.
        #[arg(long)]
        comparison: bool,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override `[db].path`.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Compare two stored analyses.
    Compare {
        old_id: i64,
        new_id: i64,

        /// Override `[db].path`.
        #[arg(long)]
        db: Option<PathBuf>,

        /// Override `[outputs].dir`.
        #[arg(long)]
        outputs: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = config::load_config(&cli.config)?;
    let reporter = cli.progress.reporter();

    match cli.command {
        Commands::Init { db } => {
            if let Some(db) = db {
                cfg.db.path = db;
            }
            Store::open(&cfg.db.path).await?.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Analyze {
            source_file,
            context,
            db,
            outputs,
            comment_file,
        } => {
            if let Some(db) = db {
                cfg.db.path = db;
            }
            if let Some(outputs) = outputs {
                cfg.outputs.dir = outputs;
            }
            let args = AnalyzeArgs {
                source_file,
                context_file: context,
                comment_file,
            };
            let outcome = analyze::run_analyze(&cfg, &args, reporter.as_ref()).await?;

            println!("analysis {}", outcome.analysis.id);
            println!("{}", outcome.report_path.display());
            if let Some(path) = &outcome.comparison_path {
                println!("{}", path.display());
            }
            if let Some(path) = &outcome.comment_path {
                println!("{}", path.display());
            }
        }
        Commands::History { limit, db } => {
            if let Some(db) = db {
                cfg.db.path = db;
            }
            history::run_history(&cfg, limit).await?;
        }
        Commands::Show {
            id,
            comparison,
            output,
            db,
        } => {
            if let Some(db) = db {
                cfg.db.path = db;
            }
            history::run_show(&cfg, id, comparison, output.as_deref()).await?;
        }
        Commands::Compare {
            old_id,
            new_id,
            db,
            outputs,
        } => {
            if let Some(db) = db {
                cfg.db.path = db;
            }
            if let Some(outputs) = outputs {
                cfg.outputs.dir = outputs;
            }
            history::run_compare(&cfg, old_id, new_id, reporter.as_ref()).await?;
        }
    }

    Ok(())
}
