//! Commands over stored state: `history`, `show`, and `compare`.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::analyze::{compare_and_save, write_report, Collaborators, COMPARISON_REPORT};
use crate::config::Config;
use crate::embedding;
use crate::llm;
use crate::models::{Quadrant, StoredAnalysis};
use crate::progress::ProgressReporter;
use crate::report;
use crate::search::DisabledSearch;
use crate::store::Store;

/// `swot history`: most recent analyses first.
pub async fn run_history(config: &Config, limit: i64) -> Result<()> {
    let store = Store::open(&config.db.path).await?;
    let analyses = store.list_analyses(limit).await?;
    let contexts = store.context_count().await?;
    store.close().await;

    if analyses.is_empty() {
        println!("No analyses stored yet.");
        return Ok(());
    }

    println!(
        "{:<6} {:<17} {:<16} {:<11} SOURCE",
        "ID", "CREATED", "CONTEXT", "S/W/O/T"
    );
    for stored in &analyses {
        println!("{}", history_line(stored));
    }
    println!("\n{} distinct context(s)", contexts);
    Ok(())
}

fn history_line(stored: &StoredAnalysis) -> String {
    let a = &stored.analysis;
    let counts = Quadrant::ALL
        .iter()
        .map(|q| a.items(*q).len().to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{:<6} {:<17} {:<16} {:<11} {}",
        stored.id,
        a.created_at.format("%Y-%m-%d %H:%M"),
        a.context_fingerprint,
        counts,
        a.source_identifier
    )
}

/// `swot show <id>`: re-render a stored analysis, or with `comparison`
/// the latest comparison that produced it.
pub async fn run_show(
    config: &Config,
    id: i64,
    comparison: bool,
    output: Option<&Path>,
) -> Result<()> {
    let store = Store::open(&config.db.path).await?;
    let document = if comparison {
        match store.comparison_for(id).await? {
            Some(c) => report::render_comparison(&c),
            None => bail!("no comparison stored for analysis {}", id),
        }
    } else {
        match store.get_analysis(id).await? {
            Some(stored) => report::render_analysis(&stored.analysis),
            None => bail!("analysis {} not found", id),
        }
    };
    store.close().await;

    match output {
        Some(path) => {
            std::fs::write(path, document)?;
            println!("{}", path.display());
        }
        None => print!("{}", document),
    }
    Ok(())
}

/// `swot compare <old> <new>`: run the comparison over two stored
/// analyses, persist it, and write the comparison report.
pub async fn run_compare(
    config: &Config,
    old_id: i64,
    new_id: i64,
    reporter: &dyn ProgressReporter,
) -> Result<PathBuf> {
    let model = llm::create_model(&config.llm)?;
    let embedder = embedding::create_provider(&config.embedding)?;

    let store = Store::open(&config.db.path).await?;
    let (Some(previous), Some(current)) = (
        store.get_analysis(old_id).await?,
        store.get_analysis(new_id).await?,
    ) else {
        store.close().await;
        bail!("both analyses must exist: {} and {}", old_id, new_id);
    };

    let collaborators = Collaborators {
        model: model.as_ref(),
        search: &DisabledSearch,
        embedder: embedder.as_deref(),
    };
    let comparison =
        compare_and_save(&store, config, &collaborators, &previous, &current, reporter).await?;
    store.close().await;

    let path = config.outputs.dir.join(COMPARISON_REPORT);
    write_report(&path, &report::render_comparison(&comparison), reporter)?;
    println!("{}", path.display());
    Ok(path)
}
