//! `swot analyze`: one full run.
//!
//! ```text
//! source + context ─▶ latest stored analysis ─▶ AnalysisPipeline ─▶ save
//!                                                     │
//!                         previous exists? ──▶ ComparisonPipeline ─▶ save
//!                                                     │
//!                                   swot_latest.md, comparison_latest.md, comment
//! ```
//!
//! Collaborators are built (and credentials checked) before the store is
//! opened, so configuration errors abort the run before any work happens.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::compare::ComparisonPipeline;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::llm::{self, LanguageModel};
use crate::models::{Comparison, StoredAnalysis};
use crate::pipeline::{AnalysisPipeline, PipelineSettings};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::report;
use crate::search::{self, WebSearch};
use crate::store::Store;

pub const ANALYSIS_REPORT: &str = "swot_latest.md";
pub const COMPARISON_REPORT: &str = "comparison_latest.md";

#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub source_file: PathBuf,
    /// Company context; a missing file means empty context.
    pub context_file: PathBuf,
    pub comment_file: Option<PathBuf>,
}

/// External services a run talks to.
pub struct Collaborators<'a> {
    pub model: &'a dyn LanguageModel,
    pub search: &'a dyn WebSearch,
    pub embedder: Option<&'a dyn EmbeddingProvider>,
}

/// What a run produced.
#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub analysis: StoredAnalysis,
    pub comparison: Option<Comparison>,
    pub report_path: PathBuf,
    pub comparison_path: Option<PathBuf>,
    pub comment_path: Option<PathBuf>,
}

/// Run `analyze` with collaborators built from `config`.
pub async fn run_analyze(
    config: &Config,
    args: &AnalyzeArgs,
    reporter: &dyn ProgressReporter,
) -> Result<AnalyzeOutcome> {
    if !args.source_file.is_file() {
        bail!("source file not found: {}", args.source_file.display());
    }

    let model = llm::create_model(&config.llm)?;
    let search = search::create_search(&config.llm, &config.search)?;
    let embedder = embedding::create_provider(&config.embedding)?;

    let collaborators = Collaborators {
        model: model.as_ref(),
        search: search.as_ref(),
        embedder: embedder.as_deref(),
    };
    analyze_with(config, args, &collaborators, reporter).await
}

/// Run `analyze` against explicit collaborators.
pub async fn analyze_with(
    config: &Config,
    args: &AnalyzeArgs,
    collaborators: &Collaborators<'_>,
    reporter: &dyn ProgressReporter,
) -> Result<AnalyzeOutcome> {
    let source_text = std::fs::read_to_string(&args.source_file).with_context(|| {
        format!("source file not found: {}", args.source_file.display())
    })?;
    let context_text = if args.context_file.is_file() {
        std::fs::read_to_string(&args.context_file).with_context(|| {
            format!("Failed to read context file: {}", args.context_file.display())
        })?
    } else {
        tracing::info!(path = %args.context_file.display(), "no context file; using empty context");
        String::new()
    };
    let source_identifier = args
        .source_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.source_file.display().to_string());

    let store = Store::open(&config.db.path).await?;
    let previous = store.latest_analysis().await?;

    let pipeline = AnalysisPipeline::new(
        collaborators.model,
        collaborators.search,
        PipelineSettings::from_config(config),
        reporter,
    );
    let analysis = pipeline
        .run(&source_identifier, &source_text, &context_text)
        .await?;

    let id = store.save_analysis(&analysis, &context_text).await?;
    reporter.report(ProgressEvent::Saved {
        kind: "analysis",
        id,
    });
    let current = StoredAnalysis { id, analysis };

    let comparison = match &previous {
        Some(previous) => Some(
            compare_and_save(&store, config, collaborators, previous, &current, reporter).await?,
        ),
        None => None,
    };
    store.close().await;

    let outputs = &config.outputs.dir;
    let report_path = outputs.join(ANALYSIS_REPORT);
    write_report(&report_path, &report::render_analysis(&current.analysis), reporter)?;

    let comparison_path = match &comparison {
        Some(c) => {
            let path = outputs.join(COMPARISON_REPORT);
            write_report(&path, &report::render_comparison(c), reporter)?;
            Some(path)
        }
        None => None,
    };

    let comment_path = match &args.comment_file {
        Some(path) => {
            let summary =
                report::render_summary(&current.analysis, comparison.as_ref(), &report_path);
            write_report(path, &summary, reporter)?;
            Some(path.clone())
        }
        None => None,
    };

    Ok(AnalyzeOutcome {
        analysis: current,
        comparison,
        report_path,
        comparison_path,
        comment_path,
    })
}

/// Compare two stored analyses and persist the result.
pub async fn compare_and_save(
    store: &Store,
    config: &Config,
    collaborators: &Collaborators<'_>,
    previous: &StoredAnalysis,
    current: &StoredAnalysis,
    reporter: &dyn ProgressReporter,
) -> Result<Comparison> {
    let pipeline = ComparisonPipeline::new(
        collaborators.model,
        collaborators.embedder,
        config.comparison.similarity_threshold,
        config.llm.max_retries,
        &config.llm.language,
        reporter,
    );
    let comparison = pipeline.compare(previous, current).await?;
    let id = store.save_comparison(&comparison).await?;
    reporter.report(ProgressEvent::Saved {
        kind: "comparison",
        id,
    });
    Ok(comparison)
}

/// Write `content` to `path`, creating parent directories.
pub fn write_report(path: &Path, content: &str, reporter: &dyn ProgressReporter) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    reporter.report(ProgressEvent::ReportWritten {
        path: path.to_path_buf(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_source_fails_before_credentials_are_checked() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.llm.api_key_env = "SWOT_TEST_KEY_THAT_IS_NEVER_SET".into();
        config.db.path = tmp.path().join("swot.db");

        let args = AnalyzeArgs {
            source_file: tmp.path().join("missing.md"),
            context_file: tmp.path().join("context.md"),
            comment_file: None,
        };
        let err = run_analyze(&config, &args, &NoProgress).await.unwrap_err();
        assert!(err.to_string().starts_with("source file not found"));
        assert!(!config.db.path.exists());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_the_store_is_opened() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("doc.md");
        std::fs::write(&source, "quarterly report").unwrap();

        let mut config = Config::default();
        config.llm.api_key_env = "SWOT_TEST_KEY_THAT_IS_NEVER_SET".into();
        config.db.path = tmp.path().join("swot.db");

        let args = AnalyzeArgs {
            source_file: source,
            context_file: tmp.path().join("context.md"),
            comment_file: None,
        };
        let err = run_analyze(&config, &args, &NoProgress).await.unwrap_err();
        assert!(err.to_string().contains("SWOT_TEST_KEY_THAT_IS_NEVER_SET"));
        assert!(!config.db.path.exists());
    }

    #[test]
    fn write_report_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a/b/report.md");
        write_report(&path, "# hi", &NoProgress).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# hi");
    }
}
