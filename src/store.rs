//! Persistence of contexts, analyses, and comparisons.
//!
//! Factor and pair lists are stored as JSON text columns. Timestamps are
//! Unix milliseconds; "latest" means highest `created_at`, then highest id.

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;
use crate::migrate;
use crate::models::{context_fingerprint, Analysis, Comparison, StoredAnalysis};

const ANALYSIS_COLUMNS: &str = "a.id, a.source_file, a.source_text, a.created_at, c.hash, \
     a.strengths_json, a.weaknesses_json, a.opportunities_json, a.threats_json, \
     a.strategic_so_json, a.strategic_wo_json, a.strategic_st_json, a.strategic_wt_json";

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the database at `path` and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Id of the context row for `content`, inserting it if its
    /// fingerprint is new.
    pub async fn get_or_create_context(&self, content: &str) -> Result<i64> {
        let hash = context_fingerprint(content);
        sqlx::query("INSERT OR IGNORE INTO contexts (content, hash, created_at) VALUES (?, ?, ?)")
            .bind(content)
            .bind(&hash)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM contexts WHERE hash = ?")
            .bind(&hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn context_count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contexts")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Persist `analysis` under the context row for `context_text`.
    ///
    /// `context_text` must hash to `analysis.context_fingerprint`, otherwise
    /// the stored row would load back with a different fingerprint.
    pub async fn save_analysis(&self, analysis: &Analysis, context_text: &str) -> Result<i64> {
        ensure!(
            context_fingerprint(context_text) == analysis.context_fingerprint,
            "context text does not match analysis fingerprint {}",
            analysis.context_fingerprint
        );
        let context_id = self.get_or_create_context(context_text).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO analyses (
                context_id, source_file, source_text,
                strengths_json, weaknesses_json, opportunities_json, threats_json,
                strategic_so_json, strategic_wo_json, strategic_st_json, strategic_wt_json,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(context_id)
        .bind(&analysis.source_identifier)
        .bind(&analysis.source_text)
        .bind(encode(&analysis.strengths)?)
        .bind(encode(&analysis.weaknesses)?)
        .bind(encode(&analysis.opportunities)?)
        .bind(encode(&analysis.threats)?)
        .bind(encode(&analysis.strategic_so)?)
        .bind(encode(&analysis.strategic_wo)?)
        .bind(encode(&analysis.strategic_st)?)
        .bind(encode(&analysis.strategic_wt)?)
        .bind(analysis.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save analysis")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn latest_analysis(&self) -> Result<Option<StoredAnalysis>> {
        let sql = format!(
            "SELECT {} FROM analyses a JOIN contexts c ON c.id = a.context_id \
             ORDER BY a.created_at DESC, a.id DESC LIMIT 1",
            ANALYSIS_COLUMNS
        );
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        row.as_ref().map(analysis_from_row).transpose()
    }

    pub async fn get_analysis(&self, id: i64) -> Result<Option<StoredAnalysis>> {
        let sql = format!(
            "SELECT {} FROM analyses a JOIN contexts c ON c.id = a.context_id WHERE a.id = ?",
            ANALYSIS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(analysis_from_row).transpose()
    }

    /// Most recent analyses first.
    pub async fn list_analyses(&self, limit: i64) -> Result<Vec<StoredAnalysis>> {
        let sql = format!(
            "SELECT {} FROM analyses a JOIN contexts c ON c.id = a.context_id \
             ORDER BY a.created_at DESC, a.id DESC LIMIT ?",
            ANALYSIS_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(analysis_from_row).collect()
    }

    pub async fn save_comparison(&self, comparison: &Comparison) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO comparisons \
             (old_analysis_id, new_analysis_id, items_json, summary, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comparison.old_analysis_id)
        .bind(comparison.new_analysis_id)
        .bind(encode(&comparison.items)?)
        .bind(&comparison.summary)
        .bind(comparison.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save comparison")?;

        Ok(result.last_insert_rowid())
    }

    /// Latest comparison whose new side is `new_analysis_id`.
    pub async fn comparison_for(&self, new_analysis_id: i64) -> Result<Option<Comparison>> {
        let row = sqlx::query(
            "SELECT old_analysis_id, new_analysis_id, items_json, summary, created_at \
             FROM comparisons WHERE new_analysis_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(new_analysis_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Comparison {
            old_analysis_id: row.get("old_analysis_id"),
            new_analysis_id: row.get("new_analysis_id"),
            items: decode(row.get("items_json"), "items_json")?,
            summary: row.get("summary"),
            created_at: from_millis(row.get("created_at")),
        }))
    }
}

fn analysis_from_row(row: &SqliteRow) -> Result<StoredAnalysis> {
    let id: i64 = row.get("id");
    let list = |column: &str| -> Option<String> { row.get(column) };
    let with_id = |e: anyhow::Error| e.context(format!("analysis {} has a corrupt column", id));

    let analysis = Analysis {
        source_identifier: row.get("source_file"),
        source_text: row.get("source_text"),
        context_fingerprint: row.get("hash"),
        strengths: decode(list("strengths_json"), "strengths_json").map_err(with_id)?,
        weaknesses: decode(list("weaknesses_json"), "weaknesses_json").map_err(with_id)?,
        opportunities: decode(list("opportunities_json"), "opportunities_json").map_err(with_id)?,
        threats: decode(list("threats_json"), "threats_json").map_err(with_id)?,
        strategic_so: decode(list("strategic_so_json"), "strategic_so_json").map_err(with_id)?,
        strategic_wo: decode(list("strategic_wo_json"), "strategic_wo_json").map_err(with_id)?,
        strategic_st: decode(list("strategic_st_json"), "strategic_st_json").map_err(with_id)?,
        strategic_wt: decode(list("strategic_wt_json"), "strategic_wt_json").map_err(with_id)?,
        created_at: from_millis(row.get("created_at")),
    };
    Ok(StoredAnalysis { id, analysis })
}

fn encode<T: Serialize>(values: &[T]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

/// NULL and empty columns decode to an empty list.
fn decode<T: DeserializeOwned>(raw: Option<String>, column: &str) -> Result<Vec<T>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => {
            serde_json::from_str(text).with_context(|| format!("Failed to decode {}", column))
        }
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
