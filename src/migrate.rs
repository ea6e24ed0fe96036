use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema. Every statement is idempotent, so this runs on each
/// store open as well as from `swot init`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contexts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            hash TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            context_id INTEGER NOT NULL,
            source_file TEXT NOT NULL,
            source_text TEXT NOT NULL,
            strengths_json TEXT,
            weaknesses_json TEXT,
            opportunities_json TEXT,
            threats_json TEXT,
            strategic_so_json TEXT,
            strategic_wo_json TEXT,
            strategic_st_json TEXT,
            strategic_wt_json TEXT,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (context_id) REFERENCES contexts(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comparisons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            old_analysis_id INTEGER NOT NULL,
            new_analysis_id INTEGER NOT NULL,
            items_json TEXT,
            summary TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            FOREIGN KEY (old_analysis_id) REFERENCES analyses(id),
            FOREIGN KEY (new_analysis_id) REFERENCES analyses(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses(created_at DESC, id DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_comparisons_new ON comparisons(new_analysis_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
