//! Schema creation. Every statement is idempotent, so `codeplan init` can be
//! run any number of times.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interviews (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            duration_secs INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_configs (
            interview_id TEXT PRIMARY KEY,
            is_default_access_allowed INTEGER NOT NULL DEFAULT 0,
            should_end_interview_after_duration INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (interview_id) REFERENCES interviews(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_attempts (
            id TEXT PRIMARY KEY,
            interview_id TEXT NOT NULL,
            user_id TEXT NOT NULL CHECK (length(user_id) <= 36),
            start_datetime INTEGER NOT NULL,
            end_datetime INTEGER,
            scheduled_end_datetime INTEGER,
            FOREIGN KEY (interview_id) REFERENCES interviews(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_interview_access (
            id TEXT PRIMARY KEY,
            interview_id TEXT NOT NULL,
            user_id TEXT NOT NULL CHECK (length(user_id) <= 36),
            FOREIGN KEY (interview_id) REFERENCES interviews(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Local vector backend; unused when the Weaviate store is configured
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS code_files (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            file_path TEXT NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(collection, file_path)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attempts_user_id ON interview_attempts(user_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attempts_interview_id ON interview_attempts(interview_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_access_user_id ON user_interview_access(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
