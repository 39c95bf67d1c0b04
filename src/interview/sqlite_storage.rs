//! SQLite-backed [`InterviewStorage`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::dtos::{InterviewAttempt, InterviewAttemptDto, InterviewDto};
use super::storage::InterviewStorage;

/// Translates storage operations into queries against the `interviews`,
/// `interview_configs`, `interview_attempts` and `user_interview_access`
/// tables.
pub struct SqliteInterviewStorage {
    pool: SqlitePool,
}

impl SqliteInterviewStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an interview together with its default config row.
    ///
    /// Returns the new interview ID.
    pub async fn create_interview(
        &self,
        title: &str,
        description: Option<&str>,
        duration_secs: i64,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO interviews (id, title, description, duration_secs) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(description)
        .bind(duration_secs)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO interview_configs
                (interview_id, is_default_access_allowed, should_end_interview_after_duration)
            VALUES (?, 0, 1)
            "#,
        )
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Grant `user_id` access to an interview.
    pub async fn grant_access(&self, interview_id: &str, user_id: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO user_interview_access (id, interview_id, user_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(interview_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to grant access to interview {}", interview_id))?;
        Ok(id)
    }

    /// All attempts for a user, oldest first.
    pub async fn list_attempts_for_user(&self, user_id: &str) -> Result<Vec<InterviewAttempt>> {
        let rows = sqlx::query(
            r#"
            SELECT id, interview_id, user_id, start_datetime, end_datetime, scheduled_end_datetime
            FROM interview_attempts
            WHERE user_id = ?
            ORDER BY start_datetime, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_attempt).collect()
    }
}

fn from_ts(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow::anyhow!("Invalid timestamp: {}", ts))
}

fn row_to_attempt(row: &SqliteRow) -> Result<InterviewAttempt> {
    let end: Option<i64> = row.get("end_datetime");
    let scheduled_end: Option<i64> = row.get("scheduled_end_datetime");
    Ok(InterviewAttempt {
        id: row.get("id"),
        interview_id: row.get("interview_id"),
        user_id: row.get("user_id"),
        start_datetime: from_ts(row.get("start_datetime"))?,
        end_datetime: end.map(from_ts).transpose()?,
        scheduled_end_datetime: scheduled_end.map(from_ts).transpose()?,
    })
}

#[async_trait]
impl InterviewStorage for SqliteInterviewStorage {
    async fn get_interview_details(&self, interview_ids: &[String]) -> Result<Vec<InterviewDto>> {
        if interview_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, title, description, duration_secs FROM interviews WHERE id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in interview_ids {
            ids.push_bind(id.as_str());
        }
        ids.push_unseparated(") ORDER BY id");

        let rows = qb.build().fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| InterviewDto {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                duration: row.get("duration_secs"),
            })
            .collect())
    }

    async fn create_interview_attempt(&self, attempt: &InterviewAttemptDto) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO interview_attempts
                (id, interview_id, user_id, start_datetime, end_datetime, scheduled_end_datetime)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&attempt.interview_id)
        .bind(&attempt.user_id)
        .bind(attempt.start_datetime.timestamp())
        .bind(attempt.end_datetime.map(|dt| dt.timestamp()))
        .bind(attempt.scheduled_end_datetime.map(|dt| dt.timestamp()))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert attempt for interview {}", attempt.interview_id))?;

        Ok(id)
    }
}
