//! Local [`VectorStore`] in the project's SQLite database.
//!
//! Vectors are stored as little-endian f32 BLOBs. Search is brute-force
//! cosine over every row of the collection, which is fine for a single
//! project's source tree.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{CodeFile, CodeFileMatch};

use super::{object_id, VectorStore};

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool, collection: &str) -> Self {
        Self {
            pool,
            collection: collection.to_string(),
        }
    }

    /// Number of entries in the collection.
    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM code_files WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ensure_collection(&self) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
                .bind(&self.collection)
                .bind(chrono::Utc::now().timestamp())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert(&self, file: &CodeFile, vector: &[f32]) -> Result<()> {
        let id = object_id(&self.collection, &file.file_path).to_string();
        sqlx::query(
            r#"
            INSERT INTO code_files (id, collection, file_path, content, embedding)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, file_path) DO UPDATE SET
                content = excluded.content,
                embedding = excluded.embedding
            "#,
        )
        .bind(&id)
        .bind(&self.collection)
        .bind(&file.file_path)
        .bind(&file.content)
        .bind(vec_to_blob(vector))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<CodeFileMatch>> {
        let rows =
            sqlx::query("SELECT file_path, content, embedding FROM code_files WHERE collection = ?")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let file_path: String = row.get("file_path");
            let blob: Vec<u8> = row.get("embedding");
            let stored = blob_to_vec(&blob);
            if stored.len() != vector.len() {
                bail!(
                    "Vector dimension mismatch for {}: stored {}, query {} (re-index after changing the embedding model)",
                    file_path,
                    stored.len(),
                    vector.len()
                );
            }
            matches.push(CodeFileMatch {
                file_path,
                content: row.get("content"),
                distance: Some(1.0 - cosine_similarity(vector, &stored)),
            });
        }

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });
        matches.truncate(limit);

        Ok(matches)
    }
}
