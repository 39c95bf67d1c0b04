//! Vector collection abstraction.
//!
//! The [`VectorStore`] trait is everything the indexing and search pipelines
//! need from a nearest-neighbor backend. Vectors are always supplied by the
//! caller; no backend vectorizes text itself.
//!
//! | Provider | Backend |
//! |----------|---------|
//! | `"weaviate"` | [`WeaviateStore`]: Weaviate REST + GraphQL |
//! | `"sqlite"` | [`SqliteVectorStore`]: local table, brute-force cosine |

pub mod sqlite;
pub mod weaviate;

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{CodeFile, CodeFileMatch};
use crate::{db, migrate};

pub use sqlite::SqliteVectorStore;
pub use weaviate::WeaviateStore;

/// A named collection of code files with externally supplied vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection with the `file_path`/`content` text schema if
    /// it does not exist yet. Returns `true` when it was created.
    async fn ensure_collection(&self) -> Result<bool>;

    /// Insert or replace the entry for `file.file_path`.
    async fn upsert(&self, file: &CodeFile, vector: &[f32]) -> Result<()>;

    /// Up to `limit` entries closest to `vector`, nearest first.
    async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<CodeFileMatch>>;
}

/// Stable object ID for a file within a collection, so re-indexing the same
/// path overwrites instead of duplicating.
pub fn object_id(collection: &str, file_path: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("codeplan:{}/{}", collection, file_path).as_bytes(),
    )
}

/// Open the store selected by `[vector_store].provider`.
pub async fn open_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    let vs = &config.vector_store;
    match vs.provider.as_str() {
        "weaviate" => Ok(Box::new(WeaviateStore::from_config(vs)?)),
        "sqlite" => {
            let pool = db::connect(config).await?;
            migrate::apply_schema(&pool).await?;
            Ok(Box::new(SqliteVectorStore::new(pool, &vs.collection)))
        }
        other => bail!("Unknown vector store provider: {}", other),
    }
}
