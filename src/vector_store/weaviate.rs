//! Weaviate-backed [`VectorStore`].
//!
//! Talks to the REST and GraphQL endpoints directly:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | probe collection | `GET /v1/schema/{class}` (404 = absent) |
//! | create collection | `POST /v1/schema` with `vectorizer: "none"` |
//! | upsert | `POST /v1/batch/objects` with explicit `id` and `vector` |
//! | search | `POST /v1/graphql` `Get { Class(nearVector, limit) }` |
//!
//! The batch endpoint overwrites an object that already has the given ID,
//! which is what gives [`VectorStore::upsert`] its replace semantics.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::VectorStoreConfig;
use crate::models::{CodeFile, CodeFileMatch};

use super::{object_id, VectorStore};

pub struct WeaviateStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl WeaviateStore {
    /// Build from config. The API key is optional: anonymous access is
    /// used when `vector_store.api_key_env` is unset in the environment.
    pub fn from_config(config: &VectorStoreConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow!("vector_store.url required for Weaviate"))?;
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(&url, api_key, &config.collection, config.init_timeout_secs)
    }

    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        init_timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(init_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
            collection: collection.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn class_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "class": self.collection,
            "vectorizer": "none",
            "properties": [
                {"name": "file_path", "dataType": ["text"]},
                {"name": "content", "dataType": ["text"]},
            ],
        })
    }
}

async fn error_for_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("Weaviate {} failed {}: {}", what, status, body)
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn ensure_collection(&self) -> Result<bool> {
        let probe = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/schema/{}", self.collection),
            )
            .send()
            .await
            .context("Failed to reach Weaviate")?;

        if probe.status().is_success() {
            return Ok(false);
        }
        if probe.status() != reqwest::StatusCode::NOT_FOUND {
            error_for_status(probe, "schema lookup").await?;
        }

        let response = self
            .request(reqwest::Method::POST, "/v1/schema")
            .json(&self.class_schema())
            .send()
            .await?;
        error_for_status(response, "collection create").await?;
        Ok(true)
    }

    async fn upsert(&self, file: &CodeFile, vector: &[f32]) -> Result<()> {
        let body = serde_json::json!({
            "objects": [{
                "class": self.collection,
                "id": object_id(&self.collection, &file.file_path).to_string(),
                "properties": {
                    "file_path": file.file_path,
                    "content": file.content,
                },
                "vector": vector,
            }]
        });

        let response = self
            .request(reqwest::Method::POST, "/v1/batch/objects")
            .json(&body)
            .send()
            .await?;
        let response = error_for_status(response, "batch insert").await?;
        let json: serde_json::Value = response.json().await?;

        if let Some(message) = batch_error(&json) {
            bail!("Weaviate rejected {}: {}", file.file_path, message);
        }
        Ok(())
    }

    async fn near_vector(&self, vector: &[f32], limit: usize) -> Result<Vec<CodeFileMatch>> {
        let query = near_vector_query(&self.collection, vector, limit);
        let response = self
            .request(reqwest::Method::POST, "/v1/graphql")
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;
        let response = error_for_status(response, "nearVector query").await?;
        let json: serde_json::Value = response.json().await?;

        parse_near_vector_response(&json, &self.collection)
    }
}

fn near_vector_query(collection: &str, vector: &[f32], limit: usize) -> String {
    let components: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!(
        "{{ Get {{ {}(nearVector: {{vector: [{}]}}, limit: {}) {{ file_path content _additional {{ distance }} }} }} }}",
        collection,
        components.join(", "),
        limit
    )
}

/// First error message in a batch response, if any object failed.
fn batch_error(json: &serde_json::Value) -> Option<String> {
    json.as_array()?.iter().find_map(|obj| {
        let errors = obj.pointer("/result/errors/error")?.as_array()?;
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    })
}

fn parse_near_vector_response(
    json: &serde_json::Value,
    collection: &str,
) -> Result<Vec<CodeFileMatch>> {
    if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            bail!("Weaviate query error: {}", messages.join("; "));
        }
    }

    let objects = json
        .get("data")
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(collection))
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Invalid Weaviate response: missing data.Get.{}", collection))?;

    objects
        .iter()
        .map(|obj| -> Result<CodeFileMatch> {
            let text = |field: &str| {
                obj.get(field)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("Invalid Weaviate response: missing {}", field))
            };
            Ok(CodeFileMatch {
                file_path: text("file_path")?,
                content: text("content")?,
                distance: obj
                    .pointer("/_additional/distance")
                    .and_then(|d| d.as_f64())
                    .map(|d| d as f32),
            })
        })
        .collect()
}
