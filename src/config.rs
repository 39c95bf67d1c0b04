//! TOML configuration.
//!
//! Secrets never live in the config file. Each HTTP-facing section names
//! the environment variable that holds its key (`api_key_env`), and
//! [`resolve_api_key`] reads it at client construction time. A `.env` file
//! in the working directory is loaded by the binary before any key lookup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub plan: PlanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Hosted embedding endpoint (`POST {input, encoding_format}`).
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub url: String,
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_embedding_key_env() -> String {
    "AZURE_OPENAI_TEXT_EMBEDDING_API_KEY".to_string()
}

/// Hosted chat-completion endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub url: String,
    #[serde(default = "default_chat_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_chat_key_env() -> String {
    "AZURE_OPEN_AI_CHAT_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_weaviate_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_init_timeout_secs")]
    pub init_timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_vector_provider(),
            url: None,
            api_key_env: default_weaviate_key_env(),
            collection: default_collection(),
            init_timeout_secs: default_init_timeout_secs(),
        }
    }
}

fn default_vector_provider() -> String {
    "sqlite".to_string()
}
fn default_weaviate_key_env() -> String {
    "WEAVIATE_API_KEY".to_string()
}
fn default_collection() -> String {
    "CodeFile".to_string()
}
fn default_init_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_index_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_index_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.py".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlanConfig {
    #[serde(default = "default_queries_dir")]
    pub queries_dir: PathBuf,
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    #[serde(default = "default_code_fence_lang")]
    pub code_fence_lang: String,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            queries_dir: default_queries_dir(),
            template_path: None,
            code_fence_lang: default_code_fence_lang(),
        }
    }
}

fn default_queries_dir() -> PathBuf {
    PathBuf::from("./queries")
}
fn default_code_fence_lang() -> String {
    "python".to_string()
}

/// Read the API key named by `env_var`.
pub fn resolve_api_key(env_var: &str) -> Result<String> {
    std::env::var(env_var).with_context(|| format!("{} environment variable not set", env_var))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.embedding.url.trim().is_empty() {
        anyhow::bail!("embedding.url must not be empty");
    }
    if config.chat.url.trim().is_empty() {
        anyhow::bail!("chat.url must not be empty");
    }

    if config.search.limit < 1 {
        anyhow::bail!("search.limit must be >= 1");
    }

    if config.vector_store.collection.trim().is_empty() {
        anyhow::bail!("vector_store.collection must not be empty");
    }

    match config.vector_store.provider.as_str() {
        "sqlite" => {}
        "weaviate" => {
            if config.vector_store.url.is_none() {
                anyhow::bail!("vector_store.url must be set when provider is 'weaviate'");
            }
        }
        other => anyhow::bail!(
            "Unknown vector store provider: '{}'. Must be sqlite or weaviate.",
            other
        ),
    }

    Ok(config)
}
