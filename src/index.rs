//! Code-base indexing pipeline.
//!
//! Walks `[index].root`, and for every eligible file: read → skip if blank →
//! embed → upsert into the vector collection. A failure on one file is
//! logged and counted; the walk continues with the next file.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, IndexConfig};
use crate::embedding::{AzureEmbedder, Embedder};
use crate::models::{CodeFile, IndexReport};
use crate::vector_store::{self, VectorStore};

/// Subtrees never indexed, on top of `[index].exclude_globs`.
pub const DEFAULT_EXCLUDES: &[&str] = &["**/scripts/**", "**/venv/**", "**/.specstory/**"];

/// An eligible file found by [`scan_code_files`].
#[derive(Debug, Clone)]
pub struct CodeFileEntry {
    pub path: PathBuf,
    /// Root-relative, `/`-separated.
    pub relative_path: String,
}

/// `codeplan index` entry point.
pub async fn run_index(config: &Config) -> Result<()> {
    let embedder = AzureEmbedder::from_config(&config.embedding)?;
    let store = vector_store::open_store(config).await?;

    if store.ensure_collection().await? {
        println!(
            "Collection '{}' created successfully",
            config.vector_store.collection
        );
    } else {
        println!(
            "Collection '{}' already exists",
            config.vector_store.collection
        );
    }

    let report = index_code_base(&config.index, &embedder, store.as_ref()).await?;

    println!("index {}", config.index.root.display());
    println!("  processed: {}", report.processed);
    println!("  skipped (empty): {}", report.skipped);
    println!("  failed: {}", report.failed);
    println!("ok");
    Ok(())
}

/// Index every eligible file under `config.root`.
///
/// Only a failure to walk the tree aborts the run; per-file errors are
/// counted in [`IndexReport::failed`].
pub async fn index_code_base(
    config: &IndexConfig,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
) -> Result<IndexReport> {
    let entries = scan_code_files(config)?;
    let mut report = IndexReport::default();

    for entry in &entries {
        match index_file(entry, embedder, store).await {
            Ok(true) => {
                report.processed += 1;
                tracing::info!(file = %entry.relative_path, "processed");
            }
            Ok(false) => {
                report.skipped += 1;
                tracing::debug!(file = %entry.relative_path, "skipped empty file");
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    file = %entry.path.display(),
                    error = %format!("{:#}", e),
                    "error processing file"
                );
            }
        }
    }

    Ok(report)
}

/// Returns `Ok(false)` when the file was blank and nothing was sent.
async fn index_file(
    entry: &CodeFileEntry,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
) -> Result<bool> {
    let content = std::fs::read_to_string(&entry.path)
        .with_context(|| format!("Failed to read {}", entry.path.display()))?;

    if content.trim().is_empty() {
        return Ok(false);
    }

    let vector = embedder
        .embed(&content)
        .await
        .context("Failed to get embedding")?;

    let file = CodeFile {
        file_path: entry.relative_path.clone(),
        content,
    };
    store.upsert(&file, &vector).await?;
    Ok(true)
}

/// List eligible files in sorted relative-path order.
pub fn scan_code_files(config: &IndexConfig) -> Result<Vec<CodeFileEntry>> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Index root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !is_excluded_dir(&exclude_set, &relative_path(root, e.path()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("Failed to read {}", root.display()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel_str = relative_path(root, path);

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        entries.push(CodeFileEntry {
            path: path.to_path_buf(),
            relative_path: rel_str,
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A directory is pruned when a pattern matches it or anything inside it.
fn is_excluded_dir(exclude_set: &GlobSet, rel_dir: &str) -> bool {
    exclude_set.is_match(rel_dir) || exclude_set.is_match(format!("{}/_", rel_dir))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
