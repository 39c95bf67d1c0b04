//! Semantic code search: embed the query, then nearest-neighbor lookup.

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::embedding::{AzureEmbedder, Embedder};
use crate::models::CodeFileMatch;
use crate::vector_store::{self, VectorStore};

/// Up to `limit` indexed files closest to `query`.
///
/// A collection smaller than `limit` yields every entry; the result is
/// never padded.
pub async fn search_code_base(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    query: &str,
    limit: usize,
) -> Result<Vec<CodeFileMatch>> {
    let query_vec = embedder
        .embed(query)
        .await
        .context("Failed to embed query")?;
    store.near_vector(&query_vec, limit).await
}

/// `codeplan search` entry point.
pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Search query must not be empty");
    }

    let embedder = AzureEmbedder::from_config(&config.embedding)?;
    let store = vector_store::open_store(config).await?;
    let results = search_code_base(&embedder, store.as_ref(), query, config.search.limit).await?;

    print!("{}", render_results(query, &results));
    Ok(())
}

/// Text shown by `codeplan search`.
pub fn render_results(query: &str, results: &[CodeFileMatch]) -> String {
    let rule = "-".repeat(80);
    let mut out = String::new();
    out.push_str(&format!("\nSearch Query: {}\n", query));
    out.push_str("\nMatching Files:\n");
    out.push_str(&format!("{}\n", rule));

    if results.is_empty() {
        out.push_str("No results.\n");
        return out;
    }

    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("\n{}. File: {}\n", i + 1, result.file_path));
        if let Some(distance) = result.distance {
            out.push_str(&format!("Distance: {:.4}\n", distance));
        }
        out.push_str("Content:\n");
        out.push_str(&format!("{}\n", "-".repeat(40)));
        out.push_str(&format!("{}\n", result.content));
        out.push_str(&format!("{}\n", rule));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_numbers_results() {
        let results = vec![
            CodeFileMatch {
                file_path: "a.py".to_string(),
                content: "x = 1".to_string(),
                distance: Some(0.125),
            },
            CodeFileMatch {
                file_path: "b.py".to_string(),
                content: "y = 2".to_string(),
                distance: None,
            },
        ];
        let out = render_results("models", &results);
        assert!(out.contains("Search Query: models"));
        assert!(out.contains("1. File: a.py"));
        assert!(out.contains("Distance: 0.1250"));
        assert!(out.contains("2. File: b.py"));
        assert!(out.contains("y = 2"));
    }

    #[test]
    fn test_render_empty() {
        assert!(render_results("q", &[]).contains("No results."));
    }
}
