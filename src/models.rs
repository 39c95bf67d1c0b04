//! Data types flowing through the indexing and planning pipelines.

use serde::{Deserialize, Serialize};

/// A source file as stored in the vector collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeFile {
    /// Path relative to the indexed root, `/`-separated.
    pub file_path: String,
    pub content: String,
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeFileMatch {
    pub file_path: String,
    pub content: String,
    /// Distance reported by the store, smaller is closer.
    pub distance: Option<f32>,
}

/// Outcome counters for one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
}
