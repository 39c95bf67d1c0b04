use thiserror::Error;

/// Errors surfaced by the interview use cases.
#[derive(Error, Debug)]
pub enum InterviewError {
    /// No interview exists with the requested ID.
    #[error("Invalid interview id: {0}")]
    InvalidInterviewId(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
