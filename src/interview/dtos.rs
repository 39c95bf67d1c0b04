//! Plain data carriers crossing the interactor/storage boundary.

use chrono::{DateTime, Utc};

/// Interview reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Whole seconds.
    pub duration: i64,
}

/// A user's attempt at an interview, before it has an ID.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewAttemptDto {
    pub interview_id: String,
    pub user_id: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub scheduled_end_datetime: Option<DateTime<Utc>>,
}

/// A persisted attempt row.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewAttempt {
    pub id: String,
    pub interview_id: String,
    pub user_id: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub scheduled_end_datetime: Option<DateTime<Utc>>,
}
