//! Persistence contract consumed by the interview interactors.

use anyhow::Result;
use async_trait::async_trait;

use super::dtos::{InterviewAttemptDto, InterviewDto};

/// Abstract storage for interviews and attempts.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_interview_details`](InterviewStorage::get_interview_details) | Fetch interviews whose IDs are in the given list |
/// | [`create_interview_attempt`](InterviewStorage::create_interview_attempt) | Insert one attempt, returning its new ID |
#[async_trait]
pub trait InterviewStorage: Send + Sync {
    /// Retrieve details for every existing interview in `interview_ids`.
    ///
    /// Unknown IDs are silently absent from the result.
    async fn get_interview_details(&self, interview_ids: &[String]) -> Result<Vec<InterviewDto>>;

    /// Insert an attempt and return the new row's identifier.
    async fn create_interview_attempt(&self, attempt: &InterviewAttemptDto) -> Result<String>;
}
