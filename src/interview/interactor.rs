use chrono::Utc;
use std::sync::Arc;

use super::dtos::InterviewAttemptDto;
use super::error::InterviewError;
use super::storage::InterviewStorage;

/// Creates an attempt for a user once the interview is known to exist.
pub struct CreateInterviewAttemptInteractor {
    storage: Arc<dyn InterviewStorage>,
}

impl CreateInterviewAttemptInteractor {
    pub fn new(storage: Arc<dyn InterviewStorage>) -> Self {
        Self { storage }
    }

    /// Start a new attempt at `interview_id` for `user_id`.
    ///
    /// The attempt starts now; both end timestamps are left unset.
    ///
    /// # Errors
    ///
    /// [`InterviewError::InvalidInterviewId`] when no such interview exists.
    /// Nothing is written in that case.
    pub async fn create_interview_attempt(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<(), InterviewError> {
        self.validate_interview_details(interview_id).await?;

        let attempt = InterviewAttemptDto {
            interview_id: interview_id.to_string(),
            user_id: user_id.to_string(),
            start_datetime: Utc::now(),
            end_datetime: None,
            scheduled_end_datetime: None,
        };

        let attempt_id = self.storage.create_interview_attempt(&attempt).await?;
        tracing::info!(%attempt_id, interview_id, user_id, "interview attempt created");

        Ok(())
    }

    async fn validate_interview_details(&self, interview_id: &str) -> Result<(), InterviewError> {
        let interviews = self
            .storage
            .get_interview_details(&[interview_id.to_string()])
            .await?;

        if interviews.is_empty() {
            return Err(InterviewError::InvalidInterviewId(interview_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::dtos::InterviewDto;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call so tests can check what the interactor touched.
    #[derive(Default)]
    struct RecordingStorage {
        known_ids: Vec<String>,
        lookups: Mutex<Vec<Vec<String>>>,
        created: Mutex<Vec<InterviewAttemptDto>>,
    }

    impl RecordingStorage {
        fn with_interview(id: &str) -> Self {
            Self {
                known_ids: vec![id.to_string()],
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl InterviewStorage for RecordingStorage {
        async fn get_interview_details(&self, ids: &[String]) -> Result<Vec<InterviewDto>> {
            self.lookups.lock().unwrap().push(ids.to_vec());
            Ok(ids
                .iter()
                .filter(|id| self.known_ids.contains(id))
                .map(|id| InterviewDto {
                    id: id.clone(),
                    title: "Backend screen".to_string(),
                    description: None,
                    duration: 3600,
                })
                .collect())
        }

        async fn create_interview_attempt(&self, attempt: &InterviewAttemptDto) -> Result<String> {
            self.created.lock().unwrap().push(attempt.clone());
            Ok("attempt-1".to_string())
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl InterviewStorage for FailingStorage {
        async fn get_interview_details(&self, _ids: &[String]) -> Result<Vec<InterviewDto>> {
            anyhow::bail!("database is locked")
        }

        async fn create_interview_attempt(&self, _attempt: &InterviewAttemptDto) -> Result<String> {
            unreachable!("lookup fails first")
        }
    }

    #[tokio::test]
    async fn test_unknown_interview_rejected_without_insert() {
        let storage = Arc::new(RecordingStorage::default());
        let interactor = CreateInterviewAttemptInteractor::new(storage.clone());

        let err = interactor
            .create_interview_attempt("missing", "user-1")
            .await
            .unwrap_err();

        assert!(matches!(err, InterviewError::InvalidInterviewId(ref id) if id == "missing"));
        assert!(storage.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_uses_single_id_list() {
        let storage = Arc::new(RecordingStorage::with_interview("iv-1"));
        let interactor = CreateInterviewAttemptInteractor::new(storage.clone());

        interactor
            .create_interview_attempt("iv-1", "user-1")
            .await
            .unwrap();

        let lookups = storage.lookups.lock().unwrap();
        assert_eq!(lookups.as_slice(), &[vec!["iv-1".to_string()]]);
    }

    #[tokio::test]
    async fn test_valid_interview_creates_open_attempt() {
        let storage = Arc::new(RecordingStorage::with_interview("iv-1"));
        let interactor = CreateInterviewAttemptInteractor::new(storage.clone());

        let before = Utc::now();
        interactor
            .create_interview_attempt("iv-1", "user-42")
            .await
            .unwrap();
        let after = Utc::now();

        let created = storage.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let attempt = &created[0];
        assert_eq!(attempt.interview_id, "iv-1");
        assert_eq!(attempt.user_id, "user-42");
        assert!(attempt.start_datetime >= before && attempt.start_datetime <= after);
        assert!(attempt.end_datetime.is_none());
        assert!(attempt.scheduled_end_datetime.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_reported_as_invalid_id() {
        let interactor = CreateInterviewAttemptInteractor::new(Arc::new(FailingStorage));

        let err = interactor
            .create_interview_attempt("iv-1", "user-1")
            .await
            .unwrap_err();

        assert!(matches!(err, InterviewError::Storage(_)));
        assert!(err.to_string().contains("database is locked"));
    }
}
