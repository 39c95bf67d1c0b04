//! Interview attempts, in clean-architecture layers.
//!
//! ```text
//! CLI ──▶ CreateInterviewAttemptInteractor ──▶ dyn InterviewStorage
//!                                                     │
//!                                                     ▼
//!                                          SqliteInterviewStorage
//! ```
//!
//! The interactor holds the single business rule (an attempt must reference
//! an existing interview). Storage implementations only translate DTOs to
//! and from rows.

pub mod dtos;
pub mod error;
pub mod interactor;
pub mod sqlite_storage;
pub mod storage;

pub use dtos::{InterviewAttemptDto, InterviewDto};
pub use error::InterviewError;
pub use interactor::CreateInterviewAttemptInteractor;
pub use sqlite_storage::SqliteInterviewStorage;
pub use storage::InterviewStorage;
