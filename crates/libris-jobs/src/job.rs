//! Job definitions.

use crate::error::JobError;
use chrono::{DateTime, Utc};
use libris_core::{Book, CreateBookRequest, UpdateBookRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a new random job ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the job ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of post-processing a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Validate,
    Process,
    Notify,
}

impl JobType {
    /// Position of the type tag, used to scale simulated work.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Validate => 0,
            Self::Process => 1,
            Self::Notify => 2,
        }
    }

    /// Tag used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Process => "process",
            Self::Notify => "notify",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "validate" => Ok(Self::Validate),
            "process" => Ok(Self::Process),
            "notify" => Ok(Self::Notify),
            other => Err(JobError::UnknownJobType(other.to_string())),
        }
    }
}

/// A unit of background work about a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookJob {
    pub id: JobId,
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_data: Option<CreateBookRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_data: Option<UpdateBookRequest>,
    pub created_at: DateTime<Utc>,
}

impl BookJob {
    /// Creates a job with a fresh ID and no payload.
    #[must_use]
    pub fn new(job_type: JobType) -> Self {
        Self {
            id: JobId::new(),
            job_type,
            book_data: None,
            update_data: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches create-request data.
    #[must_use]
    pub fn with_book_data(mut self, data: CreateBookRequest) -> Self {
        self.book_data = Some(data);
        self
    }

    /// Attaches update-request data.
    #[must_use]
    pub fn with_update_data(mut self, data: UpdateBookRequest) -> Self {
        self.update_data = Some(data);
        self
    }

    /// Notification job for a freshly created book.
    #[must_use]
    pub fn notify(data: CreateBookRequest) -> Self {
        Self::new(JobType::Notify).with_book_data(data)
    }

    /// Validation job for a create request.
    #[must_use]
    pub fn validate(data: CreateBookRequest) -> Self {
        Self::new(JobType::Validate).with_book_data(data)
    }

    /// Processing job for a create request.
    #[must_use]
    pub fn process(data: CreateBookRequest) -> Self {
        Self::new(JobType::Process).with_book_data(data)
    }
}

/// Result of running one job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub job_type: JobType,
    pub success: bool,
    pub error: Option<String>,
    pub book: Option<Book>,
    pub message: Option<String>,
    pub duration: Duration,
}

impl JobOutcome {
    /// Successful outcome with a message.
    #[must_use]
    pub fn succeeded(job: &BookJob, message: impl Into<String>) -> Self {
        Self {
            job_id: job.id.clone(),
            job_type: job.job_type,
            success: true,
            error: None,
            book: None,
            message: Some(message.into()),
            duration: Duration::ZERO,
        }
    }

    /// Failed outcome carrying the error text.
    #[must_use]
    pub fn failed(job: &BookJob, error: &JobError) -> Self {
        Self {
            job_id: job.id.clone(),
            job_type: job.job_type,
            success: false,
            error: Some(error.to_string()),
            book: None,
            message: None,
            duration: Duration::ZERO,
        }
    }

    /// Attaches a book to the outcome.
    #[must_use]
    pub fn with_book(mut self, book: Book) -> Self {
        self.book = Some(book);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_parse() {
        assert_eq!("notify".parse::<JobType>().unwrap(), JobType::Notify);
        assert_eq!("VALIDATE".parse::<JobType>().unwrap(), JobType::Validate);
        let err = "archive".parse::<JobType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown job type: archive");
    }

    #[test]
    fn test_job_type_serde_tag() {
        let json = serde_json::to_string(&JobType::Process).unwrap();
        assert_eq!(json, "\"process\"");
    }

    #[test]
    fn test_notify_job_carries_request() {
        let request = CreateBookRequest {
            title: "Dune".to_string(),
            ..Default::default()
        };
        let job = BookJob::notify(request);
        assert_eq!(job.job_type, JobType::Notify);
        assert_eq!(job.book_data.unwrap().title, "Dune");
        assert!(job.update_data.is_none());
    }

    #[test]
    fn test_job_ids_unique() {
        assert_ne!(BookJob::new(JobType::Notify).id, BookJob::new(JobType::Notify).id);
    }
}
