use thiserror::Error;
use uuid::Uuid;

/// Failures while retrieving a listing page. Any of these fails the whole job.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("browser session error: {0}")]
    Browser(#[from] thirtyfour::error::WebDriverError),
    #[error("listing selector `{selector}` did not appear within {secs}s")]
    WaitTimeout { selector: String, secs: u64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(String),
}

/// A single listing could not be turned into a course. Never fails the job.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{message}")]
    Validation {
        message: String,
        audit_id: Option<Uuid>,
    },
    #[error("{message}")]
    Reconciliation {
        message: String,
        audit_id: Option<Uuid>,
    },
}

impl RecordError {
    /// Id of the `scraped_data` row that already records this failure, if one was written.
    pub fn audit_id(&self) -> Option<Uuid> {
        match self {
            RecordError::Validation { audit_id, .. } => *audit_id,
            RecordError::Reconciliation { audit_id, .. } => *audit_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("a scraping job for university {0} is already running")]
    AlreadyRunning(i64),
    #[error("university with id {0} not found")]
    UniversityNotFound(i64),
}

impl From<sqlx::Error> for JobError {
    fn from(value: sqlx::Error) -> Self {
        JobError::Store(StoreError::Database(value))
    }
}
