use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scraping_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One scrape attempt for one university.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ScrapingJob {
    pub id: Uuid,
    pub university_id: i64,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub courses_found: i32,
    pub courses_created: i32,
    pub courses_updated: i32,
    pub error_message: String,
    pub log_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub found: i32,
    pub created: i32,
    pub updated: i32,
}

/// Audit row for one raw candidate record observed during a job.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ScrapedData {
    pub id: Uuid,
    pub scraping_job_id: Uuid,
    pub source_url: String,
    pub raw_data: serde_json::Value,
    pub processed: bool,
    pub course_id: Option<i64>,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewScrapedData {
    pub scraping_job_id: Uuid,
    pub source_url: String,
    pub raw_data: serde_json::Value,
    pub processed: bool,
    pub error_message: String,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub university_id: Option<i64>,
    pub limit: Option<i64>,
}

/// One line of a fleet run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub university: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobOutcome {
    Counts {
        courses_found: i32,
        courses_created: i32,
        courses_updated: i32,
    },
    Error {
        error: String,
    },
}

impl JobSummary {
    pub fn from_job(university: &str, job: &ScrapingJob) -> Self {
        JobSummary {
            university: university.to_string(),
            status: job.status,
            outcome: JobOutcome::Counts {
                courses_found: job.courses_found,
                courses_created: job.courses_created,
                courses_updated: job.courses_updated,
            },
        }
    }

    pub fn from_error(university: &str, error: String) -> Self {
        JobSummary {
            university: university.to_string(),
            status: JobStatus::Failed,
            outcome: JobOutcome::Error { error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn summary_serializes_flat() {
        let summary = JobSummary::from_error("Uni of Nowhere", "no active rule".to_string());
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "university": "Uni of Nowhere",
                "status": "failed",
                "error": "no active rule",
            })
        );
    }
}
