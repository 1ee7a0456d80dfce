use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::{
        course::{Course, CourseRefresh, NewCourse},
        scraping_job::{JobCounts, JobFilter, NewScrapedData, ScrapedData, ScrapingJob},
        university::{ExtractionRule, University},
    },
    error::StoreError,
};

use super::{course_db, job_db, scraped_data_db, university_db};

/// Read-only view of scrape targets.
#[async_trait]
pub trait UniversityStore: Send + Sync {
    async fn get_university(&self, id: i64) -> Result<Option<University>, StoreError>;

    async fn get_active_rule(&self, university_id: i64)
        -> Result<Option<ExtractionRule>, StoreError>;

    async fn list_schedulable_universities(&self) -> Result<Vec<University>, StoreError>;
}

/// Job lifecycle and audit trail. Writes belong to the job controller only.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(
        &self,
        university_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<ScrapingJob, StoreError>;

    async fn start_job(&self, job_id: Uuid, started_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn complete_job(
        &self,
        job_id: Uuid,
        completed_at: DateTime<Utc>,
        counts: JobCounts,
        log_data: serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn fail_job(
        &self,
        job_id: Uuid,
        completed_at: DateTime<Utc>,
        error_message: &str,
        log_data: serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ScrapingJob>, StoreError>;

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<ScrapingJob>, StoreError>;

    async fn delete_jobs_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn insert_scraped_data(&self, data: NewScrapedData) -> Result<ScrapedData, StoreError>;

    async fn mark_scraped_data_processed(&self, id: Uuid, course_id: i64)
        -> Result<(), StoreError>;

    async fn mark_scraped_data_failed(&self, id: Uuid, error_message: &str)
        -> Result<(), StoreError>;

    async fn list_scraped_data(
        &self,
        job_id: Uuid,
        processed: Option<bool>,
    ) -> Result<Vec<ScrapedData>, StoreError>;
}

/// Narrow write access to the course catalogue: insert and fee/description refresh.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_course(&self, title: &str, university_id: i64)
        -> Result<Option<Course>, StoreError>;

    /// `Ok(None)` if the `(title, university)` key is already taken.
    async fn insert_course(&self, course: NewCourse) -> Result<Option<Course>, StoreError>;

    async fn refresh_course(&self, course_id: i64, refresh: CourseRefresh)
        -> Result<Course, StoreError>;
}

pub trait ScrapeStore: UniversityStore + JobStore + CourseStore {}

impl<T: UniversityStore + JobStore + CourseStore> ScrapeStore for T {}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn expect_one_row(rows: u64, what: String) -> Result<(), StoreError> {
    match rows {
        0 => Err(StoreError::NotFound(what)),
        _ => Ok(()),
    }
}

#[async_trait]
impl UniversityStore for PgStore {
    async fn get_university(&self, id: i64) -> Result<Option<University>, StoreError> {
        Ok(university_db::get_university(&self.pool, id).await?)
    }

    async fn get_active_rule(
        &self,
        university_id: i64,
    ) -> Result<Option<ExtractionRule>, StoreError> {
        Ok(university_db::get_active_rule(&self.pool, university_id).await?)
    }

    async fn list_schedulable_universities(&self) -> Result<Vec<University>, StoreError> {
        Ok(university_db::get_schedulable_universities(&self.pool).await?)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(
        &self,
        university_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<ScrapingJob, StoreError> {
        Ok(job_db::insert_job(&self.pool, university_id, created_at).await?)
    }

    async fn start_job(&self, job_id: Uuid, started_at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = job_db::set_running(&self.pool, job_id, started_at).await?;
        expect_one_row(result.rows_affected(), format!("pending scraping job {}", job_id))
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        completed_at: DateTime<Utc>,
        counts: JobCounts,
        log_data: serde_json::Value,
    ) -> Result<(), StoreError> {
        let result =
            job_db::set_completed(&self.pool, job_id, completed_at, counts, log_data).await?;
        expect_one_row(result.rows_affected(), format!("running scraping job {}", job_id))
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        completed_at: DateTime<Utc>,
        error_message: &str,
        log_data: serde_json::Value,
    ) -> Result<(), StoreError> {
        let result =
            job_db::set_failed(&self.pool, job_id, completed_at, error_message, log_data).await?;
        expect_one_row(result.rows_affected(), format!("unfinished scraping job {}", job_id))
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ScrapingJob>, StoreError> {
        Ok(job_db::get_job(&self.pool, job_id).await?)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<ScrapingJob>, StoreError> {
        Ok(job_db::get_jobs(&self.pool, filter).await?)
    }

    async fn delete_jobs_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(job_db::delete_jobs_created_before(&self.pool, cutoff).await?)
    }

    async fn insert_scraped_data(&self, data: NewScrapedData) -> Result<ScrapedData, StoreError> {
        Ok(scraped_data_db::insert_scraped_data(&self.pool, data).await?)
    }

    async fn mark_scraped_data_processed(
        &self,
        id: Uuid,
        course_id: i64,
    ) -> Result<(), StoreError> {
        let result = scraped_data_db::set_processed(&self.pool, id, course_id).await?;
        expect_one_row(result.rows_affected(), format!("scraped data {}", id))
    }

    async fn mark_scraped_data_failed(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> Result<(), StoreError> {
        let result = scraped_data_db::set_error(&self.pool, id, error_message).await?;
        expect_one_row(result.rows_affected(), format!("scraped data {}", id))
    }

    async fn list_scraped_data(
        &self,
        job_id: Uuid,
        processed: Option<bool>,
    ) -> Result<Vec<ScrapedData>, StoreError> {
        Ok(scraped_data_db::get_scraped_data_for_job(&self.pool, job_id, processed).await?)
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn find_course(
        &self,
        title: &str,
        university_id: i64,
    ) -> Result<Option<Course>, StoreError> {
        Ok(course_db::get_course(&self.pool, title, university_id).await?)
    }

    async fn insert_course(&self, course: NewCourse) -> Result<Option<Course>, StoreError> {
        Ok(course_db::insert_course(&self.pool, course).await?)
    }

    async fn refresh_course(
        &self,
        course_id: i64,
        refresh: CourseRefresh,
    ) -> Result<Course, StoreError> {
        Ok(course_db::refresh_course(&self.pool, course_id, refresh).await?)
    }
}
