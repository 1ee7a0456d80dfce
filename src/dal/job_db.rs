use chrono::{DateTime, Utc};
use sqlx::{postgres::PgQueryResult, PgPool};
use uuid::Uuid;

use crate::domain::scraping_job::{JobCounts, JobFilter, JobStatus, ScrapingJob};

const JOB_COLUMNS: &str = r"
    id,
    university_id,
    status,
    started_at,
    completed_at,
    courses_found,
    courses_created,
    courses_updated,
    error_message,
    log_data,
    created_at
";

pub async fn insert_job(
    pool: &PgPool,
    university_id: i64,
    created_at: DateTime<Utc>,
) -> Result<ScrapingJob, sqlx::Error> {
    sqlx::query_as::<_, ScrapingJob>(&format!(
        r"
        insert into scraping_jobs
            (id, university_id, status, created_at)
        values
            ($1, $2, $3, $4)
        returning {JOB_COLUMNS}
        "
    ))
    .bind(Uuid::new_v4())
    .bind(university_id)
    .bind(JobStatus::Pending)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub async fn set_running(
    pool: &PgPool,
    job_id: Uuid,
    started_at: DateTime<Utc>,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        update scraping_jobs set
            status = 'running',
            started_at = $2
        where
            id = $1 and
            status = 'pending'
        ",
    )
    .bind(job_id)
    .bind(started_at)
    .execute(pool)
    .await
}

pub async fn set_completed(
    pool: &PgPool,
    job_id: Uuid,
    completed_at: DateTime<Utc>,
    counts: JobCounts,
    log_data: serde_json::Value,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        update scraping_jobs set
            status = 'completed',
            completed_at = $2,
            courses_found = $3,
            courses_created = $4,
            courses_updated = $5,
            log_data = $6
        where
            id = $1 and
            status = 'running'
        ",
    )
    .bind(job_id)
    .bind(completed_at)
    .bind(counts.found)
    .bind(counts.created)
    .bind(counts.updated)
    .bind(log_data)
    .execute(pool)
    .await
}

pub async fn set_failed(
    pool: &PgPool,
    job_id: Uuid,
    completed_at: DateTime<Utc>,
    error_message: &str,
    log_data: serde_json::Value,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        update scraping_jobs set
            status = 'failed',
            completed_at = $2,
            error_message = $3,
            log_data = $4
        where
            id = $1 and
            status in ('pending', 'running')
        ",
    )
    .bind(job_id)
    .bind(completed_at)
    .bind(error_message)
    .bind(log_data)
    .execute(pool)
    .await
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<ScrapingJob>, sqlx::Error> {
    sqlx::query_as::<_, ScrapingJob>(&format!(
        r"
        select {JOB_COLUMNS}
        from
            scraping_jobs
        where
            id = $1
        "
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_jobs(pool: &PgPool, filter: &JobFilter) -> Result<Vec<ScrapingJob>, sqlx::Error> {
    sqlx::query_as::<_, ScrapingJob>(&format!(
        r"
        select {JOB_COLUMNS}
        from
            scraping_jobs
        where
            ($1::scraping_job_status is null or status = $1) and
            ($2::bigint is null or university_id = $2)
        order by created_at desc
        limit $3
        "
    ))
    .bind(filter.status)
    .bind(filter.university_id)
    .bind(filter.limit.unwrap_or(100))
    .fetch_all(pool)
    .await
}

/// Scraped data goes with its job through `on delete cascade`.
pub async fn delete_jobs_created_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r"
        delete from scraping_jobs
        where
            created_at < $1
        ",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
