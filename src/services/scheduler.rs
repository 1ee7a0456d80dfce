use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time;
use uuid::Uuid;

use crate::{
    configuration::SchedulerSettings, dal::ScrapeStore, domain::scraping_job::JobSummary,
};

use super::{fetcher::Fetcher, job_controller::JobController};

/// Outcome of one scheduled task, logged as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskReport {
    Success(TaskPayload),
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskPayload {
    Job {
        job_id: Uuid,
        courses_found: i32,
        courses_created: i32,
        courses_updated: i32,
    },
    Fleet {
        results: Vec<JobSummary>,
        timestamp: DateTime<Utc>,
    },
    Cleanup {
        deleted_jobs: u64,
    },
}

impl TaskReport {
    fn log(&self, task: &str) {
        match serde_json::to_string(self) {
            Ok(json) => match self {
                TaskReport::Success(_) => log::info!("{}: {}", task, json),
                TaskReport::Error { .. } => log::error!("{}: {}", task, json),
            },
            Err(e) => log::error!("{}: failed to serialize report: {}", task, e),
        }
    }
}

pub async fn scrape_university_task<S, F>(
    controller: &JobController<S, F>,
    university_id: i64,
) -> TaskReport
where
    S: ScrapeStore,
    F: Fetcher,
{
    match controller.run_job_for_university(university_id).await {
        Ok(job) => TaskReport::Success(TaskPayload::Job {
            job_id: job.id,
            courses_found: job.courses_found,
            courses_created: job.courses_created,
            courses_updated: job.courses_updated,
        }),
        Err(e) => TaskReport::Error {
            error: e.to_string(),
        },
    }
}

pub async fn scrape_all_universities_task<S, F>(controller: &JobController<S, F>) -> TaskReport
where
    S: ScrapeStore,
    F: Fetcher,
{
    match controller.run_all_jobs().await {
        Ok(results) => TaskReport::Success(TaskPayload::Fleet {
            results,
            timestamp: Utc::now(),
        }),
        Err(e) => TaskReport::Error {
            error: e.to_string(),
        },
    }
}

pub async fn cleanup_old_jobs_task<S, F>(
    controller: &JobController<S, F>,
    retention_days: i64,
) -> TaskReport
where
    S: ScrapeStore,
    F: Fetcher,
{
    match controller.cleanup_old_jobs(Utc::now(), retention_days).await {
        Ok(deleted_jobs) => TaskReport::Success(TaskPayload::Cleanup { deleted_jobs }),
        Err(e) => TaskReport::Error {
            error: e.to_string(),
        },
    }
}

/// Full-fleet scrape on a fixed interval. The first run starts immediately.
pub async fn scrape_fleet_handler<S, F>(
    controller: Arc<JobController<S, F>>,
    settings: SchedulerSettings,
) where
    S: ScrapeStore,
    F: Fetcher,
{
    log::info!(
        "Started fleet scraper, every {}s",
        settings.scrape_interval_secs
    );
    let mut interval = time::interval(Duration::from_secs(settings.scrape_interval_secs));

    loop {
        interval.tick().await;

        scrape_all_universities_task(&controller)
            .await
            .log("scrape_all_universities");
    }
}

pub async fn cleanup_handler<S, F>(
    controller: Arc<JobController<S, F>>,
    settings: SchedulerSettings,
) where
    S: ScrapeStore,
    F: Fetcher,
{
    log::info!(
        "Started job cleanup, every {}s keeping {} days",
        settings.cleanup_interval_secs,
        settings.retention_days
    );
    let mut interval = time::interval(Duration::from_secs(settings.cleanup_interval_secs));

    loop {
        interval.tick().await;

        cleanup_old_jobs_task(&controller, settings.retention_days)
            .await
            .log("cleanup_old_jobs");
    }
}
