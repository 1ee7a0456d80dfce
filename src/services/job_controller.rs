use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    configuration::ScraperSettings,
    dal::ScrapeStore,
    domain::{
        raw_course::RawCourse,
        scraping_job::{JobCounts, JobSummary, NewScrapedData, ScrapingJob},
        university::University,
    },
    error::{FetchError, JobError, StoreError},
};

use super::{
    compiled_rule::CompiledRule,
    extractor::extract_listings,
    fetcher::{FetchedPage, Fetcher},
    lease::LeaseTable,
    reconciler::reconcile,
};

/// Candidate records pulled from one listing page.
struct Harvest {
    page: FetchedPage,
    listings: usize,
    candidates: Vec<RawCourse>,
}

/// Runs scraping jobs end to end and owns their lifecycle rows.
pub struct JobController<S, F> {
    store: Arc<S>,
    fetcher: F,
    settings: ScraperSettings,
    leases: LeaseTable,
}

impl<S, F> JobController<S, F>
where
    S: ScrapeStore,
    F: Fetcher,
{
    pub fn new(store: Arc<S>, fetcher: F, settings: ScraperSettings) -> Self {
        JobController {
            store,
            fetcher,
            settings,
            leases: LeaseTable::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn is_running(&self, university_id: i64) -> bool {
        self.leases.is_held(university_id)
    }

    pub async fn run_job_for_university(
        &self,
        university_id: i64,
    ) -> Result<ScrapingJob, JobError> {
        let university = self
            .store
            .get_university(university_id)
            .await?
            .ok_or(JobError::UniversityNotFound(university_id))?;

        self.run_job(&university).await
    }

    /// One complete scrape of `university`. Configuration and fetch failures
    /// are recorded on the job row and then returned; per-record failures only
    /// leave an audit row behind.
    pub async fn run_job(&self, university: &University) -> Result<ScrapingJob, JobError> {
        let _lease = self
            .leases
            .acquire(university.id)
            .ok_or(JobError::AlreadyRunning(university.id))?;

        let job = self.store.create_job(university.id, Utc::now()).await?;
        if let Err(e) = self.store.start_job(job.id, Utc::now()).await {
            let e = JobError::from(e);
            self.fail(job.id, &e, "start").await;
            return Err(e);
        }
        log::info!("Started scraping job {} for {}", job.id, university.name);

        let rule = match self.resolve_rule(university).await {
            Ok(rule) => rule,
            Err(e) => {
                self.fail(job.id, &e, "configuration").await;
                return Err(e);
            }
        };

        let harvest = match self.harvest(&rule).await {
            Ok(harvest) => harvest,
            Err(e) => {
                let e = JobError::from(e);
                self.fail(job.id, &e, "fetch").await;
                return Err(e);
            }
        };

        let mut counts = JobCounts {
            found: harvest.candidates.len() as i32,
            ..Default::default()
        };

        for raw in harvest.candidates.iter() {
            match reconcile(self.store.as_ref(), raw, university, job.id).await {
                Ok((_, true)) => counts.created += 1,
                Ok((_, false)) => counts.updated += 1,
                Err(e) => {
                    log::error!(
                        "Skipping {:?} in job {}: {}",
                        raw.title.as_deref().unwrap_or_default(),
                        job.id,
                        e
                    );
                    if e.audit_id().is_none() {
                        self.record_failure(job.id, raw, &e.to_string()).await;
                    }
                }
            }
        }

        let log_data = json!({
            "mode": rule.mode.as_str(),
            "source_url": harvest.page.source_url,
            "listings": harvest.listings,
        });
        if let Err(e) = self
            .store
            .complete_job(job.id, Utc::now(), counts, log_data)
            .await
        {
            let e = JobError::from(e);
            self.fail(job.id, &e, "complete").await;
            return Err(e);
        }

        log::info!(
            "Completed scraping job {} for {}: found {}, created {}, updated {}",
            job.id,
            university.name,
            counts.found,
            counts.created,
            counts.updated
        );

        Ok(self
            .store
            .get_job(job.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("scraping job {}", job.id)))?)
    }

    /// Scrapes every schedulable university in turn. A failing university is
    /// reported in its summary and never stops the batch.
    pub async fn run_all_jobs(&self) -> Result<Vec<JobSummary>, JobError> {
        let universities = self.store.list_schedulable_universities().await?;
        let mut summaries = Vec::with_capacity(universities.len());

        for university in universities.iter() {
            let summary = match self.run_job(university).await {
                Ok(job) => JobSummary::from_job(&university.name, &job),
                Err(e) => {
                    log::error!("Scraping {} failed: {}", university.name, e);
                    JobSummary::from_error(&university.name, e.to_string())
                }
            };
            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Deletes jobs created more than `retention_days` before `now`, along
    /// with their scraped data.
    pub async fn cleanup_old_jobs(
        &self,
        now: DateTime<Utc>,
        retention_days: i64,
    ) -> Result<u64, JobError> {
        let cutoff = TimeDelta::try_days(retention_days)
            .and_then(|retention| now.checked_sub_signed(retention))
            .ok_or_else(|| {
                JobError::Configuration(format!(
                    "retention of {} days is out of range",
                    retention_days
                ))
            })?;
        let deleted = self.store.delete_jobs_created_before(cutoff).await?;
        log::info!("Deleted {} scraping jobs created before {}", deleted, cutoff);

        Ok(deleted)
    }

    async fn resolve_rule(&self, university: &University) -> Result<CompiledRule, JobError> {
        let rule = self
            .store
            .get_active_rule(university.id)
            .await?
            .ok_or_else(|| JobError::Configuration("no active rule".to_string()))?;

        CompiledRule::compile(&rule, &self.settings.user_agent).map_err(JobError::Configuration)
    }

    /// Fetches the listing page and extracts candidates, throttling per listing.
    /// The fetch session is closed before this returns, whatever the outcome.
    async fn harvest(&self, rule: &CompiledRule) -> Result<Harvest, FetchError> {
        let mut session = self.fetcher.open(rule).await?;
        let fetched = session.fetch_listing_page(rule).await;
        session.close().await;
        let page = fetched?;

        let listings = extract_listings(&page.html, rule, &page.source_url);
        let listing_count = listings.len();
        let mut candidates = Vec::with_capacity(listing_count);

        for listing in listings {
            if let Some(raw) = listing {
                candidates.push(raw);
            }
            if !rule.wait_time.is_zero() {
                tokio::time::sleep(rule.wait_time).await;
            }
        }

        Ok(Harvest {
            page,
            listings: listing_count,
            candidates,
        })
    }

    async fn fail(&self, job_id: Uuid, error: &JobError, stage: &str) {
        log::error!("Scraping job {} failed during {}: {}", job_id, stage, error);

        if let Err(e) = self
            .store
            .fail_job(job_id, Utc::now(), &error.to_string(), json!({ "stage": stage }))
            .await
        {
            log::error!("Failed to mark scraping job {} as failed: {}", job_id, e);
        }
    }

    async fn record_failure(&self, job_id: Uuid, raw: &RawCourse, message: &str) {
        let row = NewScrapedData {
            scraping_job_id: job_id,
            source_url: raw.url.clone(),
            raw_data: raw.to_json(),
            processed: false,
            error_message: message.to_string(),
        };

        if let Err(e) = self.store.insert_scraped_data(row).await {
            log::error!("Failed to record scraped data error for job {}: {}", job_id, e);
        }
    }
}
