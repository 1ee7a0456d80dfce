//! In-process store with the same semantics as the Postgres tables. Backs dry
//! runs and the test suite.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    domain::{
        course::{Course, CourseRefresh, NewCourse},
        scraping_job::{
            JobCounts, JobFilter, JobStatus, NewScrapedData, ScrapedData, ScrapingJob,
        },
        university::{ExtractionRule, University},
    },
    error::StoreError,
};

use super::store::{CourseStore, JobStore, UniversityStore};

#[derive(Default)]
struct State {
    universities: Vec<University>,
    rules: Vec<ExtractionRule>,
    courses: Vec<Course>,
    jobs: Vec<ScrapingJob>,
    scraped_data: Vec<ScrapedData>,
    next_id: i64,
    rejected_titles: HashSet<String>,
    reject_start: bool,
    reject_completion: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn job_mut(&mut self, job_id: Uuid) -> Option<&mut ScrapingJob> {
        self.jobs.iter_mut().find(|j| j.id == job_id)
    }

    fn scraped_data_mut(&mut self, id: Uuid) -> Result<&mut ScrapedData, StoreError> {
        self.scraped_data
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("scraped data {}", id)))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_university(&self, name: &str, country: &str, is_active: bool) -> University {
        let mut state = self.lock();
        let university = University {
            id: state.next_id(),
            name: name.to_string(),
            country: country.to_string(),
            is_active,
        };
        state.universities.push(university.clone());
        university
    }

    /// Installs `rule`, replacing any rule the university already had.
    pub fn set_rule(&self, mut rule: ExtractionRule) -> ExtractionRule {
        let mut state = self.lock();
        rule.id = state.next_id();
        state.rules.retain(|r| r.university_id != rule.university_id);
        state.rules.push(rule.clone());
        rule
    }

    pub fn courses(&self) -> Vec<Course> {
        self.lock().courses.clone()
    }

    pub fn jobs(&self) -> Vec<ScrapingJob> {
        self.lock().jobs.clone()
    }

    pub fn scraped_data(&self) -> Vec<ScrapedData> {
        self.lock().scraped_data.clone()
    }

    /// Makes every course write for `title` fail, to exercise per-record failures.
    pub fn reject_course_title(&self, title: &str) {
        self.lock().rejected_titles.insert(title.to_string());
    }

    /// Makes every `start_job` fail without touching the row.
    pub fn reject_job_start(&self) {
        self.lock().reject_start = true;
    }

    /// Makes every `complete_job` fail without touching the row.
    pub fn reject_job_completion(&self) {
        self.lock().reject_completion = true;
    }
}

#[async_trait]
impl UniversityStore for MemoryStore {
    async fn get_university(&self, id: i64) -> Result<Option<University>, StoreError> {
        Ok(self.lock().universities.iter().find(|u| u.id == id).cloned())
    }

    async fn get_active_rule(
        &self,
        university_id: i64,
    ) -> Result<Option<ExtractionRule>, StoreError> {
        Ok(self
            .lock()
            .rules
            .iter()
            .find(|r| r.university_id == university_id && r.is_active)
            .cloned())
    }

    async fn list_schedulable_universities(&self) -> Result<Vec<University>, StoreError> {
        let state = self.lock();
        let with_rule: HashSet<i64> = state
            .rules
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.university_id)
            .collect();

        let mut universities: Vec<University> = state
            .universities
            .iter()
            .filter(|u| u.is_active && with_rule.contains(&u.id))
            .cloned()
            .collect();
        universities.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(universities)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(
        &self,
        university_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<ScrapingJob, StoreError> {
        let job = ScrapingJob {
            id: Uuid::new_v4(),
            university_id,
            status: JobStatus::Pending,
            started_at: None,
            completed_at: None,
            courses_found: 0,
            courses_created: 0,
            courses_updated: 0,
            error_message: String::new(),
            log_data: serde_json::json!({}),
            created_at,
        };
        self.lock().jobs.push(job.clone());
        Ok(job)
    }

    async fn start_job(&self, job_id: Uuid, started_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.reject_start {
            return Err(StoreError::NotFound(format!("pending scraping job {}", job_id)));
        }
        match state.job_mut(job_id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Running;
                job.started_at = Some(started_at);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("pending scraping job {}", job_id))),
        }
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        completed_at: DateTime<Utc>,
        counts: JobCounts,
        log_data: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.reject_completion {
            return Err(StoreError::NotFound(format!("running scraping job {}", job_id)));
        }
        match state.job_mut(job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(completed_at);
                job.courses_found = counts.found;
                job.courses_created = counts.created;
                job.courses_updated = counts.updated;
                job.log_data = log_data;
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("running scraping job {}", job_id))),
        }
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        completed_at: DateTime<Utc>,
        error_message: &str,
        log_data: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        match state.job_mut(job_id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Failed;
                job.completed_at = Some(completed_at);
                job.error_message = error_message.to_string();
                job.log_data = log_data;
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!(
                "unfinished scraping job {}",
                job_id
            ))),
        }
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ScrapingJob>, StoreError> {
        Ok(self.lock().jobs.iter().find(|j| j.id == job_id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<ScrapingJob>, StoreError> {
        let mut jobs: Vec<ScrapingJob> = self
            .lock()
            .jobs
            .iter()
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .filter(|j| filter.university_id.map_or(true, |u| j.university_id == u))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(filter.limit.unwrap_or(100).max(0) as usize);

        Ok(jobs)
    }

    async fn delete_jobs_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.lock();
        let doomed: HashSet<Uuid> = state
            .jobs
            .iter()
            .filter(|j| j.created_at < cutoff)
            .map(|j| j.id)
            .collect();

        state.jobs.retain(|j| !doomed.contains(&j.id));
        state
            .scraped_data
            .retain(|d| !doomed.contains(&d.scraping_job_id));

        Ok(doomed.len() as u64)
    }

    async fn insert_scraped_data(&self, data: NewScrapedData) -> Result<ScrapedData, StoreError> {
        let mut state = self.lock();
        if !state.jobs.iter().any(|j| j.id == data.scraping_job_id) {
            return Err(StoreError::NotFound(format!(
                "scraping job {}",
                data.scraping_job_id
            )));
        }

        let row = ScrapedData {
            id: Uuid::new_v4(),
            scraping_job_id: data.scraping_job_id,
            source_url: data.source_url,
            raw_data: data.raw_data,
            processed: data.processed,
            course_id: None,
            error_message: data.error_message,
            created_at: Utc::now(),
        };
        state.scraped_data.push(row.clone());
        Ok(row)
    }

    async fn mark_scraped_data_processed(
        &self,
        id: Uuid,
        course_id: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let row = state.scraped_data_mut(id)?;
        row.processed = true;
        row.course_id = Some(course_id);
        row.error_message.clear();
        Ok(())
    }

    async fn mark_scraped_data_failed(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let row = state.scraped_data_mut(id)?;
        row.processed = false;
        row.error_message = error_message.to_string();
        Ok(())
    }

    async fn list_scraped_data(
        &self,
        job_id: Uuid,
        processed: Option<bool>,
    ) -> Result<Vec<ScrapedData>, StoreError> {
        let mut rows: Vec<ScrapedData> = self
            .lock()
            .scraped_data
            .iter()
            .filter(|d| d.scraping_job_id == job_id)
            .filter(|d| processed.map_or(true, |p| d.processed == p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(rows)
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_course(
        &self,
        title: &str,
        university_id: i64,
    ) -> Result<Option<Course>, StoreError> {
        let state = self.lock();
        if state.rejected_titles.contains(title) {
            return Err(StoreError::NotFound(format!("course table for `{}`", title)));
        }

        Ok(state
            .courses
            .iter()
            .find(|c| c.title == title && c.university_id == university_id)
            .cloned())
    }

    async fn insert_course(&self, course: NewCourse) -> Result<Option<Course>, StoreError> {
        let mut state = self.lock();
        if state
            .courses
            .iter()
            .any(|c| c.title == course.title && c.university_id == course.university_id)
        {
            return Ok(None);
        }

        let now = Utc::now();
        let row = Course {
            id: state.next_id(),
            title: course.title,
            university_id: course.university_id,
            level: course.level.as_str().to_string(),
            field_of_study: course.field_of_study,
            description: course.description,
            duration_value: course.duration.value,
            duration_unit: course.duration.unit.as_str().to_string(),
            tuition_fee: course.tuition_fee,
            currency: course.currency,
            admission_requirements: course.admission_requirements,
            course_url: course.course_url,
            is_active: true,
            popularity_score: 0,
            created_at: now,
            updated_at: now,
        };
        state.courses.push(row.clone());
        Ok(Some(row))
    }

    async fn refresh_course(
        &self,
        course_id: i64,
        refresh: CourseRefresh,
    ) -> Result<Course, StoreError> {
        let mut state = self.lock();
        let course = state
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| StoreError::NotFound(format!("course {}", course_id)))?;

        if let Some(fee) = refresh.tuition_fee {
            course.tuition_fee = fee;
        }
        if let Some(description) = refresh.description {
            course.description = description;
        }
        course.updated_at = Utc::now();

        Ok(course.clone())
    }
}
