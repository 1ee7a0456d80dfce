use uuid::Uuid;

use crate::{
    dal::{CourseStore, JobStore},
    domain::{
        course::{
            classify_field_of_study, Course, CourseLevel, CourseRefresh, NewCourse,
            DEFAULT_CURRENCY,
        },
        raw_course::RawCourse,
        scraping_job::NewScrapedData,
        university::University,
    },
    error::{RecordError, StoreError},
};

/// Maps one raw record onto the course catalogue. Returns the course and
/// whether it was newly created.
pub async fn reconcile<S>(
    store: &S,
    raw: &RawCourse,
    university: &University,
    job_id: Uuid,
) -> Result<(Course, bool), RecordError>
where
    S: JobStore + CourseStore + ?Sized,
{
    let title = match raw.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => {
            return Err(RecordError::Validation {
                message: "course title is missing".to_string(),
                audit_id: None,
            })
        }
    };

    let audit = store
        .insert_scraped_data(NewScrapedData {
            scraping_job_id: job_id,
            source_url: raw.url.clone(),
            raw_data: raw.to_json(),
            processed: false,
            error_message: String::new(),
        })
        .await
        .map_err(|e| RecordError::Reconciliation {
            message: e.to_string(),
            audit_id: None,
        })?;

    match upsert_course(store, raw, &title, university).await {
        Ok((course, created)) => {
            store
                .mark_scraped_data_processed(audit.id, course.id)
                .await
                .map_err(|e| RecordError::Reconciliation {
                    message: e.to_string(),
                    audit_id: Some(audit.id),
                })?;
            Ok((course, created))
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(mark_err) = store.mark_scraped_data_failed(audit.id, &message).await {
                log::error!(
                    "Failed to record error on scraped data {}: {}",
                    audit.id,
                    mark_err
                );
            }
            Err(RecordError::Reconciliation {
                message,
                audit_id: Some(audit.id),
            })
        }
    }
}

async fn upsert_course<S>(
    store: &S,
    raw: &RawCourse,
    title: &str,
    university: &University,
) -> Result<(Course, bool), StoreError>
where
    S: CourseStore + ?Sized,
{
    if let Some(existing) = store.find_course(title, university.id).await? {
        return Ok((refresh(store, existing, raw).await?, false));
    }

    match store.insert_course(new_course(raw, title, university)).await? {
        Some(course) => Ok((course, true)),
        None => {
            // lost an insert race on (title, university)
            let existing = store
                .find_course(title, university.id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("course `{}`", title)))?;
            Ok((refresh(store, existing, raw).await?, false))
        }
    }
}

/// Only fee and description may change on an existing course. A zero fee or
/// blank description leaves the stored value alone.
async fn refresh<S>(store: &S, existing: Course, raw: &RawCourse) -> Result<Course, StoreError>
where
    S: CourseStore + ?Sized,
{
    let refresh = CourseRefresh {
        tuition_fee: raw.fee.filter(|fee| *fee != 0.0),
        description: raw.description.clone().filter(|d| !d.is_empty()),
    };

    match refresh == CourseRefresh::default() {
        true => Ok(existing),
        false => store.refresh_course(existing.id, refresh).await,
    }
}

fn new_course(raw: &RawCourse, title: &str, university: &University) -> NewCourse {
    NewCourse {
        title: title.to_string(),
        university_id: university.id,
        level: raw.level.unwrap_or(CourseLevel::Bachelor),
        field_of_study: classify_field_of_study(title).to_string(),
        description: raw.description.clone().unwrap_or_default(),
        duration: raw.duration.unwrap_or_default(),
        tuition_fee: raw.fee.unwrap_or(0.0),
        currency: DEFAULT_CURRENCY.to_string(),
        admission_requirements: raw.requirements.clone().unwrap_or_default(),
        course_url: raw.url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        dal::MemoryStore,
        domain::course::{CourseDuration, DurationUnit},
    };

    fn raw(title: &str) -> RawCourse {
        RawCourse {
            url: "https://uni.example/courses".to_string(),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    async fn setup() -> (MemoryStore, University, Uuid) {
        let store = MemoryStore::new();
        let uni = store.add_university("Uni of Otago", "NZ", true);
        let job = store.create_job(uni.id, Utc::now()).await.unwrap();
        (store, uni, job.id)
    }

    #[tokio::test]
    async fn creates_course_with_defaults() {
        let (store, uni, job_id) = setup().await;

        let (course, created) = reconcile(&store, &raw("BSc Computer Science"), &uni, job_id)
            .await
            .unwrap();

        assert!(created);
        assert_eq!(course.level, "bachelor");
        assert_eq!(course.field_of_study, "Computer Science");
        assert_eq!(course.duration_value, 1);
        assert_eq!(course.duration_unit, "years");
        assert_eq!(course.tuition_fee, 0.0);
        assert_eq!(course.currency, "USD");
        assert_eq!(course.course_url, "https://uni.example/courses");

        let audit = store.scraped_data();
        assert_eq!(audit.len(), 1);
        assert!(audit[0].processed);
        assert_eq!(audit[0].course_id, Some(course.id));
        assert_eq!(audit[0].raw_data["title"], "BSc Computer Science");
    }

    #[tokio::test]
    async fn second_pass_updates_only_fee_and_description() {
        let (store, uni, job_id) = setup().await;
        let mut first = raw("Master of Laws");
        first.level = Some(CourseLevel::Master);
        first.requirements = Some("LLB".to_string());
        first.duration = Some(CourseDuration {
            value: 2,
            unit: DurationUnit::Years,
        });
        let (original, _) = reconcile(&store, &first, &uni, job_id).await.unwrap();

        let mut second = raw("Master of Laws");
        second.fee = Some(41000.0);
        second.description = Some("Updated blurb".to_string());
        second.level = Some(CourseLevel::Certificate);
        second.requirements = Some("None".to_string());
        let (updated, created) = reconcile(&store, &second, &uni, job_id).await.unwrap();

        assert!(!created);
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.tuition_fee, 41000.0);
        assert_eq!(updated.description, "Updated blurb");
        assert_eq!(updated.level, "master");
        assert_eq!(updated.admission_requirements, "LLB");
        assert_eq!(updated.duration_value, 2);
        assert_eq!(store.courses().len(), 1);
    }

    #[tokio::test]
    async fn repeat_without_fee_or_description_is_a_noop_update() {
        let (store, uni, job_id) = setup().await;
        let mut first = raw("BA History");
        first.fee = Some(9250.0);
        reconcile(&store, &first, &uni, job_id).await.unwrap();

        let (course, created) = reconcile(&store, &raw("BA History"), &uni, job_id)
            .await
            .unwrap();

        assert!(!created);
        assert_eq!(course.tuition_fee, 9250.0);
        assert_eq!(store.scraped_data().len(), 2);
    }

    #[tokio::test]
    async fn zero_fee_does_not_overwrite_existing_fee() {
        let (store, uni, job_id) = setup().await;
        let mut first = raw("MSc Ecology");
        first.fee = Some(28000.0);
        reconcile(&store, &first, &uni, job_id).await.unwrap();

        let mut second = raw("MSc Ecology");
        second.fee = Some(0.0);
        let (course, created) = reconcile(&store, &second, &uni, job_id).await.unwrap();

        assert!(!created);
        assert_eq!(course.tuition_fee, 28000.0);
        assert_eq!(store.courses()[0].tuition_fee, 28000.0);
    }

    #[tokio::test]
    async fn overflowing_duration_falls_back_to_default() {
        let (store, uni, job_id) = setup().await;
        let mut record = raw("BEng Civil");
        record.duration = crate::domain::raw_course::parse_duration("3000000000 years");

        let (course, _) = reconcile(&store, &record, &uni, job_id).await.unwrap();

        assert_eq!(course.duration_value, 1);
        assert_eq!(course.duration_unit, "years");
    }

    #[tokio::test]
    async fn upsert_key_is_case_sensitive() {
        let (store, uni, job_id) = setup().await;

        reconcile(&store, &raw("BSc Physics"), &uni, job_id).await.unwrap();
        let (_, created) = reconcile(&store, &raw("BSC PHYSICS"), &uni, job_id)
            .await
            .unwrap();

        assert!(created);
        assert_eq!(store.courses().len(), 2);
    }

    #[tokio::test]
    async fn missing_title_is_rejected_before_audit() {
        let (store, uni, job_id) = setup().await;
        let untitled = RawCourse {
            url: "https://uni.example/courses".to_string(),
            fee: Some(100.0),
            ..Default::default()
        };

        let err = reconcile(&store, &untitled, &uni, job_id).await.unwrap_err();

        assert!(matches!(err, RecordError::Validation { audit_id: None, .. }));
        assert!(store.scraped_data().is_empty());
    }

    #[tokio::test]
    async fn store_failure_marks_audit_row() {
        let (store, uni, job_id) = setup().await;
        store.reject_course_title("BSc Chemistry");

        let err = reconcile(&store, &raw("BSc Chemistry"), &uni, job_id)
            .await
            .unwrap_err();

        let audit = store.scraped_data();
        assert_eq!(err.audit_id(), Some(audit[0].id));
        assert!(!audit[0].processed);
        assert!(audit[0].course_id.is_none());
        assert!(!audit[0].error_message.is_empty());
        assert!(store.courses().is_empty());
    }
}
