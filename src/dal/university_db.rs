use sqlx::PgPool;

use crate::domain::university::{ExtractionRule, University};

pub async fn get_university(pool: &PgPool, id: i64) -> Result<Option<University>, sqlx::Error> {
    sqlx::query_as::<_, University>(
        r"
        select
            id, name, country, is_active
        from
            universities
        where
            id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_active_rule(
    pool: &PgPool,
    university_id: i64,
) -> Result<Option<ExtractionRule>, sqlx::Error> {
    sqlx::query_as::<_, ExtractionRule>(
        r"
        select
            id,
            university_id,
            base_url,
            course_list_selector,
            course_title_selector,
            course_fee_selector,
            course_duration_selector,
            course_level_selector,
            course_description_selector,
            course_requirements_selector,
            pagination_selector,
            wait_time,
            use_selenium,
            custom_headers,
            is_active
        from
            scraping_rules
        where
            university_id = $1 and
            is_active
        ",
    )
    .bind(university_id)
    .fetch_optional(pool)
    .await
}

/// Active universities that also have an active rule. Nothing else is ever scheduled.
pub async fn get_schedulable_universities(pool: &PgPool) -> Result<Vec<University>, sqlx::Error> {
    sqlx::query_as::<_, University>(
        r"
        select
            u.id, u.name, u.country, u.is_active
        from
            universities u
            join scraping_rules r on r.university_id = u.id
        where
            u.is_active and
            r.is_active
        order by u.name
        ",
    )
    .fetch_all(pool)
    .await
}
