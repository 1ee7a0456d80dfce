use sqlx::{postgres::PgQueryResult, PgPool};
use uuid::Uuid;

use crate::domain::scraping_job::{NewScrapedData, ScrapedData};

pub async fn insert_scraped_data(
    pool: &PgPool,
    data: NewScrapedData,
) -> Result<ScrapedData, sqlx::Error> {
    sqlx::query_as::<_, ScrapedData>(
        r"
        insert into scraped_data
            (id, scraping_job_id, source_url, raw_data, processed, error_message)
        values
            ($1, $2, $3, $4, $5, $6)
        returning
            id, scraping_job_id, source_url, raw_data, processed, course_id, error_message, created_at
        ",
    )
    .bind(Uuid::new_v4())
    .bind(data.scraping_job_id)
    .bind(data.source_url)
    .bind(data.raw_data)
    .bind(data.processed)
    .bind(data.error_message)
    .fetch_one(pool)
    .await
}

pub async fn set_processed(
    pool: &PgPool,
    id: Uuid,
    course_id: i64,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        update scraped_data set
            processed = true,
            course_id = $2,
            error_message = ''
        where
            id = $1
        ",
    )
    .bind(id)
    .bind(course_id)
    .execute(pool)
    .await
}

pub async fn set_error(
    pool: &PgPool,
    id: Uuid,
    error_message: &str,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        update scraped_data set
            processed = false,
            error_message = $2
        where
            id = $1
        ",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await
}

pub async fn get_scraped_data_for_job(
    pool: &PgPool,
    job_id: Uuid,
    processed: Option<bool>,
) -> Result<Vec<ScrapedData>, sqlx::Error> {
    sqlx::query_as::<_, ScrapedData>(
        r"
        select
            id, scraping_job_id, source_url, raw_data, processed, course_id, error_message, created_at
        from
            scraped_data
        where
            scraping_job_id = $1 and
            ($2::boolean is null or processed = $2)
        order by created_at desc
        ",
    )
    .bind(job_id)
    .bind(processed)
    .fetch_all(pool)
    .await
}
