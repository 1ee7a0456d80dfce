use sqlx::PgPool;

use crate::domain::course::{Course, CourseRefresh, NewCourse};

const COURSE_COLUMNS: &str = r"
    id,
    title,
    university_id,
    level,
    field_of_study,
    description,
    duration_value,
    duration_unit,
    tuition_fee,
    currency,
    admission_requirements,
    course_url,
    is_active,
    popularity_score,
    created_at,
    updated_at
";

pub async fn get_course(
    pool: &PgPool,
    title: &str,
    university_id: i64,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        r"
        select {COURSE_COLUMNS}
        from
            courses
        where
            title = $1 and
            university_id = $2
        "
    ))
    .bind(title)
    .bind(university_id)
    .fetch_optional(pool)
    .await
}

/// Returns `None` when another writer already holds `(title, university_id)`.
pub async fn insert_course(
    pool: &PgPool,
    course: NewCourse,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        r"
        insert into courses
            (title, university_id, level, field_of_study, description, duration_value,
             duration_unit, tuition_fee, currency, admission_requirements, course_url)
        values
            ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        on conflict (title, university_id) do nothing
        returning {COURSE_COLUMNS}
        "
    ))
    .bind(course.title)
    .bind(course.university_id)
    .bind(course.level.as_str())
    .bind(course.field_of_study)
    .bind(course.description)
    .bind(course.duration.value)
    .bind(course.duration.unit.as_str())
    .bind(course.tuition_fee)
    .bind(course.currency)
    .bind(course.admission_requirements)
    .bind(course.course_url)
    .fetch_optional(pool)
    .await
}

pub async fn refresh_course(
    pool: &PgPool,
    course_id: i64,
    refresh: CourseRefresh,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        r"
        update courses set
            tuition_fee = coalesce($2, tuition_fee),
            description = coalesce($3, description),
            updated_at = now()
        where
            id = $1
        returning {COURSE_COLUMNS}
        "
    ))
    .bind(course_id)
    .bind(refresh.tuition_fee)
    .bind(refresh.description)
    .fetch_one(pool)
    .await
}
