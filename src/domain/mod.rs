pub mod course;
pub mod raw_course;
pub mod scraping_job;
pub mod university;
