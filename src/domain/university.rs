use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct University {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub is_active: bool,
}

/// Per-university instructions for locating course listings. Empty selector
/// strings mean the field is not configured.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ExtractionRule {
    pub id: i64,
    pub university_id: i64,
    pub base_url: String,
    pub course_list_selector: String,
    pub course_title_selector: String,
    pub course_fee_selector: String,
    pub course_duration_selector: String,
    pub course_level_selector: String,
    pub course_description_selector: String,
    pub course_requirements_selector: String,
    pub pagination_selector: String,
    /// Seconds to pause after each listing element.
    pub wait_time: i32,
    pub use_selenium: bool,
    #[sqlx(json)]
    pub custom_headers: HashMap<String, String>,
    pub is_active: bool,
}

impl ExtractionRule {
    pub fn fetch_mode(&self) -> FetchMode {
        match self.use_selenium {
            true => FetchMode::Scripted,
            false => FetchMode::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    Plain,
    Scripted,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::Plain => "plain",
            FetchMode::Scripted => "scripted",
        }
    }
}
