use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical course row. Owned by the catalogue; the scraper only inserts rows
/// and narrows updates to fee and description.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub university_id: i64,
    pub level: String,
    pub field_of_study: String,
    pub description: String,
    pub duration_value: i32,
    pub duration_unit: String,
    pub tuition_fee: f64,
    pub currency: String,
    pub admission_requirements: String,
    pub course_url: String,
    pub is_active: bool,
    pub popularity_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub title: String,
    pub university_id: i64,
    pub level: CourseLevel,
    pub field_of_study: String,
    pub description: String,
    pub duration: CourseDuration,
    pub tuition_fee: f64,
    pub currency: String,
    pub admission_requirements: String,
    pub course_url: String,
}

/// Fields a re-scrape is allowed to overwrite on an existing course.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseRefresh {
    pub tuition_fee: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Bachelor,
    Master,
    Phd,
    Diploma,
    Certificate,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Bachelor => "bachelor",
            CourseLevel::Master => "master",
            CourseLevel::Phd => "phd",
            CourseLevel::Diploma => "diploma",
            CourseLevel::Certificate => "certificate",
        }
    }

    /// Keyword match on free text. Anything unrecognised is filed as a bachelor's
    /// programme, which mislabels e.g. language certificates phrased differently.
    pub fn classify(text: &str) -> CourseLevel {
        let text = text.to_lowercase();

        if text.contains("bachelor") || text.contains("undergraduate") {
            CourseLevel::Bachelor
        } else if text.contains("master") || text.contains("postgraduate") {
            CourseLevel::Master
        } else if text.contains("phd") || text.contains("doctorate") {
            CourseLevel::Phd
        } else if text.contains("diploma") {
            CourseLevel::Diploma
        } else if text.contains("certificate") {
            CourseLevel::Certificate
        } else {
            CourseLevel::Bachelor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Years,
    Months,
    Weeks,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Years => "years",
            DurationUnit::Months => "months",
            DurationUnit::Weeks => "weeks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDuration {
    pub value: i32,
    pub unit: DurationUnit,
}

impl Default for CourseDuration {
    fn default() -> Self {
        CourseDuration {
            value: 1,
            unit: DurationUnit::Years,
        }
    }
}

pub const DEFAULT_CURRENCY: &str = "USD";
pub const GENERAL_STUDIES: &str = "General Studies";

/// Checked in order; the first category with a matching keyword wins.
const FIELD_KEYWORDS: [(&str, &[&str]); 8] = [
    (
        "Computer Science",
        &[
            "computer",
            "software",
            "programming",
            "data science",
            "ai",
            "machine learning",
        ],
    ),
    (
        "Engineering",
        &["engineering", "mechanical", "electrical", "civil", "chemical"],
    ),
    (
        "Business",
        &["business", "management", "mba", "finance", "marketing", "economics"],
    ),
    (
        "Medicine",
        &["medicine", "medical", "health", "nursing", "pharmacy"],
    ),
    ("Law", &["law", "legal", "jurisprudence"]),
    (
        "Arts",
        &["arts", "design", "creative", "music", "literature"],
    ),
    ("Science", &["biology", "chemistry", "physics", "mathematics"]),
    ("Education", &["education", "teaching", "pedagogy"]),
];

pub fn classify_field_of_study(title: &str) -> &'static str {
    let title = title.to_lowercase();

    FIELD_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| title.contains(k)))
        .map(|(field, _)| *field)
        .unwrap_or(GENERAL_STUDIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_of_study_first_match_wins() {
        assert_eq!(
            classify_field_of_study("Master of Computer Science and Business"),
            "Computer Science"
        );
        assert_eq!(classify_field_of_study("MBA in Finance"), "Business");
        assert_eq!(classify_field_of_study("Bachelor of Nursing"), "Medicine");
    }

    #[test]
    fn field_of_study_substring_semantics() {
        // plain substring check: "ai" inside "Maintenance"
        assert_eq!(classify_field_of_study("Maintenance Studies"), "Computer Science");
        assert_eq!(classify_field_of_study("History"), GENERAL_STUDIES);
    }

    #[test]
    fn level_keywords() {
        assert_eq!(CourseLevel::classify("Undergraduate"), CourseLevel::Bachelor);
        assert_eq!(CourseLevel::classify("Postgraduate taught"), CourseLevel::Master);
        assert_eq!(CourseLevel::classify("PhD / Doctorate"), CourseLevel::Phd);
        assert_eq!(CourseLevel::classify("Graduate Diploma"), CourseLevel::Diploma);
        assert_eq!(CourseLevel::classify("CERTIFICATE IV"), CourseLevel::Certificate);
    }

    #[test]
    fn level_defaults_to_bachelor() {
        assert_eq!(CourseLevel::classify("Short course"), CourseLevel::Bachelor);
        assert_eq!(CourseLevel::classify(""), CourseLevel::Bachelor);
    }
}
