use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::course::{CourseDuration, CourseLevel, DurationUnit};

/// Attributes pulled out of one listing element, before reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCourse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<CourseDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
}

impl RawCourse {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn fee_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("static fee pattern"))
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(year|month|week)").expect("static duration pattern")
    })
}

/// First numeric run in the text, thousands separators ignored.
pub fn parse_fee(text: &str) -> Option<f64> {
    let text = text.replace(',', "");
    fee_regex().find(&text).and_then(|m| m.as_str().parse().ok())
}

/// `None` when no `<n> year|month|week` run is found or `n` does not fit an `i32`.
pub fn parse_duration(text: &str) -> Option<CourseDuration> {
    let caps = duration_regex().captures(text)?;
    let value = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let unit = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "year" => DurationUnit::Years,
        "month" => DurationUnit::Months,
        _ => DurationUnit::Weeks,
    };

    Some(CourseDuration { value, unit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_strips_currency_and_separators() {
        assert_eq!(parse_fee("$54,880.00 per year"), Some(54880.00));
        assert_eq!(parse_fee("AUD 1,200"), Some(1200.0));
        assert_eq!(parse_fee("£9250 (home), £22,000 (intl)"), Some(9250.0));
    }

    #[test]
    fn fee_absent_without_digits() {
        assert_eq!(parse_fee("Contact the admissions office"), None);
        assert_eq!(parse_fee(""), None);
    }

    #[test]
    fn duration_is_case_insensitive_and_pluralised() {
        assert_eq!(
            parse_duration("Duration: 2 years"),
            Some(CourseDuration {
                value: 2,
                unit: DurationUnit::Years
            })
        );
        assert_eq!(
            parse_duration("18 Months"),
            Some(CourseDuration {
                value: 18,
                unit: DurationUnit::Months
            })
        );
        assert_eq!(
            parse_duration("12-week intensive, 12WEEKS total"),
            Some(CourseDuration {
                value: 12,
                unit: DurationUnit::Weeks
            })
        );
    }

    #[test]
    fn duration_absent_without_unit() {
        assert_eq!(parse_duration("Full time"), None);
        assert_eq!(parse_duration("3 semesters"), None);
    }

    #[test]
    fn duration_absent_when_value_overflows() {
        assert_eq!(parse_duration("3000000000 years"), None);
        assert_eq!(
            parse_duration("2147483647 weeks"),
            Some(CourseDuration {
                value: i32::MAX,
                unit: DurationUnit::Weeks
            })
        );
    }

    #[test]
    fn raw_json_omits_missing_fields() {
        let raw = RawCourse {
            url: "https://uni.example/courses".to_string(),
            title: Some("BSc Physics".to_string()),
            ..Default::default()
        };

        assert_eq!(
            raw.to_json(),
            serde_json::json!({
                "url": "https://uni.example/courses",
                "title": "BSc Physics",
            })
        );
    }
}
