use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use scraper::Selector;
use url::Url;

use crate::domain::university::{ExtractionRule, FetchMode};

/// An [`ExtractionRule`] with its selectors parsed and headers validated, ready
/// to drive a fetch and extraction pass.
pub struct CompiledRule {
    pub university_id: i64,
    pub base_url: Url,
    pub base_url_raw: String,
    pub mode: FetchMode,
    pub wait_time: Duration,
    pub headers: HeaderMap,
    pub list_selector_raw: String,
    pub list_selector: Selector,
    pub title: Option<Selector>,
    pub fee: Option<Selector>,
    pub duration: Option<Selector>,
    pub level: Option<Selector>,
    pub description: Option<Selector>,
    pub requirements: Option<Selector>,
}

fn parse_selector(name: &str, raw: &str) -> Result<Selector, String> {
    Selector::parse(raw).map_err(|e| format!("invalid {} selector `{}`: {}", name, raw, e))
}

fn optional_selector(name: &str, raw: &str) -> Result<Option<Selector>, String> {
    match raw.trim() {
        "" => Ok(None),
        raw => parse_selector(name, raw).map(Some),
    }
}

impl CompiledRule {
    /// Fails with a human readable message when the rule cannot be used at all.
    pub fn compile(rule: &ExtractionRule, default_user_agent: &str) -> Result<Self, String> {
        let base_url = Url::parse(rule.base_url.trim())
            .map_err(|e| format!("invalid base url `{}`: {}", rule.base_url, e))?;

        if rule.wait_time < 0 {
            return Err(format!("negative wait time {}", rule.wait_time));
        }

        let list_selector_raw = rule.course_list_selector.trim().to_string();
        if list_selector_raw.is_empty() {
            return Err("course list selector is empty".to_string());
        }

        let mut headers = HeaderMap::new();
        for (name, value) in rule.custom_headers.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("invalid header name `{}`: {}", name, e))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| format!("invalid value for header `{}`: {}", name, e))?;
            headers.insert(header_name, header_value);
        }
        if !headers.contains_key(USER_AGENT) {
            let user_agent = HeaderValue::from_str(default_user_agent)
                .map_err(|e| format!("invalid default user agent: {}", e))?;
            headers.insert(USER_AGENT, user_agent);
        }

        Ok(CompiledRule {
            university_id: rule.university_id,
            base_url,
            base_url_raw: rule.base_url.trim().to_string(),
            mode: rule.fetch_mode(),
            wait_time: Duration::from_secs(rule.wait_time as u64),
            headers,
            list_selector: parse_selector("course list", &list_selector_raw)?,
            list_selector_raw,
            title: optional_selector("title", &rule.course_title_selector)?,
            fee: optional_selector("fee", &rule.course_fee_selector)?,
            duration: optional_selector("duration", &rule.course_duration_selector)?,
            level: optional_selector("level", &rule.course_level_selector)?,
            description: optional_selector("description", &rule.course_description_selector)?,
            requirements: optional_selector("requirements", &rule.course_requirements_selector)?,
        })
    }

    pub fn user_agent(&self) -> &str {
        self.headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    pub(crate) fn rule(base_url: &str) -> ExtractionRule {
        ExtractionRule {
            id: 1,
            university_id: 1,
            base_url: base_url.to_string(),
            course_list_selector: "div.course".to_string(),
            course_title_selector: "h3".to_string(),
            course_fee_selector: ".fee".to_string(),
            course_duration_selector: ".duration".to_string(),
            course_level_selector: ".level".to_string(),
            course_description_selector: ".desc".to_string(),
            course_requirements_selector: String::new(),
            pagination_selector: String::new(),
            wait_time: 0,
            use_selenium: false,
            custom_headers: HashMap::new(),
            is_active: true,
        }
    }

    #[test]
    fn empty_selectors_are_not_configured() {
        let compiled = CompiledRule::compile(&rule("https://uni.example/courses"), "ua").unwrap();

        assert!(compiled.title.is_some());
        assert!(compiled.requirements.is_none());
        assert_eq!(compiled.mode, FetchMode::Plain);
        assert_eq!(compiled.user_agent(), "ua");
    }

    #[test]
    fn custom_user_agent_wins_over_default() {
        let mut r = rule("https://uni.example/courses");
        r.custom_headers
            .insert("User-Agent".to_string(), "CourseBot/1.0".to_string());
        r.custom_headers
            .insert("Accept-Language".to_string(), "en-GB".to_string());

        let compiled = CompiledRule::compile(&r, "ua").unwrap();

        assert_eq!(compiled.user_agent(), "CourseBot/1.0");
        assert_eq!(compiled.headers.len(), 2);
    }

    #[test]
    fn unusable_rules_are_rejected() {
        assert!(CompiledRule::compile(&rule("not a url"), "ua").is_err());

        let mut bad_selector = rule("https://uni.example");
        bad_selector.course_fee_selector = "div[".to_string();
        let err = CompiledRule::compile(&bad_selector, "ua").err().unwrap();
        assert!(err.contains("fee"));

        let mut bad_header = rule("https://uni.example");
        bad_header
            .custom_headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(CompiledRule::compile(&bad_header, "ua").is_err());

        let mut no_list = rule("https://uni.example");
        no_list.course_list_selector = "  ".to_string();
        assert!(CompiledRule::compile(&no_list, "ua").is_err());
    }
}
