use scraper::{ElementRef, Html, Selector};

use crate::domain::{
    course::CourseLevel,
    raw_course::{parse_duration, parse_fee, RawCourse},
};

use super::compiled_rule::CompiledRule;

/// One entry per listing element in document order. `None` marks a listing
/// without a usable title.
pub fn extract_listings(
    html: &str,
    rule: &CompiledRule,
    source_url: &str,
) -> Vec<Option<RawCourse>> {
    let document = Html::parse_document(html);

    document
        .select(&rule.list_selector)
        .map(|element| extract_course(element, rule, source_url))
        .collect()
}

pub fn extract_course(
    element: ElementRef,
    rule: &CompiledRule,
    source_url: &str,
) -> Option<RawCourse> {
    let title = field_text(element, rule.title.as_ref())?;

    Some(RawCourse {
        url: source_url.to_string(),
        title: Some(title),
        fee: field_text(element, rule.fee.as_ref()).and_then(|t| parse_fee(&t)),
        duration: field_text(element, rule.duration.as_ref()).and_then(|t| parse_duration(&t)),
        level: field_text(element, rule.level.as_ref()).map(|t| CourseLevel::classify(&t)),
        description: field_text(element, rule.description.as_ref()),
        requirements: field_text(element, rule.requirements.as_ref()),
    })
}

/// Trimmed text of the first match, absent when unconfigured, missing or blank.
fn field_text(element: ElementRef, selector: Option<&Selector>) -> Option<String> {
    let text = element
        .select(selector?)
        .next()?
        .text()
        .collect::<String>();

    match text.trim() {
        "" => None,
        trimmed => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::course::{CourseDuration, DurationUnit},
        services::compiled_rule::tests::rule,
    };

    const PAGE: &str = r#"
        <html><body>
          <div class="course">
            <h3>  Master of Data Science </h3>
            <span class="fee">$54,880.00 per year</span>
            <span class="duration">Duration: 2 years</span>
            <span class="level">Postgraduate</span>
            <p class="desc">Learn <b>statistics</b> and ML.</p>
          </div>
          <div class="course">
            <span class="fee">$1,000</span>
          </div>
          <div class="course">
            <h3>Diploma of Nursing</h3>
            <span class="fee">Contact us</span>
            <span class="duration">18 Months</span>
          </div>
        </body></html>
    "#;

    fn compiled() -> CompiledRule {
        CompiledRule::compile(&rule("https://uni.example/courses"), "ua").unwrap()
    }

    #[test]
    fn listings_keep_document_order_and_mark_untitled() {
        let listings = extract_listings(PAGE, &compiled(), "https://uni.example/courses");

        assert_eq!(listings.len(), 3);
        assert!(listings[1].is_none());
        assert_eq!(
            listings[0].as_ref().unwrap().title.as_deref(),
            Some("Master of Data Science")
        );
        assert_eq!(
            listings[2].as_ref().unwrap().title.as_deref(),
            Some("Diploma of Nursing")
        );
    }

    #[test]
    fn configured_fields_are_parsed() {
        let listings = extract_listings(PAGE, &compiled(), "https://uni.example/courses");
        let course = listings[0].clone().unwrap();

        assert_eq!(course.url, "https://uni.example/courses");
        assert_eq!(course.fee, Some(54880.0));
        assert_eq!(
            course.duration,
            Some(CourseDuration {
                value: 2,
                unit: DurationUnit::Years
            })
        );
        assert_eq!(course.level, Some(CourseLevel::Master));
        assert_eq!(course.description.as_deref(), Some("Learn statistics and ML."));
        assert_eq!(course.requirements, None);
    }

    #[test]
    fn missing_or_unparsable_fields_are_omitted() {
        let listings = extract_listings(PAGE, &compiled(), "https://uni.example/courses");
        let course = listings[2].clone().unwrap();

        assert_eq!(course.fee, None);
        assert_eq!(course.level, None);
        assert_eq!(course.description, None);
        assert_eq!(
            course.duration,
            Some(CourseDuration {
                value: 18,
                unit: DurationUnit::Months
            })
        );
    }

    #[test]
    fn unconfigured_title_drops_every_listing() {
        let mut r = rule("https://uni.example/courses");
        r.course_title_selector = String::new();
        let compiled = CompiledRule::compile(&r, "ua").unwrap();

        let listings = extract_listings(PAGE, &compiled, "https://uni.example/courses");

        assert_eq!(listings.len(), 3);
        assert!(listings.iter().all(Option::is_none));
    }

    #[test]
    fn requirements_are_extracted_when_configured() {
        let mut r = rule("https://uni.example/courses");
        r.course_requirements_selector = ".req".to_string();
        let compiled = CompiledRule::compile(&r, "ua").unwrap();
        let html = r#"<div class="course"><h3>LLB</h3><div class="req"> IELTS 7.0 </div></div>"#;

        let listings = extract_listings(html, &compiled, "https://uni.example/law");

        assert_eq!(
            listings[0].as_ref().unwrap().requirements.as_deref(),
            Some("IELTS 7.0")
        );
    }
}
