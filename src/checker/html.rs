use scraper::{Html, Selector};
use std::sync::LazyLock;

static RATING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[name=rating]").expect("Failed to parse rating selector - this is a bug")
});

/// Value of the first `<meta name="rating">` tag, if the page has one.
///
/// Reads the `value` attribute and falls back to the standard `content`.
pub fn meta_rating(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let tag = document.select(&RATING_SELECTOR).next()?;
    let element = tag.value();

    element
        .attr("value")
        .or_else(|| element.attr("content"))
        .map(|value| value.trim().to_string())
}

/// Whether a rating marks the page as unsuitable for a general audience.
pub fn is_mature_rating(rating: &str) -> bool {
    rating.eq_ignore_ascii_case("restricted") || rating.eq_ignore_ascii_case("mature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_value_attribute() {
        let body = r#"<html><head><meta name="rating" value="mature"></head></html>"#;
        assert_eq!(meta_rating(body).as_deref(), Some("mature"));
    }

    #[test]
    fn test_falls_back_to_content_attribute() {
        let body = r#"<html><head><meta name="rating" content="restricted"></head></html>"#;
        assert_eq!(meta_rating(body).as_deref(), Some("restricted"));
    }

    #[test]
    fn test_missing_tag_is_none() {
        assert_eq!(meta_rating("<html><head><title>Hi</title></head></html>"), None);
        assert_eq!(meta_rating(""), None);
    }

    #[test]
    fn test_first_tag_wins() {
        let body = r#"<meta name="rating" value="general"><meta name="rating" value="mature">"#;
        assert_eq!(meta_rating(body).as_deref(), Some("general"));
    }

    #[test]
    fn test_mature_ratings() {
        assert!(is_mature_rating("mature"));
        assert!(is_mature_rating("RESTRICTED"));
        assert!(!is_mature_rating("general"));
    }
}
