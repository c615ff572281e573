//! Preview-image extraction from gallery pages.
//!
//! Gallery hosts put the real image in `<meta property="og:image">`. The
//! common attribute order is matched with a fixed pattern; pages that order
//! the attributes differently fall back to a parsed-HTML lookup.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use peekbox_core::Error;

use crate::fetch::resolve_against;

static OG_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta property="og:image" content="([^"]+)""#).expect("valid regex"));

static OG_IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("invalid selector"));

/// Find the preview image of a gallery page, resolved against the page URL.
pub fn extract_preview_image(html: &str, page_url: &Url) -> Result<Url, Error> {
    let raw = OG_IMAGE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| parsed_og_image(html))
        .ok_or_else(|| Error::ScrapeFailed(format!("no og:image on {page_url}")))?;

    let decoded = raw.replace("&amp;", "&");
    resolve_against(page_url, &decoded).map_err(|e| Error::ScrapeFailed(format!("og:image {raw:?}: {e}")))
}

fn parsed_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&OG_IMAGE_SELECTOR)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://postimg.cc/abc123").unwrap()
    }

    #[test]
    fn test_fixed_pattern() {
        let html = r#"<html><head><meta property="og:image" content="https://cdn.example/real.jpg"></head></html>"#;
        assert_eq!(extract_preview_image(html, &page()).unwrap().as_str(), "https://cdn.example/real.jpg");
    }

    #[test]
    fn test_reordered_attributes() {
        let html = r#"<html><head><meta content="https://i.ibb.co/x/y.png" property="og:image" /></head></html>"#;
        assert_eq!(extract_preview_image(html, &page()).unwrap().as_str(), "https://i.ibb.co/x/y.png");
    }

    #[test]
    fn test_relative_value_resolves_against_page() {
        let html = r#"<meta property="og:image" content="/images/real.png">"#;
        assert_eq!(extract_preview_image(html, &page()).unwrap().as_str(), "https://postimg.cc/images/real.png");
    }

    #[test]
    fn test_entity_in_query() {
        let html = r#"<meta property="og:image" content="https://cdn.example/i.jpg?a=1&amp;b=2">"#;
        assert_eq!(extract_preview_image(html, &page()).unwrap().as_str(), "https://cdn.example/i.jpg?a=1&b=2");
    }

    #[test]
    fn test_missing_meta_is_scrape_failure() {
        let html = r#"<html><head><meta property="og:title" content="cat"></head></html>"#;
        assert!(matches!(extract_preview_image(html, &page()), Err(Error::ScrapeFailed(_))));
    }

    #[test]
    fn test_empty_content_is_scrape_failure() {
        let html = r#"<meta content="" property="og:image">"#;
        assert!(matches!(extract_preview_image(html, &page()), Err(Error::ScrapeFailed(_))));
    }
}
