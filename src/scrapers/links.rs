//! Flyer link extraction from the rendered listing page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::FlyerLink;

/// Substring of hrefs that point at the flyer viewer host.
pub const DEFAULT_LINK_PATTERN: &str = "prospekt.aldi-sued.de";

/// Title used when neither the markup nor the URL yields one.
pub const FALLBACK_TITLE: &str = "Aldi Prospekt";

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div[class*='title'], div[class*='headline']").unwrap()
});

static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2,4}$").unwrap());

/// Extract candidate flyer links from listing page HTML.
///
/// An anchor qualifies when its href contains `link_pattern` or its resolved
/// URL ends in `.pdf`. Links are returned in document order, each URL once.
pub fn extract_flyer_links(html: &str, page_url: &str, link_pattern: &str) -> Vec<FlyerLink> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let href = match anchor.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let url = match resolve_href(base.as_ref(), href) {
            Some(u) => u,
            None => continue,
        };

        let matches_pattern = !link_pattern.is_empty() && href.contains(link_pattern);
        if !matches_pattern && !is_pdf_url(&url) {
            continue;
        }

        if !seen.insert(url.clone()) {
            continue;
        }

        let title = infer_title(&anchor, &url);
        links.push(FlyerLink { url, title });
    }

    links
}

/// Whether a URL's path ends in `.pdf`, ignoring case and query string.
pub fn is_pdf_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    path.to_ascii_lowercase().ends_with(".pdf")
}

fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}

fn infer_title(anchor: &ElementRef<'_>, url: &str) -> String {
    if let Some(title) = anchor
        .select(&TITLE_SELECTOR)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
    {
        return title;
    }

    let text = collapse_whitespace(&anchor.text().collect::<String>());
    if !text.is_empty() {
        return text;
    }

    for attr in ["title", "aria-label"] {
        if let Some(value) = anchor.value().attr(attr) {
            let value = collapse_whitespace(value);
            if !value.is_empty() {
                return value;
            }
        }
    }

    title_from_url(url).unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// Derive a readable title from a flyer URL.
///
/// `https://prospekt.aldi-sued.de/kw17-wochenangebote-2025/page1` becomes
/// `"Kw17 Wochenangebote"`.
pub fn title_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut segment = *segments.last()?;
    if segment.starts_with("page") {
        segment = segments.len().checked_sub(2).map(|i| segments[i])?;
    }

    let segment = segment
        .strip_suffix(".pdf")
        .or_else(|| segment.strip_suffix(".PDF"))
        .unwrap_or(segment);
    let spaced = segment.replace(['-', '_'], " ");
    let trimmed = TRAILING_NUMBER.replace(&spaced, "");

    let title = trimmed
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://www.aldi-sued.de/de/angebote/prospekte.html";

    fn extract(html: &str) -> Vec<FlyerLink> {
        extract_flyer_links(html, PAGE, DEFAULT_LINK_PATTERN)
    }

    #[test]
    fn test_extracts_pattern_links_in_document_order() {
        let html = r#"
            <a href="https://prospekt.aldi-sued.de/kw17/page1">Wochenangebot KW17 2025</a>
            <a href="/de/impressum.html">Impressum</a>
            <a href="https://prospekt.aldi-sued.de/reise-juni/page1">Reisemagazin Juni</a>
        "#;
        let links = extract(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://prospekt.aldi-sued.de/kw17/page1");
        assert_eq!(links[0].title, "Wochenangebot KW17 2025");
        assert_eq!(links[1].title, "Reisemagazin Juni");
    }

    #[test]
    fn test_title_div_wins_over_link_text() {
        let html = r#"
            <a href="https://prospekt.aldi-sued.de/x/page1">
                <img src="cover.jpg">
                <div class="teaser-title">  Gartenbroschüre
                    2025 </div>
                <span>Jetzt ansehen</span>
            </a>
        "#;
        let links = extract(html);
        assert_eq!(links[0].title, "Gartenbroschüre 2025");
    }

    #[test]
    fn test_headline_div_is_used() {
        let html = r#"<a href="https://prospekt.aldi-sued.de/x"><div class="card__headline">Beilage</div></a>"#;
        assert_eq!(extract(html)[0].title, "Beilage");
    }

    #[test]
    fn test_title_attribute_when_no_text() {
        let html = r#"<a href="https://prospekt.aldi-sued.de/x" aria-label="Aktuelle Angebote"><img src="a.jpg"></a>"#;
        assert_eq!(extract(html)[0].title, "Aktuelle Angebote");
    }

    #[test]
    fn test_url_derived_title_fallback() {
        let html = r#"<a href="https://prospekt.aldi-sued.de/kw17-wochenangebote-2025/page1"><img></a>"#;
        assert_eq!(extract(html)[0].title, "Kw17 Wochenangebote");
    }

    #[test]
    fn test_static_fallback_title() {
        let html = r#"<a href="https://prospekt.aldi-sued.de/2025/"><img></a>"#;
        assert_eq!(extract(html)[0].title, FALLBACK_TITLE);
    }

    #[test]
    fn test_relative_pdf_links_are_resolved() {
        let html = r#"<a href="../downloads/Prospekt_KW18.PDF">PDF</a>"#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].url,
            "https://www.aldi-sued.de/de/downloads/Prospekt_KW18.PDF"
        );
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let html = r#"
            <a href="https://prospekt.aldi-sued.de/kw17/page1">Cover</a>
            <a href="https://prospekt.aldi-sued.de/kw17/page1">Wochenangebot KW17</a>
        "#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Cover");
    }

    #[test]
    fn test_ignored_schemes() {
        let html = r##"
            <a href="#prospekt.aldi-sued.de">anchor</a>
            <a href="javascript:open('prospekt.aldi-sued.de')">js</a>
            <a href="mailto:info@prospekt.aldi-sued.de">mail</a>
        "##;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        assert!(extract("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_is_pdf_url() {
        assert!(is_pdf_url("https://a.de/x/flyer.pdf"));
        assert!(is_pdf_url("https://a.de/x/FLYER.PDF?download=1"));
        assert!(!is_pdf_url("https://a.de/x/flyer.pdf.html"));
        assert!(!is_pdf_url("https://prospekt.aldi-sued.de/kw17/page1"));
    }

    #[test]
    fn test_title_from_url_variants() {
        assert_eq!(
            title_from_url("https://prospekt.aldi-sued.de/reise_magazin_juni/").as_deref(),
            Some("Reise Magazin Juni")
        );
        assert_eq!(
            title_from_url("https://a.de/files/garten-2025.pdf").as_deref(),
            Some("Garten")
        );
        assert_eq!(title_from_url("https://a.de/"), None);
    }
}
