//! Locate the PDF asset on a rendered flyer viewer page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Where on the page the PDF reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfSource {
    Embed,
    Iframe,
    Anchor,
    MarkupHref,
    DataSrc,
    Script,
}

struct ElementRule {
    source: PdfSource,
    selector: &'static str,
    attr: &'static str,
}

/// Element rules, tried in order before falling back to raw text scans.
const ELEMENT_RULES: &[ElementRule] = &[
    ElementRule {
        source: PdfSource::Embed,
        selector: "embed[type='application/pdf']",
        attr: "src",
    },
    ElementRule {
        source: PdfSource::Iframe,
        selector: "iframe[src*='.pdf']",
        attr: "src",
    },
    ElementRule {
        source: PdfSource::Anchor,
        selector: "a[href*='.pdf']",
        attr: "href",
    },
];

static MARKUP_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=['"]([^'"]*\.pdf)['"]"#).unwrap());

static QUOTED_PDF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]*\.pdf)['"]"#).unwrap());

static DATA_SRC_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-src*='.pdf']").unwrap());

static SCRIPT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

static VIEWER_FRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src*='viewer']").unwrap());

/// Find the PDF URL referenced by a flyer page, resolved against `page_url`,
/// along with the rule that matched.
pub fn find_pdf_url(html: &str, page_url: &str) -> Option<(String, PdfSource)> {
    let document = Html::parse_document(html);

    for rule in ELEMENT_RULES {
        let selector = match Selector::parse(rule.selector) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let found = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(rule.attr))
            .and_then(|value| resolve(page_url, value));
        if let Some(url) = found {
            return Some((url, rule.source));
        }
    }

    if let Some(url) = MARKUP_HREF
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| resolve(page_url, m.as_str()))
    {
        return Some((url, PdfSource::MarkupHref));
    }

    if let Some(url) = document
        .select(&DATA_SRC_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("data-src"))
        .and_then(|value| resolve(page_url, value))
    {
        return Some((url, PdfSource::DataSrc));
    }

    document
        .select(&SCRIPT_SELECTOR)
        .filter_map(|script| {
            let text = script.text().collect::<String>();
            QUOTED_PDF
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| resolve(page_url, m.as_str()))
        })
        .next()
        .map(|url| (url, PdfSource::Script))
}

/// URL of an embedded viewer frame whose own src is not the PDF.
///
/// The PDF then lives inside the frame document, which has to be rendered
/// separately.
pub fn find_viewer_frame(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&VIEWER_FRAME_SELECTOR)
        .filter_map(|el| el.value().attr("src"))
        .find(|src| !src.contains(".pdf"))
        .and_then(|src| resolve(page_url, src))
}

fn resolve(page_url: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match Url::parse(page_url) {
        Ok(base) => base.join(value).ok().map(|u| u.to_string()),
        Err(_) => Url::parse(value).ok().map(|u| u.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://prospekt.aldi-sued.de/kw17-2025/page1";

    fn find(html: &str) -> Option<(String, PdfSource)> {
        find_pdf_url(html, PAGE)
    }

    #[test]
    fn test_embed() {
        let html = r#"<embed type="application/pdf" src="https://cdn.aldi-sued.de/kw17.pdf">"#;
        assert_eq!(
            find(html),
            Some(("https://cdn.aldi-sued.de/kw17.pdf".to_string(), PdfSource::Embed))
        );
    }

    #[test]
    fn test_iframe() {
        let html = r#"<iframe src="/viewer/files/kw17.pdf"></iframe>"#;
        assert_eq!(
            find(html),
            Some((
                "https://prospekt.aldi-sued.de/viewer/files/kw17.pdf".to_string(),
                PdfSource::Iframe
            ))
        );
    }

    #[test]
    fn test_anchor() {
        let html = r#"<a href="download/kw17.pdf">Download</a>"#;
        assert_eq!(
            find(html),
            Some((
                "https://prospekt.aldi-sued.de/kw17-2025/download/kw17.pdf".to_string(),
                PdfSource::Anchor
            ))
        );
    }

    #[test]
    fn test_markup_href_outside_anchor() {
        let html = r#"<link rel="alternate" href="/files/kw17.pdf">"#;
        assert_eq!(
            find(html),
            Some((
                "https://prospekt.aldi-sued.de/files/kw17.pdf".to_string(),
                PdfSource::MarkupHref
            ))
        );
    }

    #[test]
    fn test_data_src() {
        let html = r#"<div class="viewer" data-src="/assets/kw17.pdf"></div>"#;
        assert_eq!(
            find(html),
            Some((
                "https://prospekt.aldi-sued.de/assets/kw17.pdf".to_string(),
                PdfSource::DataSrc
            ))
        );
    }

    #[test]
    fn test_script_string() {
        let html = r#"<script>window.viewer = { file: "https://cdn.example.com/f/kw17.pdf" };</script>"#;
        assert_eq!(
            find(html),
            Some(("https://cdn.example.com/f/kw17.pdf".to_string(), PdfSource::Script))
        );
    }

    #[test]
    fn test_embed_takes_precedence_over_anchor() {
        let html = r#"
            <a href="/other.pdf">Other</a>
            <embed type="application/pdf" src="/main.pdf">
        "#;
        assert_eq!(find(html).map(|(_, s)| s), Some(PdfSource::Embed));
    }

    #[test]
    fn test_no_pdf() {
        let html = r#"<html><body><img src="page1.jpg"><script>var x = 'a.png';</script></body></html>"#;
        assert_eq!(find(html), None);
    }

    #[test]
    fn test_viewer_frame() {
        let html = r#"
            <iframe src="https://www.youtube.com/embed/x"></iframe>
            <iframe src="/viewer/index.html?id=kw17"></iframe>
        "#;
        assert_eq!(find(html), None);
        assert_eq!(
            find_viewer_frame(html, PAGE).as_deref(),
            Some("https://prospekt.aldi-sued.de/viewer/index.html?id=kw17")
        );
    }

    #[test]
    fn test_viewer_frame_pointing_at_pdf_is_not_a_frame_to_render() {
        let html = r#"<iframe src="/viewer/files/kw17.pdf"></iframe>"#;
        assert_eq!(find_viewer_frame(html, PAGE), None);
        assert_eq!(find(html).map(|(_, s)| s), Some(PdfSource::Iframe));
    }
}
