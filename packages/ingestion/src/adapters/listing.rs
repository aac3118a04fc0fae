//! Shared helpers for listing-style shelter sites.
//!
//! The typical site shape: one listing page linking to per-dog detail
//! pages. Helpers here cover candidate-URL extraction, bounded-concurrency
//! detail fetching, and heuristic field extraction from detail pages.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::http::HttpFetch;
use crate::model::Sex;

/// Cap on detail pages per listing, bounding worst-case load against the
/// source site.
pub const MAX_DETAIL_PAGES: usize = 30;

/// Fixed worker count for detail-page fetches.
pub const DETAIL_FETCH_WORKERS: usize = 5;

/// Extract candidate detail-page URLs from listing HTML.
///
/// Anchors whose resolved absolute URL matches `href_pattern` are kept,
/// deduplicated with set semantics while preserving first-seen order, and
/// capped at `cap`.
pub fn extract_detail_urls(
    html: &str,
    base_url: &Url,
    href_pattern: &Regex,
    cap: usize,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchor_selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&anchor_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        // Same host only; listing pages link out to partner sites too
        if resolved.host_str() != base_url.host_str() {
            continue;
        }

        let mut normalized = resolved;
        normalized.set_fragment(None);
        let url_string = normalized.to_string();

        if !href_pattern.is_match(normalized.path()) {
            continue;
        }
        if seen.insert(url_string.clone()) {
            urls.push(url_string);
            if urls.len() >= cap {
                break;
            }
        }
    }

    urls
}

/// Fetch detail pages with a fixed-size worker pool, preserving input
/// order. A failed fetch yields `None` for that slot; one bad page never
/// aborts the batch.
pub async fn fetch_detail_pages(
    http: &dyn HttpFetch,
    urls: &[String],
    workers: usize,
) -> Vec<Option<String>> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));

    let fetches = urls.iter().map(|url| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return None,
            };
            match http.get_text(url).await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!(url = %url, error = %e, "detail page fetch failed, dropping item");
                    None
                }
            }
        }
    });

    futures::future::join_all(fetches).await
}

/// Heuristically extracted fields from one detail page.
#[derive(Debug, Default)]
pub struct DetailFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub photo_urls: Vec<String>,
    pub sex: Sex,
    pub urgent: bool,
}

/// Extract dog fields from detail-page HTML.
///
/// Name comes from the first heading, description from the first matching
/// content selector (converted to markdown-ish text), photos from anchor
/// and image attributes that look like gallery images.
pub fn extract_detail_fields(
    html: &str,
    base_url: &Url,
    description_selectors: &[&str],
) -> DetailFields {
    let document = Html::parse_document(html);

    let name = extract_heading(&document);
    let description = extract_description(&document, description_selectors);
    let photo_urls = extract_photo_urls(&document, base_url);

    let text = document.root_element().text().collect::<String>();
    let sex = infer_sex(&text);
    let urgent = is_urgent(&text);

    debug!(
        name = name.as_deref().unwrap_or("<missing>"),
        photos = photo_urls.len(),
        "extracted detail fields"
    );

    DetailFields {
        name,
        description,
        photo_urls,
        sex,
        urgent,
    }
}

fn extract_heading(document: &Html) -> Option<String> {
    for selector_str in ["h1", "h2", ".entry-title", ".page-title"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(heading) = document.select(&selector).next() {
            let text = heading.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First matching content selector wins.
fn extract_description(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(content) = document.select(&selector).next() {
            let markdown = htmd::convert(&content.html())
                .unwrap_or_else(|_| content.text().collect::<String>());
            let trimmed = markdown.trim().to_string();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\.jpe?g|\.png|\.webp)(\?.*)?$|/galeria/|/gallery/")
            .expect("static image pattern is valid")
    })
}

/// Photo URLs from `a[href]` and `img[src]`, normalized to absolute form
/// and deduplicated preserving order.
fn extract_photo_urls(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut urls = Vec::new();

    let candidates = [("a", "href"), ("img", "src")];
    for (tag, attr) in candidates {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            if !image_pattern().is_match(value) {
                continue;
            }
            let Ok(resolved) = base_url.join(value) else {
                continue;
            };
            let url_string = resolved.to_string();
            if seen.insert(url_string.clone()) {
                urls.push(url_string);
            }
        }
    }

    urls
}

fn female_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(suczka|sunia|samiczka|samica)\b")
            .expect("static sex pattern is valid")
    })
}

fn male_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(piesek|psiak|samiec)\b").expect("static sex pattern is valid")
    })
}

/// Infer sex from gendered Polish nouns in page text; unknown when neither
/// form appears.
pub fn infer_sex(text: &str) -> Sex {
    if female_pattern().is_match(text) {
        Sex::Female
    } else if male_pattern().is_match(text) {
        Sex::Male
    } else {
        Sex::Unknown
    }
}

fn is_urgent(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("pilne") || lowered.contains("pilnie szuka")
}

/// Derive a stable external id from a detail-page URL: the `id` query
/// parameter when present, otherwise the last path segment.
pub fn external_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "id") {
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <html><body>
          <nav><a href="/kontakt">Kontakt</a></nav>
          <div class="dogs">
            <a href="/pies/burek-42">Burek</a>
            <a href="/pies/luna-7">Luna</a>
            <a href="/pies/burek-42">Burek again</a>
            <a href="https://other-site.example.org/pies/obcy">Obcy</a>
            <a href="/aktualnosci/zbiorka">Zbiórka</a>
            <a href="/pies/reksio-3#foto">Reksio</a>
          </div>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://schronisko.example.org").unwrap()
    }

    fn pattern() -> Regex {
        Regex::new(r"^/pies/[a-z0-9-]+$").unwrap()
    }

    #[test]
    fn detail_urls_are_deduped_ordered_and_pattern_restricted() {
        let urls = extract_detail_urls(LISTING_HTML, &base(), &pattern(), MAX_DETAIL_PAGES);

        assert_eq!(
            urls,
            vec![
                "https://schronisko.example.org/pies/burek-42".to_string(),
                "https://schronisko.example.org/pies/luna-7".to_string(),
                "https://schronisko.example.org/pies/reksio-3".to_string(),
            ]
        );
    }

    #[test]
    fn detail_url_count_is_capped() {
        let urls = extract_detail_urls(LISTING_HTML, &base(), &pattern(), 2);
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("/pies/burek-42"));
    }

    #[test]
    fn detail_fields_read_heading_content_and_photos() {
        let html = r#"
            <html><body>
              <h1>Burek</h1>
              <div class="content">
                <p>Wesoły piesek, pilne szuka domu.</p>
                <img src="/zdjecia/burek1.jpg">
                <a href="/galeria/burek/2">więcej zdjęć</a>
                <img src="/zdjecia/burek1.jpg">
              </div>
            </body></html>
        "#;
        let fields = extract_detail_fields(html, &base(), &[".content"]);

        assert_eq!(fields.name.as_deref(), Some("Burek"));
        assert!(fields.description.unwrap().contains("Wesoły piesek"));
        assert_eq!(
            fields.photo_urls,
            vec![
                "https://schronisko.example.org/galeria/burek/2".to_string(),
                "https://schronisko.example.org/zdjecia/burek1.jpg".to_string(),
            ]
        );
        assert_eq!(fields.sex, Sex::Male);
        assert!(fields.urgent);
    }

    #[test]
    fn sex_inference_uses_gendered_nouns() {
        assert_eq!(infer_sex("Łagodna suczka szuka domu"), Sex::Female);
        assert_eq!(infer_sex("Wesoły piesek do adopcji"), Sex::Male);
        assert_eq!(infer_sex("Pies w średnim wieku"), Sex::Unknown);
        // "sukces" must not read as female
        assert_eq!(infer_sex("To będzie sukces adopcyjny"), Sex::Unknown);
    }

    #[test]
    fn external_id_prefers_query_param_then_slug() {
        assert_eq!(
            external_id_from_url("https://example.org/pokaz.php?id=1234"),
            Some("1234".to_string())
        );
        assert_eq!(
            external_id_from_url("https://example.org/pies/burek-42"),
            Some("burek-42".to_string())
        );
        assert_eq!(
            external_id_from_url("https://example.org/pies/burek-42/"),
            Some("burek-42".to_string())
        );
    }

    #[tokio::test]
    async fn failed_detail_fetch_drops_only_that_item() {
        use crate::testing::MockHttp;

        let http = MockHttp::new()
            .with_page("https://a.example.org/1", "first")
            .with_page("https://a.example.org/3", "third");
        let urls = vec![
            "https://a.example.org/1".to_string(),
            "https://a.example.org/2".to_string(),
            "https://a.example.org/3".to_string(),
        ];

        let bodies = fetch_detail_pages(&http, &urls, DETAIL_FETCH_WORKERS).await;

        assert_eq!(
            bodies,
            vec![
                Some("first".to_string()),
                None,
                Some("third".to_string()),
            ]
        );
    }
}
