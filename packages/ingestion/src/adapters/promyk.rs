//! Adapter for Schronisko Promyk: a classic HTML listing page linking to
//! per-dog detail pages.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;
use url::Url;

use super::listing::{self, DETAIL_FETCH_WORKERS, MAX_DETAIL_PAGES};
use super::{normalize_name, ShelterAdapter, ShelterConfig};
use crate::error::{ParseError, ScrapeError};
use crate::http::HttpFetch;
use crate::model::{CreateDogInput, RawDogData};

/// Content-area selectors tried in order; first match wins.
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".entry-content",
    ".post-content",
    "article",
    "#content",
    ".content",
];

fn detail_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/pies/[a-z0-9-]+/?$").expect("static detail pattern is valid")
    })
}

/// HTML listing + detail-page adapter.
pub struct PromykAdapter {
    config: ShelterConfig,
}

impl PromykAdapter {
    pub fn new(config: ShelterConfig) -> Self {
        Self { config }
    }

    /// Production site configuration.
    pub fn default_config() -> ShelterConfig {
        ShelterConfig {
            id: "promyk".to_string(),
            slug: "schronisko-promyk".to_string(),
            name: "Schronisko Promyk".to_string(),
            base_url: "https://schroniskopromyk.pl".to_string(),
            city: Some("Warszawa".to_string()),
        }
    }

    fn listing_url(&self) -> String {
        format!("{}/psy-do-adopcji", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ShelterAdapter for PromykAdapter {
    fn config(&self) -> &ShelterConfig {
        &self.config
    }

    async fn fetch(&self, http: &dyn HttpFetch) -> Result<String, ScrapeError> {
        http.get_text(&self.listing_url()).await.map_err(|e| {
            ScrapeError::with_cause(&self.config.id, "listing fetch failed", e)
        })
    }

    async fn parse(
        &self,
        http: &dyn HttpFetch,
        raw: &str,
    ) -> Result<Vec<RawDogData>, ParseError> {
        let base_url = Url::parse(&self.config.base_url)
            .map_err(|e| ParseError::new(format!("invalid base url: {}", e)))?;

        let detail_urls =
            listing::extract_detail_urls(raw, &base_url, detail_pattern(), MAX_DETAIL_PAGES);
        let bodies = listing::fetch_detail_pages(http, &detail_urls, DETAIL_FETCH_WORKERS).await;

        let mut dogs = Vec::new();
        for (url, body) in detail_urls.iter().zip(bodies) {
            let Some(body) = body else {
                continue;
            };
            let fields = listing::extract_detail_fields(&body, &base_url, DESCRIPTION_SELECTORS);

            let Some(name) = fields.name else {
                warn!(url = %url, "detail page without a name heading, dropping item");
                continue;
            };
            let Some(external_id) = listing::external_id_from_url(url) else {
                warn!(url = %url, "could not derive external id, dropping item");
                continue;
            };

            dogs.push(RawDogData {
                fingerprint_seed: format!("{}:{}", self.config.id, external_id),
                external_id,
                name,
                raw_description: fields.description.unwrap_or_default(),
                breed: None,
                age_text: None,
                size_text: None,
                sex: fields.sex,
                personality: Vec::new(),
                photo_urls: fields.photo_urls,
                urgent: fields.urgent,
                source_url: Some(url.clone()),
            });
        }

        Ok(dogs)
    }

    fn transform(&self, raw: RawDogData) -> Result<CreateDogInput, ParseError> {
        let name = normalize_name(&raw.name);
        if name.is_empty() {
            return Err(ParseError::new(format!(
                "empty name for external id {}",
                raw.external_id
            )));
        }
        if raw.external_id.is_empty() {
            return Err(ParseError::new("empty external id"));
        }

        Ok(CreateDogInput {
            shelter_id: self.config.id.clone(),
            external_id: raw.external_id,
            name,
            sex: raw.sex,
            description: raw.raw_description.trim().to_string(),
            city: self.config.city.clone(),
            breed_estimates: Vec::new(),
            size_estimate: None,
            age_estimate: None,
            weight_estimate: None,
            personality: raw.personality,
            good_with_children: None,
            good_with_dogs: None,
            good_with_cats: None,
            vaccinated: None,
            sterilized: None,
            photo_urls: raw.photo_urls,
            urgent: raw.urgent,
            source_url: raw.source_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;
    use crate::testing::MockHttp;

    fn adapter() -> PromykAdapter {
        PromykAdapter::new(ShelterConfig {
            id: "promyk".into(),
            slug: "schronisko-promyk".into(),
            name: "Schronisko Promyk".into(),
            base_url: "https://promyk.example.org".into(),
            city: Some("Warszawa".into()),
        })
    }

    const LISTING: &str = r#"
        <html><body>
          <a href="/pies/burek-42">Burek</a>
          <a href="/pies/luna-7">Luna</a>
        </body></html>
    "#;

    const BUREK: &str = r#"
        <html><body>
          <h1>Burek</h1>
          <div class="entry-content">
            <p>Wesoły piesek, kocha spacery.</p>
            <img src="/foto/burek.jpg">
          </div>
        </body></html>
    "#;

    const LUNA: &str = r#"
        <html><body>
          <h1>Luna</h1>
          <div class="entry-content"><p>Łagodna suczka.</p></div>
        </body></html>
    "#;

    #[tokio::test]
    async fn parses_listing_into_ordered_raw_records() {
        let http = MockHttp::new()
            .with_page("https://promyk.example.org/psy-do-adopcji", LISTING)
            .with_page("https://promyk.example.org/pies/burek-42", BUREK)
            .with_page("https://promyk.example.org/pies/luna-7", LUNA);

        let adapter = adapter();
        let raw = adapter.fetch(&http).await.unwrap();
        let dogs = adapter.parse(&http, &raw).await.unwrap();

        assert_eq!(dogs.len(), 2);
        assert_eq!(dogs[0].external_id, "burek-42");
        assert_eq!(dogs[0].fingerprint_seed, "promyk:burek-42");
        assert_eq!(dogs[0].sex, Sex::Male);
        assert!(dogs[0].photo_urls[0].ends_with("/foto/burek.jpg"));
        assert_eq!(dogs[1].external_id, "luna-7");
        assert_eq!(dogs[1].sex, Sex::Female);
    }

    #[tokio::test]
    async fn failing_detail_page_is_dropped_silently() {
        let http = MockHttp::new()
            .with_page("https://promyk.example.org/psy-do-adopcji", LISTING)
            .with_page("https://promyk.example.org/pies/luna-7", LUNA);

        let adapter = adapter();
        let raw = adapter.fetch(&http).await.unwrap();
        let dogs = adapter.parse(&http, &raw).await.unwrap();

        assert_eq!(dogs.len(), 1);
        assert_eq!(dogs[0].external_id, "luna-7");
    }

    #[tokio::test]
    async fn listing_fetch_failure_is_fatal() {
        let http = MockHttp::new();
        let result = adapter().fetch(&http).await;
        let err = result.unwrap_err();
        assert_eq!(err.shelter_id, "promyk");
    }

    #[test]
    fn transform_normalizes_and_keeps_city() {
        let adapter = adapter();
        let raw = RawDogData {
            fingerprint_seed: "promyk:burek-42".into(),
            external_id: "burek-42".into(),
            name: "  burek ".into(),
            raw_description: " Opis psa. ".into(),
            sex: Sex::Male,
            ..Default::default()
        };

        let input = adapter.transform(raw).unwrap();
        assert_eq!(input.name, "Burek");
        assert_eq!(input.description, "Opis psa.");
        assert_eq!(input.city.as_deref(), Some("Warszawa"));
        assert!(input.breed_estimates.is_empty());
    }

    #[test]
    fn transform_rejects_empty_name() {
        let raw = RawDogData {
            external_id: "x-1".into(),
            name: "   ".into(),
            ..Default::default()
        };
        assert!(adapter().transform(raw).is_err());
    }
}
