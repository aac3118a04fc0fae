//! Adapter for Fundacja Azyl: the site exposes a JSON listing endpoint, so
//! no detail-page crawling is needed.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{normalize_name, ShelterAdapter, ShelterConfig};
use crate::error::{ParseError, ScrapeError};
use crate::http::HttpFetch;
use crate::model::{CreateDogInput, RawDogData, Sex};

/// One entry in the site's JSON listing.
#[derive(Debug, Deserialize)]
struct AzylEntry {
    id: u64,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sex: Option<String>,
    #[serde(default)]
    breed: Option<String>,
    #[serde(default)]
    age: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    photos: Vec<String>,
    #[serde(default)]
    urgent: bool,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzylListing {
    dogs: Vec<AzylEntry>,
}

/// JSON-endpoint adapter.
pub struct AzylAdapter {
    config: ShelterConfig,
}

impl AzylAdapter {
    pub fn new(config: ShelterConfig) -> Self {
        Self { config }
    }

    /// Production site configuration.
    pub fn default_config() -> ShelterConfig {
        ShelterConfig {
            id: "azyl".to_string(),
            slug: "fundacja-azyl".to_string(),
            name: "Fundacja Azyl".to_string(),
            base_url: "https://fundacja-azyl.pl".to_string(),
            city: Some("Kraków".to_string()),
        }
    }

    fn listing_url(&self) -> String {
        format!("{}/api/dogs.json", self.config.base_url.trim_end_matches('/'))
    }

    fn parse_sex(value: Option<&str>) -> Sex {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("pies") | Some("samiec") | Some("male") => Sex::Male,
            Some("suka") | Some("samica") | Some("female") => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

#[async_trait]
impl ShelterAdapter for AzylAdapter {
    fn config(&self) -> &ShelterConfig {
        &self.config
    }

    async fn fetch(&self, http: &dyn HttpFetch) -> Result<String, ScrapeError> {
        http.get_text(&self.listing_url()).await.map_err(|e| {
            ScrapeError::with_cause(&self.config.id, "listing endpoint fetch failed", e)
        })
    }

    async fn parse(
        &self,
        _http: &dyn HttpFetch,
        raw: &str,
    ) -> Result<Vec<RawDogData>, ParseError> {
        // A malformed listing document is a structural failure: fatal for
        // this shelter's run.
        let listing: AzylListing = serde_json::from_str(raw)
            .map_err(|e| ParseError::new(format!("listing JSON is malformed: {}", e)))?;

        let base_url = Url::parse(&self.config.base_url)
            .map_err(|e| ParseError::new(format!("invalid base url: {}", e)))?;

        let mut dogs = Vec::new();
        for entry in listing.dogs {
            if entry.name.trim().is_empty() {
                warn!(entry_id = entry.id, "listing entry without a name, dropping item");
                continue;
            }

            let external_id = entry.id.to_string();
            let photo_urls = entry
                .photos
                .iter()
                .filter_map(|photo| base_url.join(photo).ok())
                .map(|url| url.to_string())
                .collect();
            let source_url = entry
                .url
                .as_deref()
                .and_then(|u| base_url.join(u).ok())
                .map(|u| u.to_string());

            dogs.push(RawDogData {
                fingerprint_seed: format!("{}:{}", self.config.id, external_id),
                external_id,
                name: entry.name,
                raw_description: entry.description.unwrap_or_default(),
                breed: entry.breed,
                age_text: entry.age,
                size_text: entry.size,
                sex: Self::parse_sex(entry.sex.as_deref()),
                personality: Vec::new(),
                photo_urls,
                urgent: entry.urgent,
                source_url,
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

        // The JSON listing often carries breed/age as free text; those feed
        // the description so text extraction can pick them up.
        let mut description = raw.raw_description.trim().to_string();
        if let Some(breed) = &raw.breed {
            description.push_str(&format!("\nRasa: {}", breed));
        }
        if let Some(age) = &raw.age_text {
            description.push_str(&format!("\nWiek: {}", age));
        }
        if let Some(size) = &raw.size_text {
            description.push_str(&format!("\nWielkość: {}", size));
        }

        Ok(CreateDogInput {
            shelter_id: self.config.id.clone(),
            external_id: raw.external_id,
            name,
            sex: raw.sex,
            description: description.trim().to_string(),
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
