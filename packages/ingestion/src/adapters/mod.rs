//! Shelter adapters: pluggable scrape/parse/transform units.
//!
//! One uniform contract, many interchangeable per-site implementations.
//! Adapters are referentially transparent given their inputs plus the
//! injected HTTP capability; they hold no hidden network state.

pub mod azyl;
pub mod listing;
pub mod promyk;
pub mod registry;

pub use azyl::AzylAdapter;
pub use promyk::PromykAdapter;
pub use registry::{AdapterInfo, AdapterRegistry};

use async_trait::async_trait;

use crate::error::{ParseError, ScrapeError};
use crate::http::HttpFetch;
use crate::model::{CreateDogInput, RawDogData, Shelter};

/// Static, per-site configuration an adapter is constructed with.
#[derive(Debug, Clone)]
pub struct ShelterConfig {
    /// Stable registry id
    pub id: String,
    pub slug: String,
    pub name: String,
    pub base_url: String,
    pub city: Option<String>,
}

impl ShelterConfig {
    /// Shelter record seeded from this config (for stores that start empty).
    pub fn to_shelter(&self) -> Shelter {
        let mut shelter = Shelter::new(&self.id, &self.slug, &self.name, &self.base_url);
        shelter.city = self.city.clone();
        shelter
    }
}

/// The fetch/parse/transform unit specific to one shelter's site format.
#[async_trait]
pub trait ShelterAdapter: Send + Sync {
    /// Site configuration this adapter was built with.
    fn config(&self) -> &ShelterConfig;

    /// Fetch the raw top-level listing content. A failure here is fatal for
    /// the shelter's run.
    async fn fetch(&self, http: &dyn HttpFetch) -> Result<String, ScrapeError>;

    /// Parse raw listing content into an ordered sequence of raw dog
    /// records. Per-detail-page failures are dropped silently; only a
    /// structural failure of the listing itself is fatal.
    async fn parse(
        &self,
        http: &dyn HttpFetch,
        raw: &str,
    ) -> Result<Vec<RawDogData>, ParseError>;

    /// Normalize one raw record into canonical create input. Pure.
    fn transform(&self, raw: RawDogData) -> Result<CreateDogInput, ParseError>;
}

/// Normalize a scraped name: trimmed, first letter uppercased.
pub(crate) fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
