//! Canonical domain records for the ingestion pipeline.
//!
//! `RawDogData` is adapter-local and ephemeral, `CreateDogInput` is the
//! adapter's normalized output, `Dog` is the persisted canonical record.
//! The dog fingerprint is always derived via [`crate::fingerprint::compute`]
//! over the content-bearing fields; nothing in this module sets it directly.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::{self, FingerprintInput};

// ============================================================================
// Shelter
// ============================================================================

/// Operational status of a shelter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShelterStatus {
    Active,
    Inactive,
    Error,
}

/// A source organization whose listings page is scraped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelter {
    /// Stable adapter-registry id
    pub id: String,
    pub slug: String,
    pub name: String,
    pub url: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub status: ShelterStatus,
    /// When the last scrape run finished successfully
    pub last_sync: Option<DateTime<Utc>>,
}

impl Shelter {
    /// Minimal shelter record for a registered adapter.
    pub fn new(
        id: impl Into<String>,
        slug: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
            url: url.into(),
            city: None,
            region: None,
            lat: None,
            lng: None,
            email: None,
            phone: None,
            active: true,
            status: ShelterStatus::Active,
            last_sync: None,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}

// ============================================================================
// Sync log
// ============================================================================

/// Append-only record of one scrape run. Created at run start, finalized at
/// run end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: Uuid,
    pub shelter_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dogs_added: u32,
    pub dogs_updated: u32,
    pub dogs_removed: u32,
    pub errors: Vec<String>,
}

impl SyncLog {
    pub fn start(shelter_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            shelter_id: shelter_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            dogs_added: 0,
            dogs_updated: 0,
            dogs_removed: 0,
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

// ============================================================================
// Dog
// ============================================================================

/// Sex of a dog, inferred from page text or left unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Canonical wire string, used for fingerprints and search metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unknown => "unknown",
        }
    }
}

/// Adoption status of a canonical dog record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DogStatus {
    #[default]
    Available,
    Adopted,
    Reserved,
    Removed,
}

/// One breed guess with confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BreedEstimate {
    /// Breed name from the controlled vocabulary
    pub breed: String,
    pub confidence: f32,
}

/// Size bucket used for search facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SizeEstimate {
    pub category: SizeCategory,
    pub confidence: f32,
}

/// Age estimate in months, with a plausible range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgeEstimate {
    pub months: u32,
    pub min_months: u32,
    pub max_months: u32,
    pub confidence: f32,
}

/// Weight estimate in kilograms, with a plausible range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeightEstimate {
    pub kg: f32,
    pub min_kg: f32,
    pub max_kg: f32,
    pub confidence: f32,
}

/// Adapter-local intermediate scraped from one detail page. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct RawDogData {
    /// `"{shelter_id}:{external_id}"`
    pub fingerprint_seed: String,
    pub external_id: String,
    pub name: String,
    pub raw_description: String,
    pub breed: Option<String>,
    pub age_text: Option<String>,
    pub size_text: Option<String>,
    pub sex: Sex,
    pub personality: Vec<String>,
    pub photo_urls: Vec<String>,
    pub urgent: bool,
    pub source_url: Option<String>,
}

/// Adapter output after `transform`: the canonical dog shape minus generated
/// and meta fields. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDogInput {
    pub shelter_id: String,
    pub external_id: String,
    pub name: String,
    pub sex: Sex,
    pub description: String,
    pub city: Option<String>,
    pub breed_estimates: Vec<BreedEstimate>,
    pub size_estimate: Option<SizeEstimate>,
    pub age_estimate: Option<AgeEstimate>,
    pub weight_estimate: Option<WeightEstimate>,
    pub personality: Vec<String>,
    pub good_with_children: Option<bool>,
    pub good_with_dogs: Option<bool>,
    pub good_with_cats: Option<bool>,
    pub vaccinated: Option<bool>,
    pub sterilized: Option<bool>,
    pub photo_urls: Vec<String>,
    pub urgent: bool,
    pub source_url: Option<String>,
}

impl CreateDogInput {
    /// The content-bearing fields the fingerprint digests.
    pub fn fingerprint_input(&self) -> FingerprintInput<'_> {
        FingerprintInput {
            name: &self.name,
            sex: self.sex,
            description: &self.description,
            breed_estimates: &self.breed_estimates,
            size_estimate: self.size_estimate.as_ref(),
            age_estimate: self.age_estimate.as_ref(),
            personality: &self.personality,
            photo_urls: &self.photo_urls,
            urgent: self.urgent,
        }
    }

    /// Compute the derived fingerprint for this input.
    pub fn fingerprint(&self) -> String {
        fingerprint::compute(&self.fingerprint_input())
    }
}

/// Tone of a generated bio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BioTone {
    Hopeful,
    Urgent,
    Gentle,
}

/// The normalized, persisted representation of one adoptable dog.
///
/// Identity `(id, shelter_id, external_id)` is unique per shelter. The
/// pipeline never hard-deletes: dogs that disappear from the source are
/// soft-removed (`status = removed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dog {
    pub id: Uuid,
    pub shelter_id: String,
    pub external_id: String,
    pub name: String,
    pub sex: Sex,
    pub description: String,
    pub city: Option<String>,
    pub breed_estimates: Vec<BreedEstimate>,
    pub size_estimate: Option<SizeEstimate>,
    pub age_estimate: Option<AgeEstimate>,
    pub weight_estimate: Option<WeightEstimate>,
    pub personality: Vec<String>,
    /// Nullable on purpose: "unknown" is distinct from "false"
    pub good_with_children: Option<bool>,
    pub good_with_dogs: Option<bool>,
    pub good_with_cats: Option<bool>,
    pub vaccinated: Option<bool>,
    pub sterilized: Option<bool>,
    /// Source photo URLs (fingerprinted content)
    pub photo_urls: Vec<String>,
    /// Object-storage keys written by the image worker
    pub photo_keys: Vec<String>,
    pub generated_photo_keys: Vec<String>,
    /// Derived change-detection digest; recomputed whenever content fields
    /// change, never settable on its own
    pub fingerprint: String,
    pub bio: Option<String>,
    pub bio_tone: Option<BioTone>,
    pub status: DogStatus,
    pub urgent: bool,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dog {
    /// Create a canonical record from adapter output on first sighting.
    pub fn from_input(input: CreateDogInput) -> Self {
        let fingerprint = input.fingerprint();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            shelter_id: input.shelter_id,
            external_id: input.external_id,
            name: input.name,
            sex: input.sex,
            description: input.description,
            city: input.city,
            breed_estimates: input.breed_estimates,
            size_estimate: input.size_estimate,
            age_estimate: input.age_estimate,
            weight_estimate: input.weight_estimate,
            personality: input.personality,
            good_with_children: input.good_with_children,
            good_with_dogs: input.good_with_dogs,
            good_with_cats: input.good_with_cats,
            vaccinated: input.vaccinated,
            sterilized: input.sterilized,
            photo_urls: input.photo_urls,
            photo_keys: Vec::new(),
            generated_photo_keys: Vec::new(),
            fingerprint,
            bio: None,
            bio_tone: None,
            status: DogStatus::Available,
            urgent: input.urgent,
            source_url: input.source_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite content fields from fresh adapter output, keeping identity,
    /// photo keys, bio and timestamps of first sighting. Recomputes the
    /// fingerprint from the new content.
    pub fn apply_input(&mut self, input: CreateDogInput) {
        self.name = input.name;
        self.sex = input.sex;
        self.description = input.description;
        self.city = input.city;
        self.breed_estimates = input.breed_estimates;
        self.size_estimate = input.size_estimate;
        self.age_estimate = input.age_estimate;
        self.weight_estimate = input.weight_estimate;
        self.personality = input.personality;
        self.good_with_children = input.good_with_children;
        self.good_with_dogs = input.good_with_dogs;
        self.good_with_cats = input.good_with_cats;
        self.vaccinated = input.vaccinated;
        self.sterilized = input.sterilized;
        self.photo_urls = input.photo_urls;
        self.urgent = input.urgent;
        self.source_url = input.source_url;
        self.status = DogStatus::Available;
        self.refresh_fingerprint();
    }

    /// The content-bearing fields the fingerprint digests.
    pub fn fingerprint_input(&self) -> FingerprintInput<'_> {
        FingerprintInput {
            name: &self.name,
            sex: self.sex,
            description: &self.description,
            breed_estimates: &self.breed_estimates,
            size_estimate: self.size_estimate.as_ref(),
            age_estimate: self.age_estimate.as_ref(),
            personality: &self.personality,
            photo_urls: &self.photo_urls,
            urgent: self.urgent,
        }
    }

    /// Recompute the derived fingerprint after any content-field mutation.
    pub fn refresh_fingerprint(&mut self) {
        self.fingerprint = fingerprint::compute(&self.fingerprint_input());
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Cost ledger
// ============================================================================

/// One entry in the append-only API cost ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCostEntry {
    pub created_at: DateTime<Utc>,
    /// Pipeline operation, e.g. "extract_text", "generate_bio", "embed"
    pub operation: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> CreateDogInput {
        CreateDogInput {
            shelter_id: "promyk".into(),
            external_id: "burek-42".into(),
            name: "Burek".into(),
            sex: Sex::Male,
            description: "Wesoły pies szuka domu.".into(),
            city: Some("Warszawa".into()),
            breed_estimates: vec![BreedEstimate {
                breed: "mieszaniec".into(),
                confidence: 0.8,
            }],
            size_estimate: None,
            age_estimate: None,
            weight_estimate: None,
            personality: vec!["przyjazny".into()],
            good_with_children: None,
            good_with_dogs: Some(true),
            good_with_cats: None,
            vaccinated: None,
            sterilized: None,
            photo_urls: vec!["https://example.org/burek.jpg".into()],
            urgent: false,
            source_url: Some("https://example.org/pies/burek-42".into()),
        }
    }

    #[test]
    fn from_input_derives_fingerprint() {
        let input = sample_input();
        let expected = input.fingerprint();
        let dog = Dog::from_input(input);

        assert_eq!(dog.fingerprint, expected);
        assert_eq!(dog.status, DogStatus::Available);
        assert!(dog.photo_keys.is_empty());
    }

    #[test]
    fn apply_input_refreshes_fingerprint() {
        let mut dog = Dog::from_input(sample_input());
        let before = dog.fingerprint.clone();

        let mut changed = sample_input();
        changed.description = "Zupełnie nowy opis.".into();
        dog.apply_input(changed);

        assert_ne!(dog.fingerprint, before);
    }

    #[test]
    fn unknown_health_flags_stay_null() {
        let dog = Dog::from_input(sample_input());
        assert_eq!(dog.good_with_children, None);
        assert_eq!(dog.good_with_dogs, Some(true));
    }
}
