//! Structured attribute extraction from descriptions and photos.

use std::sync::Arc;

use openai_client::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::llm::LanguageModel;
use super::{strip_code_fences, BREED_VOCABULARY};
use crate::costs::{self, CostTracker, TokenUsage};
use crate::error::{ExtractionError, ExtractionSource};
use crate::model::{AgeEstimate, BreedEstimate, SizeEstimate, WeightEstimate};

/// Shelter context threaded into prompts so the model can resolve local
/// references ("u nas w schronisku", city names).
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub shelter_name: String,
    pub city: Option<String>,
}

/// Structured attributes extracted from a raw description.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextExtraction {
    /// Breed guesses, most likely first
    pub breed_estimates: Vec<BreedEstimate>,
    pub size_estimate: Option<SizeEstimate>,
    pub age_estimate: Option<AgeEstimate>,
    pub weight_estimate: Option<WeightEstimate>,
    /// Short Polish personality tags, e.g. "łagodny", "energiczny"
    pub personality: Vec<String>,
    pub good_with_children: Option<bool>,
    pub good_with_dogs: Option<bool>,
    pub good_with_cats: Option<bool>,
    pub vaccinated: Option<bool>,
    pub sterilized: Option<bool>,
    /// Whether the source text signals an urgent case
    pub urgent: bool,
}

/// Structured attributes extracted from photos.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PhotoExtraction {
    pub breed_estimates: Vec<BreedEstimate>,
    pub size_estimate: Option<SizeEstimate>,
    /// Dominant coat colors visible in the photos
    pub colors: Vec<String>,
}

fn confidence_in_range(confidence: f32) -> bool {
    (0.0..=1.0).contains(&confidence)
}

impl TextExtraction {
    /// Schema-level validation beyond shape: confidences must be in [0, 1].
    fn validate(&self) -> Result<(), String> {
        for breed in &self.breed_estimates {
            if !confidence_in_range(breed.confidence) {
                return Err(format!(
                    "breed confidence out of range: {}",
                    breed.confidence
                ));
            }
        }
        if let Some(size) = &self.size_estimate {
            if !confidence_in_range(size.confidence) {
                return Err(format!("size confidence out of range: {}", size.confidence));
            }
        }
        if let Some(age) = &self.age_estimate {
            if !confidence_in_range(age.confidence) {
                return Err(format!("age confidence out of range: {}", age.confidence));
            }
            if age.min_months > age.max_months {
                return Err("age range inverted".to_string());
            }
        }
        Ok(())
    }
}

impl PhotoExtraction {
    fn validate(&self) -> Result<(), String> {
        for breed in &self.breed_estimates {
            if !confidence_in_range(breed.confidence) {
                return Err(format!(
                    "breed confidence out of range: {}",
                    breed.confidence
                ));
            }
        }
        Ok(())
    }
}

/// AI extraction service over an injected language model.
pub struct Extractor {
    llm: Arc<dyn LanguageModel>,
    text_model: String,
    photo_model: String,
    costs: Option<Arc<dyn CostTracker>>,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LanguageModel>, text_model: impl Into<String>, photo_model: impl Into<String>) -> Self {
        Self {
            llm,
            text_model: text_model.into(),
            photo_model: photo_model.into(),
            costs: None,
        }
    }

    /// Attach the optional cost tracker.
    pub fn with_cost_tracker(mut self, costs: Arc<dyn CostTracker>) -> Self {
        self.costs = Some(costs);
        self
    }

    /// Extract structured attributes from a raw description.
    pub async fn extract_from_text(
        &self,
        text: &str,
        context: &ExtractionContext,
    ) -> Result<TextExtraction, ExtractionError> {
        let system = format!(
            "Jesteś asystentem schroniska dla zwierząt. Na podstawie opisu psa \
             wyodrębnij ustrukturyzowane atrybuty. Wiek podawaj w miesiącach. \
             Pola, których nie da się ustalić z tekstu, zostaw puste (null). \
             Rasy wybieraj z listy: {}. Pewność (confidence) podawaj w zakresie 0-1.",
            BREED_VOCABULARY.join(", ")
        );
        let user = format!(
            "Schronisko: {} ({}).\n\nOpis psa:\n{}",
            context.shelter_name,
            context.city.as_deref().unwrap_or("miasto nieznane"),
            text
        );

        let reply = self
            .llm
            .structured(
                &self.text_model,
                &system,
                &user,
                "text_extraction",
                TextExtraction::openai_schema(),
            )
            .await
            .map_err(|e| {
                ExtractionError::with_cause(ExtractionSource::Text, "LLM call failed", e)
            })?;

        let extraction = parse_extraction::<TextExtraction>(&reply.content, ExtractionSource::Text)?;
        extraction
            .validate()
            .map_err(|reason| ExtractionError::new(ExtractionSource::Text, reason))?;

        self.track("extract_text", &self.text_model, reply.usage).await;
        debug!(
            breeds = extraction.breed_estimates.len(),
            personality = extraction.personality.len(),
            "text extraction complete"
        );

        Ok(extraction)
    }

    /// Extract structured attributes from dog photos.
    pub async fn extract_from_photos(
        &self,
        photo_urls: &[String],
        context: &ExtractionContext,
    ) -> Result<PhotoExtraction, ExtractionError> {
        if photo_urls.is_empty() {
            return Err(ExtractionError::new(
                ExtractionSource::Photo,
                "no photo urls supplied",
            ));
        }

        let system = format!(
            "Jesteś asystentem schroniska dla zwierząt. Na podstawie zdjęć psa \
             oceń rasę, rozmiar i umaszczenie. Rasy wybieraj z listy: {}. \
             Pewność podawaj w zakresie 0-1.",
            BREED_VOCABULARY.join(", ")
        );
        let user = format!(
            "Schronisko: {}.\n\nZdjęcia psa:\n{}",
            context.shelter_name,
            photo_urls.join("\n")
        );

        let reply = self
            .llm
            .structured(
                &self.photo_model,
                &system,
                &user,
                "photo_extraction",
                PhotoExtraction::openai_schema(),
            )
            .await
            .map_err(|e| {
                ExtractionError::with_cause(ExtractionSource::Photo, "LLM call failed", e)
            })?;

        let extraction =
            parse_extraction::<PhotoExtraction>(&reply.content, ExtractionSource::Photo)?;
        extraction
            .validate()
            .map_err(|reason| ExtractionError::new(ExtractionSource::Photo, reason))?;

        self.track("extract_photo", &self.photo_model, reply.usage)
            .await;

        Ok(extraction)
    }

    async fn track(&self, operation: &str, model: &str, usage: TokenUsage) {
        costs::track(&self.costs, operation, model, usage).await;
    }
}

/// Shared response handling: empty check, fence stripping, JSON parse.
fn parse_extraction<T: serde::de::DeserializeOwned>(
    content: &str,
    source_kind: ExtractionSource,
) -> Result<T, ExtractionError> {
    let stripped = strip_code_fences(content);
    if stripped.is_empty() {
        return Err(ExtractionError::new(source_kind, "empty response"));
    }
    serde_json::from_str(stripped)
        .map_err(|e| ExtractionError::with_cause(source_kind, "response is not valid JSON", e))
}
