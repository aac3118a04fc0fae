//! Adoption bio generation.

use std::sync::Arc;

use openai_client::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::llm::LanguageModel;
use super::strip_code_fences;
use crate::costs::{self, CostTracker};
use crate::error::GenerationError;
use crate::model::{BioTone, Dog};

/// A generated adoption bio with its narrative tone.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedBio {
    /// Warm, first-person-adjacent Polish narrative (3-5 sentences)
    pub bio: String,
    pub tone: BioTone,
}

/// Generates warm adoption bios from canonical dog data.
pub struct DescriptionGenerator {
    llm: Arc<dyn LanguageModel>,
    model: String,
    costs: Option<Arc<dyn CostTracker>>,
}

impl DescriptionGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            costs: None,
        }
    }

    /// Attach the optional cost tracker.
    pub fn with_cost_tracker(mut self, costs: Arc<dyn CostTracker>) -> Self {
        self.costs = Some(costs);
        self
    }

    /// Generate a bio for a dog. Uses the same strict-schema call pattern as
    /// extraction; failures are not retried here.
    pub async fn generate(&self, dog: &Dog) -> Result<GeneratedBio, GenerationError> {
        let system = "Jesteś copywriterem schroniska dla zwierząt. Napisz ciepłą, \
                      poruszającą notkę adopcyjną po polsku (3-5 zdań), opartą \
                      wyłącznie na podanych faktach. Wybierz ton: hopeful dla psów \
                      bez presji czasu, urgent dla pilnych przypadków, gentle dla \
                      psów lękliwych lub starszych.";

        let breeds: Vec<&str> = dog
            .breed_estimates
            .iter()
            .map(|b| b.breed.as_str())
            .collect();
        let user = format!(
            "Imię: {}\nPłeć: {}\nRasa: {}\nCharakter: {}\nMiasto: {}\nPilny: {}\n\nOpis źródłowy:\n{}",
            dog.name,
            dog.sex.as_str(),
            if breeds.is_empty() { "nieznana".to_string() } else { breeds.join(", ") },
            dog.personality.join(", "),
            dog.city.as_deref().unwrap_or("nieznane"),
            if dog.urgent { "tak" } else { "nie" },
            dog.description
        );

        let reply = self
            .llm
            .structured(
                &self.model,
                system,
                &user,
                "generated_bio",
                GeneratedBio::openai_schema(),
            )
            .await
            .map_err(|e| GenerationError::with_cause("LLM call failed", e))?;

        let stripped = strip_code_fences(&reply.content);
        if stripped.is_empty() {
            return Err(GenerationError::new("empty response"));
        }

        let generated: GeneratedBio = serde_json::from_str(stripped)
            .map_err(|e| GenerationError::with_cause("response is not valid JSON", e))?;

        if generated.bio.trim().is_empty() {
            return Err(GenerationError::new("generated bio is empty"));
        }

        costs::track(&self.costs, "generate_bio", &self.model, reply.usage).await;

        Ok(generated)
    }
}
