//! AI extraction and bio generation.
//!
//! Both services follow the same call pattern: build a templated prompt,
//! call the LLM with a strict JSON-schema-constrained response format,
//! strip any markdown code fencing, parse, validate. Failures surface as
//! typed errors and are never retried at this layer; retry is the job
//! queue's concern.

pub mod extractor;
pub mod generator;
pub mod llm;

pub use extractor::{Extractor, PhotoExtraction, TextExtraction};
pub use generator::{DescriptionGenerator, GeneratedBio};
pub use llm::{EmbeddingReply, LanguageModel, LlmError, LlmReply};

/// Controlled breed vocabulary offered to the model. Extraction output is
/// validated against free text, not this list, but prompting with it keeps
/// the answers consistent across shelters.
pub const BREED_VOCABULARY: &[&str] = &[
    "mieszaniec",
    "owczarek niemiecki",
    "labrador retriever",
    "golden retriever",
    "husky syberyjski",
    "beagle",
    "jack russell terrier",
    "amstaff",
    "cocker spaniel",
    "sznaucer",
    "jamnik",
    "maltańczyk",
    "shih tzu",
    "border collie",
    "rottweiler",
    "bokser",
];

/// Strip a markdown code fence (```json ... ``` or ``` ... ```) wrapping a
/// model response, if present.
pub fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let wrapped = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(wrapped), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        let wrapped = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(wrapped), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
