//! Diff engine: classify fresh candidates against stored fingerprints.
//!
//! The skip-on-unchanged rule here is the pipeline's primary cost control:
//! a candidate whose fingerprint matches the stored one triggers no AI,
//! storage, or index work at all.

use std::collections::{HashMap, HashSet};

use crate::model::CreateDogInput;

/// A transformed candidate with its derived fingerprint.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub input: CreateDogInput,
    pub fingerprint: String,
}

impl Candidate {
    /// Compute the fingerprint for an adapter output.
    pub fn new(input: CreateDogInput) -> Self {
        let fingerprint = input.fingerprint();
        Self { input, fingerprint }
    }
}

/// Classification of one shelter's fresh candidate set against the stored
/// `external_id → fingerprint` map.
#[derive(Debug, Default)]
pub struct DiffOutcome {
    /// Unknown external ids: create + reindex upsert
    pub creates: Vec<Candidate>,
    /// Known external ids whose fingerprint changed: update + reindex upsert
    pub updates: Vec<Candidate>,
    /// Known external ids with unchanged fingerprints: no work at all
    pub unchanged: Vec<String>,
    /// Stored external ids absent from the fresh set: soft-remove + reindex delete
    pub removed: Vec<String>,
}

impl DiffOutcome {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.removed.is_empty()
    }
}

/// Classify candidates for one shelter sync.
///
/// `stored` is the persisted `external_id → fingerprint` map for the
/// shelter; `fresh` is the transformed+extracted candidate set from the
/// current run. Pure: ordering of `creates`/`updates` follows the fresh
/// candidate order, `removed` is sorted for determinism.
pub fn classify(stored: &HashMap<String, String>, fresh: Vec<Candidate>) -> DiffOutcome {
    let mut outcome = DiffOutcome::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(fresh.len());

    for candidate in fresh {
        let external_id = candidate.input.external_id.clone();
        seen.insert(external_id.clone());

        match stored.get(&external_id) {
            None => outcome.creates.push(candidate),
            Some(existing) if *existing != candidate.fingerprint => {
                outcome.updates.push(candidate)
            }
            Some(_) => outcome.unchanged.push(external_id),
        }
    }

    let mut removed: Vec<String> = stored
        .keys()
        .filter(|id| !seen.contains(*id))
        .cloned()
        .collect();
    removed.sort();
    outcome.removed = removed;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;

    fn input(external_id: &str, description: &str) -> CreateDogInput {
        CreateDogInput {
            shelter_id: "promyk".into(),
            external_id: external_id.into(),
            name: external_id.to_uppercase(),
            sex: Sex::Unknown,
            description: description.into(),
            city: None,
            breed_estimates: Vec::new(),
            size_estimate: None,
            age_estimate: None,
            weight_estimate: None,
            personality: Vec::new(),
            good_with_children: None,
            good_with_dogs: None,
            good_with_cats: None,
            vaccinated: None,
            sterilized: None,
            photo_urls: Vec::new(),
            urgent: false,
            source_url: None,
        }
    }

    #[test]
    fn classifies_new_changed_unchanged_and_removed() {
        let d1 = Candidate::new(input("d1", "opis psa d1"));
        let d2 = Candidate::new(input("d2", "nowy opis psa d2"));
        let d3 = Candidate::new(input("d3", "opis psa d3"));

        let mut stored = HashMap::new();
        stored.insert("d1".to_string(), d1.fingerprint.clone());
        stored.insert("d2".to_string(), "stale-fingerprint".to_string());
        stored.insert("d4".to_string(), "whatever".to_string());

        let outcome = classify(&stored, vec![d1, d2, d3]);

        assert_eq!(outcome.unchanged, vec!["d1".to_string()]);
        assert_eq!(outcome.updates.len(), 1);
        assert_eq!(outcome.updates[0].input.external_id, "d2");
        assert_eq!(outcome.creates.len(), 1);
        assert_eq!(outcome.creates[0].input.external_id, "d3");
        assert_eq!(outcome.removed, vec!["d4".to_string()]);
    }

    #[test]
    fn empty_fresh_set_removes_everything_stored() {
        let mut stored = HashMap::new();
        stored.insert("a".to_string(), "fp-a".to_string());
        stored.insert("b".to_string(), "fp-b".to_string());

        let outcome = classify(&stored, Vec::new());

        assert!(outcome.creates.is_empty());
        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.removed, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rerunning_unchanged_content_is_a_noop() {
        let candidate = Candidate::new(input("d1", "ten sam opis"));
        let mut stored = HashMap::new();
        stored.insert("d1".to_string(), candidate.fingerprint.clone());

        let outcome = classify(&stored, vec![candidate]);

        assert!(outcome.is_empty());
        assert_eq!(outcome.unchanged.len(), 1);
    }
}
