//! Content fingerprinting for change detection.
//!
//! The fingerprint is a SHA-256 digest over a fixed, explicitly enumerated
//! subset of a dog's content-bearing fields, serialized to a canonical
//! line-oriented form. It is a change-detection digest, not a security
//! primitive: what matters is that it is deterministic across runs and
//! processes, and that any change to one of the digested fields produces a
//! different value.

use sha2::{Digest, Sha256};

use crate::model::{AgeEstimate, BreedEstimate, Sex, SizeEstimate};

/// The nine content-bearing fields that feed the digest, in fixed order.
#[derive(Debug, Clone)]
pub struct FingerprintInput<'a> {
    pub name: &'a str,
    pub sex: Sex,
    pub description: &'a str,
    pub breed_estimates: &'a [BreedEstimate],
    pub size_estimate: Option<&'a SizeEstimate>,
    pub age_estimate: Option<&'a AgeEstimate>,
    pub personality: &'a [String],
    pub photo_urls: &'a [String],
    pub urgent: bool,
}

/// Compute the canonical fingerprint for the given fields.
///
/// Field order, separators and float formatting are all fixed: two inputs
/// with identical field values always serialize identically.
pub fn compute(input: &FingerprintInput<'_>) -> String {
    let mut canonical = String::new();

    push_field(&mut canonical, "name", input.name);
    push_field(&mut canonical, "sex", input.sex.as_str());
    push_field(&mut canonical, "description", input.description);

    let breeds = input
        .breed_estimates
        .iter()
        .map(|b| format!("{}:{}", b.breed, format_confidence(b.confidence)))
        .collect::<Vec<_>>()
        .join("|");
    push_field(&mut canonical, "breeds", &breeds);

    let size = input
        .size_estimate
        .map(|s| format!("{}:{}", s.category.as_str(), format_confidence(s.confidence)))
        .unwrap_or_default();
    push_field(&mut canonical, "size", &size);

    let age = input
        .age_estimate
        .map(|a| {
            format!(
                "{}:{}:{}:{}",
                a.months,
                a.min_months,
                a.max_months,
                format_confidence(a.confidence)
            )
        })
        .unwrap_or_default();
    push_field(&mut canonical, "age", &age);

    push_field(&mut canonical, "personality", &input.personality.join(","));
    push_field(&mut canonical, "photos", &input.photo_urls.join(","));
    push_field(&mut canonical, "urgent", if input.urgent { "true" } else { "false" });

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn push_field(buf: &mut String, key: &str, value: &str) {
    buf.push_str(key);
    buf.push('=');
    buf.push_str(value);
    buf.push('\n');
}

/// Fixed-precision confidence rendering so float noise cannot perturb the
/// canonical form.
fn format_confidence(confidence: f32) -> String {
    format!("{:.4}", confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SizeCategory;

    fn sample<'a>(
        breeds: &'a [BreedEstimate],
        personality: &'a [String],
        photos: &'a [String],
    ) -> FingerprintInput<'a> {
        FingerprintInput {
            name: "Saba",
            sex: Sex::Female,
            description: "Łagodna sunia, lubi dzieci.",
            breed_estimates: breeds,
            size_estimate: None,
            age_estimate: None,
            personality,
            photo_urls: photos,
            urgent: false,
        }
    }

    #[test]
    fn equal_inputs_yield_equal_fingerprints() {
        let breeds = vec![BreedEstimate {
            breed: "owczarek niemiecki".into(),
            confidence: 0.75,
        }];
        let personality = vec!["łagodna".to_string()];
        let photos = vec!["https://example.org/saba.jpg".to_string()];

        let a = compute(&sample(&breeds, &personality, &photos));
        let b = compute(&sample(&breeds, &personality, &photos));

        assert_eq!(a, b);
    }

    #[test]
    fn each_field_perturbs_the_digest() {
        let breeds = vec![BreedEstimate {
            breed: "mieszaniec".into(),
            confidence: 0.5,
        }];
        let personality = vec!["energiczny".to_string()];
        let photos = vec!["https://example.org/a.jpg".to_string()];
        let base = compute(&sample(&breeds, &personality, &photos));

        let mut changed = sample(&breeds, &personality, &photos);
        changed.name = "Inna";
        assert_ne!(compute(&changed), base);

        let mut changed = sample(&breeds, &personality, &photos);
        changed.sex = Sex::Male;
        assert_ne!(compute(&changed), base);

        let mut changed = sample(&breeds, &personality, &photos);
        changed.description = "Inny opis.";
        assert_ne!(compute(&changed), base);

        let other_breeds = vec![BreedEstimate {
            breed: "labrador retriever".into(),
            confidence: 0.5,
        }];
        let mut changed = sample(&breeds, &personality, &photos);
        changed.breed_estimates = &other_breeds;
        assert_ne!(compute(&changed), base);

        let size = SizeEstimate {
            category: SizeCategory::Large,
            confidence: 0.9,
        };
        let mut changed = sample(&breeds, &personality, &photos);
        changed.size_estimate = Some(&size);
        assert_ne!(compute(&changed), base);

        let age = AgeEstimate {
            months: 24,
            min_months: 18,
            max_months: 36,
            confidence: 0.6,
        };
        let mut changed = sample(&breeds, &personality, &photos);
        changed.age_estimate = Some(&age);
        assert_ne!(compute(&changed), base);

        let other_personality = vec!["spokojny".to_string()];
        let mut changed = sample(&breeds, &personality, &photos);
        changed.personality = &other_personality;
        assert_ne!(compute(&changed), base);

        let other_photos = vec!["https://example.org/b.jpg".to_string()];
        let mut changed = sample(&breeds, &personality, &photos);
        changed.photo_urls = &other_photos;
        assert_ne!(compute(&changed), base);

        let mut changed = sample(&breeds, &personality, &photos);
        changed.urgent = true;
        assert_ne!(compute(&changed), base);
    }

    #[test]
    fn breed_order_is_significant() {
        let ab = vec![
            BreedEstimate {
                breed: "beagle".into(),
                confidence: 0.6,
            },
            BreedEstimate {
                breed: "jamnik".into(),
                confidence: 0.3,
            },
        ];
        let ba: Vec<BreedEstimate> = ab.iter().rev().cloned().collect();
        let personality: Vec<String> = Vec::new();
        let photos: Vec<String> = Vec::new();

        assert_ne!(
            compute(&sample(&ab, &personality, &photos)),
            compute(&sample(&ba, &personality, &photos))
        );
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let breeds: Vec<BreedEstimate> = Vec::new();
        let personality: Vec<String> = Vec::new();
        let photos: Vec<String> = Vec::new();
        let digest = compute(&sample(&breeds, &personality, &photos));

        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
