//! Search document builder.
//!
//! Pure synthesis of the text and facet metadata indexed for a dog. The
//! text is Polish, assembled from fixed phrase templates in a fixed order
//! so that identical records always produce identical documents.

use serde::{Deserialize, Serialize};

use crate::model::{Dog, Sex, SizeCategory};

/// Facet metadata attached to an indexed document.
///
/// Keys are omitted from the wire format (not serialized as null) when the
/// source attribute is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub shelter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

/// The synthesized text + facets indexed for one dog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub text: String,
    pub metadata: SearchMetadata,
}

/// Polish plural form for a count of years.
///
/// 1 → "rok"; 12–14 → "lat" (teen forms); last digit 2–4 → "lata";
/// everything else → "lat".
pub fn year_word(years: u32) -> &'static str {
    if years == 1 {
        return "rok";
    }
    if (12..=14).contains(&(years % 100)) {
        return "lat";
    }
    match years % 10 {
        2..=4 => "lata",
        _ => "lat",
    }
}

fn size_phrase(category: SizeCategory) -> &'static str {
    match category {
        SizeCategory::Small => "Mały piesek.",
        SizeCategory::Medium => "Pies średniej wielkości.",
        SizeCategory::Large => "Duży pies.",
    }
}

fn age_phrase(months: u32) -> String {
    if months < 12 {
        format!("Szczeniak, ma {} mies.", months)
    } else {
        let years = months / 12;
        format!("Ma {} {}.", years, year_word(years))
    }
}

/// Build the search document for a canonical dog record.
///
/// Text parts, in fixed order: name, age, size, primary breed, city, sex
/// noun, personality tags, generated bio. Parts whose source attribute is
/// absent are skipped entirely.
pub fn build_document(dog: &Dog) -> SearchDocument {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("Ma na imię {}.", dog.name));

    if let Some(age) = &dog.age_estimate {
        parts.push(age_phrase(age.months));
    }

    if let Some(size) = &dog.size_estimate {
        parts.push(size_phrase(size.category).to_string());
    }

    if let Some(primary) = dog.breed_estimates.first() {
        let breed = primary.breed.replace(['-', '_'], " ");
        parts.push(format!("W typie rasy {}.", breed));
    }

    if let Some(city) = &dog.city {
        parts.push(format!("Przebywa w schronisku w mieście {}.", city));
    }

    match dog.sex {
        Sex::Male => parts.push("To piesek.".to_string()),
        Sex::Female => parts.push("To suczka.".to_string()),
        Sex::Unknown => {}
    }

    if !dog.personality.is_empty() {
        parts.push(format!("Charakter: {}.", dog.personality.join(", ")));
    }

    if let Some(bio) = &dog.bio {
        parts.push(bio.clone());
    }

    SearchDocument {
        id: dog.id.to_string(),
        text: parts.join(" "),
        metadata: SearchMetadata {
            shelter_id: dog.shelter_id.clone(),
            city: dog.city.clone(),
            size: dog.size_estimate.as_ref().map(|s| s.category.as_str().to_string()),
            age_months: dog.age_estimate.as_ref().map(|a| a.months),
            sex: match dog.sex {
                Sex::Unknown => None,
                other => Some(other.as_str().to_string()),
            },
        },
    }
}
