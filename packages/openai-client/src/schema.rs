//! JSON schema generation for OpenAI structured outputs.
//!
//! Schemas are derived from Rust types with `schemars` and then adjusted for
//! the API's strict mode, which requires `additionalProperties: false` on
//! every object, all properties listed in `required` (even nullable ones),
//! and fully inlined schemas with no `$ref` indirection.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Trait for types usable as OpenAI structured output.
///
/// Blanket-implemented for any `JsonSchema + DeserializeOwned` type.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a strict-mode-compatible JSON schema for this type.
    fn openai_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        strictify_objects(&mut value);

        let definitions = match &value {
            serde_json::Value::Object(map) => map.get("definitions").cloned(),
            _ => None,
        };
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    /// Schema name for this type (used as the response_format name).
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Add `additionalProperties: false` and a full `required` list to every
/// object schema in the tree.
fn strictify_objects(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type") == Some(&serde_json::Value::String("object".to_string())) {
                map.insert(
                    "additionalProperties".to_string(),
                    serde_json::Value::Bool(false),
                );
                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<serde_json::Value> = props
                        .keys()
                        .map(|k| serde_json::Value::String(k.clone()))
                        .collect();
                    map.insert("required".to_string(), serde_json::Value::Array(all_keys));
                }
            }
            for (_, v) in map.iter_mut() {
                strictify_objects(v);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                strictify_objects(item);
            }
        }
        _ => {}
    }
}

/// Replace every `$ref` with the referenced definition, recursively.
fn inline_refs(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(type_name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs(value, definitions);
                        return;
                    }
                }
            }
            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
