pub mod refine;
pub mod rules;
pub mod synthesizer;

pub use refine::refine;
pub use synthesizer::{enhance_for_hdr, synthesize};

use serde_json::{Map, Value};

/// The structured JSON prompt handed to the image-generation provider.
/// Deliberately open-ended: the LLM path produces unconstrained shapes and
/// refinement instructions may touch arbitrary keys, so everything here
/// works on a generic key-value tree rather than a fixed record.
pub type StructuredPrompt = Map<String, Value>;

/// Category label ("lighting", "color", ...) to a human-readable description
/// of what a refinement changed.
pub type ChangeLog = Map<String, Value>;

/// Returns the nested object stored under `key`, creating it when absent.
/// A slot holding a non-object value is replaced with a fresh object, since
/// the tree shape is caller-supplied and untrusted.
pub(crate) fn nested_object<'a>(doc: &'a mut StructuredPrompt, key: &str) -> &'a mut StructuredPrompt {
    let slot = doc
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn creates_missing_nested_objects() {
        let mut doc = StructuredPrompt::new();
        nested_object(&mut doc, "lighting").insert("mood".to_string(), json!("dramatic"));
        assert_eq!(doc["lighting"]["mood"], json!("dramatic"));
    }

    #[test]
    fn replaces_non_object_slots() {
        let mut doc = StructuredPrompt::new();
        doc.insert("lighting".to_string(), json!("moody"));
        nested_object(&mut doc, "lighting").insert("intensity".to_string(), json!(0.7));
        assert_eq!(doc["lighting"], json!({"intensity": 0.7}));
    }

    #[test]
    fn preserves_existing_nested_content() {
        let mut doc = StructuredPrompt::new();
        doc.insert("camera".to_string(), json!({"lens": "50mm"}));
        nested_object(&mut doc, "camera").insert("aperture".to_string(), json!(2.8));
        assert_eq!(doc["camera"], json!({"lens": "50mm", "aperture": 2.8}));
    }
}
