//! Deterministic instruction-to-JSON-patch rules.
//!
//! Each rule is an independent (keyword set, mutation, changelog category)
//! record. Every rule whose keywords appear in the lowercased instruction
//! fires; rules sharing a category overwrite each other's changelog entry
//! while both mutations still apply.

use serde_json::{json, Value};

use crate::prompt::{nested_object, ChangeLog, StructuredPrompt};

struct Rule {
    keywords: &'static [&'static str],
    category: &'static str,
    summary: &'static str,
    apply: fn(&mut StructuredPrompt),
}

const RULES: &[Rule] = &[
    Rule {
        keywords: &["darker", "dim", "low light"],
        category: "lighting",
        summary: "reduced intensity by 30%",
        apply: |doc| scale_intensity(doc, 0.7),
    },
    Rule {
        keywords: &["brighter", "more light", "increase light"],
        category: "lighting",
        summary: "increased intensity by 30%",
        apply: |doc| scale_intensity(doc, 1.3),
    },
    Rule {
        keywords: &["warmer", "orange", "golden"],
        category: "color",
        summary: "made warmer (lower color temperature)",
        apply: |doc| shift_temperature(doc, -1500.0),
    },
    Rule {
        keywords: &["cooler", "blue", "colder"],
        category: "color",
        summary: "made cooler (higher color temperature)",
        apply: |doc| shift_temperature(doc, 1500.0),
    },
    Rule {
        keywords: &["night", "evening"],
        category: "time",
        summary: "changed to night",
        apply: to_night,
    },
    Rule {
        keywords: &["day", "daytime", "sunny"],
        category: "time",
        summary: "changed to daytime",
        apply: to_daytime,
    },
    Rule {
        keywords: &["rain"],
        category: "weather",
        summary: "added rain",
        apply: |doc| add_weather(doc, "rain"),
    },
    Rule {
        keywords: &["fog", "misty", "hazy"],
        category: "weather",
        summary: "added fog/mist",
        apply: |doc| add_weather(doc, "fog"),
    },
    Rule {
        keywords: &["wide angle", "wide shot", "establishing"],
        category: "camera",
        summary: "changed to wide angle lens",
        apply: |doc| set_lens(doc, "24mm"),
    },
    Rule {
        keywords: &["close up", "tight shot", "portrait"],
        category: "camera",
        summary: "changed to portrait lens",
        apply: |doc| set_lens(doc, "85mm"),
    },
    Rule {
        keywords: &["moody", "dramatic", "noir"],
        category: "mood",
        summary: "made more dramatic/moody",
        apply: |doc| set_mood(doc, "dramatic"),
    },
    Rule {
        keywords: &["happy", "bright", "cheerful"],
        category: "mood",
        summary: "made brighter/cheerful",
        apply: |doc| set_mood(doc, "bright"),
    },
];

/// Runs the rule table over a deep copy of `previous`. Total over any JSON
/// object: the result is always a complete prompt and the changelog always
/// has at least one entry.
pub fn apply(previous: &StructuredPrompt, instruction: &str) -> (StructuredPrompt, ChangeLog) {
    let lowered = instruction.to_lowercase();
    let mut refined = previous.clone();
    let mut changes = ChangeLog::new();

    for rule in RULES {
        if rule.keywords.iter().any(|keyword| lowered.contains(keyword)) {
            (rule.apply)(&mut refined);
            changes.insert(
                rule.category.to_string(),
                Value::String(rule.summary.to_string()),
            );
        }
    }

    if changes.is_empty() {
        changes.insert(
            "general".to_string(),
            Value::String("applied creative adjustment based on instruction".to_string()),
        );
    }

    (refined, changes)
}

fn scale_intensity(doc: &mut StructuredPrompt, factor: f64) {
    let lighting = nested_object(doc, "lighting");
    let current = lighting
        .get("intensity")
        .and_then(|value| value.as_f64())
        .unwrap_or(1.0);
    let next = (current * factor).clamp(0.1, 2.0);
    lighting.insert("intensity".to_string(), json!(next));
}

fn shift_temperature(doc: &mut StructuredPrompt, delta: f64) {
    let lighting = nested_object(doc, "lighting");
    let current = lighting
        .get("temperature")
        .and_then(|value| value.as_f64())
        .unwrap_or(5600.0);
    let next = (current + delta).clamp(1000.0, 10000.0);
    lighting.insert("temperature".to_string(), json!(next as i64));
}

/// Prefixes the environment description. Time-of-day rules only touch an
/// environment that already exists; weather rules create an empty one first.
fn prefix_environment(doc: &mut StructuredPrompt, prefix: &str, create_if_absent: bool) {
    let existing = match doc.get("environment") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None if create_if_absent => String::new(),
        None => return,
    };
    doc.insert(
        "environment".to_string(),
        Value::String(format!("{prefix}{existing}")),
    );
}

fn to_night(doc: &mut StructuredPrompt) {
    prefix_environment(doc, "night time, ", false);

    let lighting = nested_object(doc, "lighting");
    lighting.insert("time_of_day".to_string(), json!("night"));
    lighting.insert("moonlight".to_string(), json!(true));
    lighting.insert("intensity".to_string(), json!(0.5));

    let palette = doc
        .entry("color_palette".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !palette.is_array() {
        *palette = Value::Array(Vec::new());
    }
    if let Value::Array(colors) = palette {
        for color in ["dark blue", "deep shadows", "moonlit"] {
            colors.push(json!(color));
        }
    }
}

fn to_daytime(doc: &mut StructuredPrompt) {
    prefix_environment(doc, "daytime, sunny, ", false);

    let lighting = nested_object(doc, "lighting");
    lighting.insert("time_of_day".to_string(), json!("day"));
    lighting.insert("sunlight".to_string(), json!(true));
    lighting.insert("intensity".to_string(), json!(1.2));
}

fn add_weather(doc: &mut StructuredPrompt, weather: &str) {
    // The prefix glues "y, " onto the weather name, so fog renders as
    // "fogy, ". Kept as-is for output compatibility.
    prefix_environment(doc, &format!("{weather}y, "), true);
    let atmosphere = nested_object(doc, "atmosphere");
    atmosphere.insert("weather".to_string(), json!(weather));
}

fn set_lens(doc: &mut StructuredPrompt, lens: &str) {
    let camera = nested_object(doc, "camera");
    camera.insert("lens".to_string(), json!(lens));
}

fn set_mood(doc: &mut StructuredPrompt, mood: &str) {
    let lighting = nested_object(doc, "lighting");
    lighting.insert("mood".to_string(), json!(mood));
    match mood {
        "dramatic" => {
            lighting.insert("contrast".to_string(), json!("high"));
            lighting.insert("shadows".to_string(), json!("deep"));
        }
        "bright" => {
            lighting.insert("contrast".to_string(), json!("medium"));
            lighting.insert("shadows".to_string(), json!("soft"));
        }
        _ => {}
    }
}
