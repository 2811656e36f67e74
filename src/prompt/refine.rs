//! Natural-language refinement of structured prompts.
//!
//! Two tiers: an LLM fast path when a Gemini credential is configured, and
//! the deterministic rule pass as the always-available fallback. Failures in
//! the LLM tier never surface; they fall through silently.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::gemini;
use crate::prompt::{rules, ChangeLog, StructuredPrompt};

/// Applies `instruction` to `previous`, returning the updated prompt and a
/// changelog with at least one entry. `previous` is never mutated.
pub async fn refine(previous: &StructuredPrompt, instruction: &str) -> (StructuredPrompt, ChangeLog) {
    if gemini::is_configured() {
        match refine_with_llm(previous, instruction).await {
            Ok(outcome) => return outcome,
            Err(err) => {
                warn!("LLM refinement failed, falling back to rule pass: {err}");
            }
        }
    }

    rules::apply(previous, instruction)
}

fn build_refine_prompt(previous: &StructuredPrompt, instruction: &str) -> String {
    let serialized = serde_json::to_string_pretty(&Value::Object(previous.clone()))
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"You are a cinematography expert modifying a FIBO AI generation prompt.

CURRENT JSON PROMPT:
{serialized}

INSTRUCTION: "{instruction}"

Modify ONLY the parts of the JSON that need to change based on the instruction.
Keep everything else exactly the same.

Return TWO JSON objects in this exact format:

{{
    "refined_json": {{...complete modified JSON...}},
    "changes": {{"lighting": "made darker", "mood": "more dramatic"}}
}}

The "changes" object should briefly describe what you changed."#
    )
}

async fn refine_with_llm(
    previous: &StructuredPrompt,
    instruction: &str,
) -> Result<(StructuredPrompt, ChangeLog)> {
    let prompt = build_refine_prompt(previous, instruction);
    let reply = gemini::complete(&prompt, "refine_json").await?;

    let payload =
        extract_json_object(&reply).ok_or_else(|| anyhow!("no JSON object in LLM reply"))?;
    let envelope: Value = serde_json::from_str(&payload)?;

    let refined = envelope
        .get("refined_json")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| anyhow!("refined_json missing or not an object"))?;

    let mut changes = envelope
        .get("changes")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if changes.is_empty() {
        changes.insert(
            "general".to_string(),
            json!(format!("applied instruction: {instruction}")),
        );
    }

    Ok((refined, changes))
}

/// Pulls the JSON object out of an LLM reply: prefer a ```json fence, else
/// take everything between the first `{` and the last `}`.
fn extract_json_object(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(fenced) = trimmed.split("```json").nth(1) {
        return fenced
            .split("```")
            .next()
            .map(|inner| inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(trimmed[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_a_json_fence() {
        let reply = "Here you go:\n```json\n{\"refined_json\": {}}\n```\nDone.";
        assert_eq!(
            extract_json_object(reply).as_deref(),
            Some("{\"refined_json\": {}}")
        );
    }

    #[test]
    fn extracts_by_brace_bounds_without_a_fence() {
        let reply = "Sure! {\"refined_json\": {\"a\": 1}} hope that helps";
        assert_eq!(
            extract_json_object(reply).as_deref(),
            Some("{\"refined_json\": {\"a\": 1}}")
        );
    }

    #[test]
    fn yields_none_when_no_object_is_present() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("} backwards {").is_none());
    }

    #[tokio::test]
    async fn falls_back_to_rules_and_never_mutates_input() {
        // No Gemini credential in the test environment, so this exercises
        // the rule tier through the public entry point.
        let previous = match serde_json::json!({
            "subject": "a detective in an office",
            "lighting": {"intensity": 1.0, "temperature": 5600}
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let snapshot = previous.clone();

        let (refined, changes) = refine(&previous, "make it darker and more noir").await;
        assert_eq!(previous, snapshot);
        assert_eq!(refined["lighting"]["intensity"], serde_json::json!(0.7));
        assert_eq!(refined["lighting"]["mood"], serde_json::json!("dramatic"));
        assert!(changes.contains_key("lighting"));
        assert!(changes.contains_key("mood"));
        assert_ne!(
            Value::Object(refined),
            Value::Object(previous),
            "refinement must produce a modified copy"
        );
    }

    #[tokio::test]
    async fn guarantees_a_changelog_entry_for_any_instruction() {
        let previous = StructuredPrompt::new();
        let (_, changes) = refine(&previous, "add a dog").await;
        assert_eq!(changes.len(), 1);
        assert!(changes.contains_key("general"));
    }
}
