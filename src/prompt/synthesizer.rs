//! Scene-request to structured-prompt synthesis.
//!
//! Primary path asks Gemini to author the prompt against a fixed key schema;
//! any failure there falls through to a deterministic generator derived
//! directly from the request fields, so synthesis as a whole is total.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::gemini;
use crate::models::scene::SceneRequest;
use crate::prompt::{nested_object, StructuredPrompt};

/// Builds the provider prompt for a validated scene request.
pub async fn synthesize(request: &SceneRequest) -> StructuredPrompt {
    if gemini::is_configured() {
        match synthesize_with_llm(request).await {
            Ok(prompt) => return prompt,
            Err(err) => {
                warn!("LLM prompt synthesis failed, using fallback generator: {err}");
            }
        }
    }

    fallback_prompt(request)
}

fn build_scene_prompt(request: &SceneRequest) -> String {
    let lighting_desc = request
        .lighting_setup
        .iter()
        .map(|light| format!("- {}", light.describe()))
        .collect::<Vec<_>>()
        .join("\n");

    let hdr_note = if request.hdr_enabled {
        "Yes, 16-bit color, high dynamic range"
    } else {
        "No"
    };

    format!(
        r#"You are a professional cinematographer and AI prompt engineer.
Create a structured JSON for FIBO image generation with these exact parameters:

SCENE: {prompt}
STYLE: {style}

LIGHTING SETUP:
{lighting_desc}

CAMERA: {camera}
HDR: {hdr_note}

Create a JSON with these exact keys:
{{
    "subject": "detailed subject description",
    "environment": "detailed environment description",
    "lighting": {{
        "setup": "description of lighting setup",
        "mood": "lighting mood",
        "quality": "hard/soft",
        "contrast": "high/medium/low"
    }},
    "camera": {{
        "lens": "lens description",
        "aperture": "f-stop value",
        "shot_type": "type of shot",
        "composition": "composition notes"
    }},
    "style_attributes": {{
        "dynamic_range": "hdr" or "standard",
        "color_palette": ["primary", "secondary", "accent colors"],
        "texture": "description of textures"
    }},
    "technical": {{
        "render_quality": "high",
        "detail_level": "ultra detailed"
    }}
}}

Return ONLY the JSON object, no other text."#,
        prompt = request.prompt,
        style = request.style,
        camera = request.camera.describe(),
    )
}

async fn synthesize_with_llm(request: &SceneRequest) -> Result<StructuredPrompt> {
    let prompt = build_scene_prompt(request);
    let reply = gemini::complete(&prompt, "create_structured_prompt").await?;

    let cleaned = reply.trim().replace("```json", "").replace("```", "");
    let value: Value = serde_json::from_str(cleaned.trim())?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("expected a JSON object, got {other}")),
    }
}

/// Deterministic generator: derives the full prompt schema from the request
/// fields alone. Total over any validated request.
fn fallback_prompt(request: &SceneRequest) -> StructuredPrompt {
    let key_light = request.key_light();

    let subject = request
        .prompt
        .split(',')
        .next()
        .unwrap_or(request.prompt.as_str());

    let value = json!({
        "subject": subject,
        "environment": "professional cinematic scene",
        "lighting": {
            "setup": format!("{}-point lighting", request.lighting_setup.len()),
            "mood": if key_light.intensity > 1.0 { "dramatic" } else { "subtle" },
            "quality": if key_light.softness < 0.3 { "hard" } else { "soft" },
            "contrast": if request.lighting_setup.len() < 2 { "high" } else { "medium" },
            "color_temperature": format!("{}K", key_light.temperature),
            "direction": format!("{} degrees", key_light.direction_deg),
        },
        "camera": {
            "lens": request.camera.lens.as_str(),
            "aperture": request.camera.f_stop,
            "shot_type": request.camera.angle,
            "composition": "rule of thirds, cinematic framing",
        },
        "style_attributes": {
            "dynamic_range": if request.hdr_enabled { "hdr" } else { "standard" },
            "color_palette": ["dark", "contrasted", "cinematic"],
            "texture": "film grain, realistic textures",
            "color_grade": "cinematic",
        },
        "technical": {
            "render_quality": "high",
            "detail_level": "ultra detailed",
            "format": if request.hdr_enabled { "16-bit" } else { "8-bit" },
        },
    });

    match value {
        Value::Object(map) => map,
        _ => unreachable!("json! object literal"),
    }
}

/// Overwrites the HDR rendering attributes into style_attributes. Always
/// sets these exact values, regardless of prior content; applying it twice
/// is the same as applying it once.
pub fn enhance_for_hdr(prompt: &mut StructuredPrompt) {
    let style = nested_object(prompt, "style_attributes");
    style.insert("dynamic_range".to_string(), json!("hdr"));
    style.insert("color_depth".to_string(), json!("16-bit"));
    style.insert("highlight_recovery".to_string(), json!(0.8));
    style.insert("shadow_detail".to_string(), json!(0.3));
    style.insert("tonemapping".to_string(), json!("aces"));
    style.insert("max_nits".to_string(), json!(1000));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scene::{CameraParams, LightType, LightingUnit};

    fn request() -> SceneRequest {
        SceneRequest {
            prompt: "a detective in a dim office, rain on the window".to_string(),
            lighting_setup: vec![LightingUnit::default()],
            camera: CameraParams::default(),
            hdr_enabled: true,
            style: "cinematic".to_string(),
            seed: None,
            output_size: "1024x1024".to_string(),
        }
    }

    #[test]
    fn fallback_emits_exactly_the_six_top_level_keys() {
        let prompt = fallback_prompt(&request());
        let mut keys: Vec<&str> = prompt.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "camera",
                "environment",
                "lighting",
                "style_attributes",
                "subject",
                "technical"
            ]
        );

        for sub_key in ["setup", "mood", "quality", "contrast"] {
            assert!(prompt["lighting"].get(sub_key).is_some(), "lighting.{sub_key}");
        }
        for sub_key in ["lens", "aperture", "shot_type", "composition"] {
            assert!(prompt["camera"].get(sub_key).is_some(), "camera.{sub_key}");
        }
        for sub_key in ["dynamic_range", "color_palette", "texture"] {
            assert!(
                prompt["style_attributes"].get(sub_key).is_some(),
                "style_attributes.{sub_key}"
            );
        }
        for sub_key in ["render_quality", "detail_level"] {
            assert!(prompt["technical"].get(sub_key).is_some(), "technical.{sub_key}");
        }
    }

    #[test]
    fn subject_is_the_text_before_the_first_comma() {
        let prompt = fallback_prompt(&request());
        assert_eq!(prompt["subject"], json!("a detective in a dim office"));

        let mut no_comma = request();
        no_comma.prompt = "a lone lighthouse".to_string();
        let prompt = fallback_prompt(&no_comma);
        assert_eq!(prompt["subject"], json!("a lone lighthouse"));
    }

    #[test]
    fn mood_and_quality_follow_the_key_light() {
        let mut hot_key = request();
        hot_key.lighting_setup = vec![LightingUnit {
            intensity: 1.5,
            softness: 0.1,
            ..LightingUnit::default()
        }];
        let prompt = fallback_prompt(&hot_key);
        assert_eq!(prompt["lighting"]["mood"], json!("dramatic"));
        assert_eq!(prompt["lighting"]["quality"], json!("hard"));

        let prompt = fallback_prompt(&request());
        assert_eq!(prompt["lighting"]["mood"], json!("subtle"));
        assert_eq!(prompt["lighting"]["quality"], json!("soft"));
    }

    #[test]
    fn contrast_depends_on_rig_size() {
        let prompt = fallback_prompt(&request());
        assert_eq!(prompt["lighting"]["contrast"], json!("high"));

        let mut two_point = request();
        two_point.lighting_setup.push(LightingUnit {
            light_type: LightType::Fill,
            ..LightingUnit::default()
        });
        let prompt = fallback_prompt(&two_point);
        assert_eq!(prompt["lighting"]["contrast"], json!("medium"));
        assert_eq!(prompt["lighting"]["setup"], json!("2-point lighting"));
    }

    #[test]
    fn hdr_flag_drives_dynamic_range_and_format() {
        let prompt = fallback_prompt(&request());
        assert_eq!(prompt["style_attributes"]["dynamic_range"], json!("hdr"));
        assert_eq!(prompt["technical"]["format"], json!("16-bit"));

        let mut sdr = request();
        sdr.hdr_enabled = false;
        let prompt = fallback_prompt(&sdr);
        assert_eq!(prompt["style_attributes"]["dynamic_range"], json!("standard"));
        assert_eq!(prompt["technical"]["format"], json!("8-bit"));
    }

    #[test]
    fn hdr_enhancement_overwrites_and_is_idempotent() {
        let mut prompt = fallback_prompt(&request());
        nested_object(&mut prompt, "style_attributes")
            .insert("dynamic_range".to_string(), json!("standard"));

        enhance_for_hdr(&mut prompt);
        let once = prompt.clone();
        assert_eq!(once["style_attributes"]["dynamic_range"], json!("hdr"));
        assert_eq!(once["style_attributes"]["color_depth"], json!("16-bit"));
        assert_eq!(once["style_attributes"]["highlight_recovery"], json!(0.8));
        assert_eq!(once["style_attributes"]["shadow_detail"], json!(0.3));
        assert_eq!(once["style_attributes"]["tonemapping"], json!("aces"));
        assert_eq!(once["style_attributes"]["max_nits"], json!(1000));

        enhance_for_hdr(&mut prompt);
        assert_eq!(prompt, once);
    }

    #[test]
    fn hdr_enhancement_replaces_a_non_object_style_slot() {
        let mut prompt = StructuredPrompt::new();
        prompt.insert("style_attributes".to_string(), json!("gritty"));
        enhance_for_hdr(&mut prompt);
        assert_eq!(prompt["style_attributes"]["tonemapping"], json!("aces"));
    }

    #[test]
    fn scene_prompt_embeds_lighting_and_camera_descriptions() {
        let text = build_scene_prompt(&request());
        assert!(text.contains("- key light at 45 degrees, 100% intensity, neutral (5600K)"));
        assert!(text.contains("CAMERA: 50mm lens at f/2.8, eye-level shot"));
        assert!(text.contains("HDR: Yes, 16-bit color, high dynamic range"));
        assert!(text.contains("\"subject\""));
    }
}
