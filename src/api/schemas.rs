use serde::{Deserialize, Serialize};

use crate::models::scene::{
    CameraLens, CameraParams, LightType, LightingUnit, SceneRequest, DEFAULT_OUTPUT_SIZE,
};
use crate::prompt::{ChangeLog, StructuredPrompt};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefineRequest {
    pub previous_json: StructuredPrompt,
    pub instruction: String,
    #[serde(default = "default_true")]
    pub hdr: bool,
    #[serde(default)]
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub lighting_setup: Vec<LightingUnit>,
    pub camera: CameraParams,
    pub hdr: bool,
    pub style: String,
    pub seed: i64,
    pub size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub image_url: String,
    pub request_id: String,
    pub json_prompt: StructuredPrompt,
    pub metadata: GenerationMetadata,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineResponse {
    pub success: bool,
    pub image_url: String,
    pub refined_json: StructuredPrompt,
    pub instruction_applied: String,
    pub changes: ChangeLog,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetResponse {
    pub preset: String,
    pub lights: Vec<LightingUnit>,
    pub description: String,
    pub color_profile: String,
}

// Flat request shape kept for frontends that predate per-unit lighting
// setups.

fn default_key_intensity() -> i64 {
    100
}

fn default_key_temp() -> i64 {
    5600
}

fn default_light_angle() -> i64 {
    45
}

fn default_fill_ratio() -> f64 {
    0.5
}

fn default_back_intensity() -> i64 {
    30
}

fn default_legacy_mood() -> String {
    "dramatic".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyLightingParams {
    #[serde(default = "default_key_intensity")]
    pub key_intensity: i64,
    #[serde(default = "default_key_temp")]
    pub key_temp: i64,
    #[serde(default = "default_light_angle")]
    pub light_angle: i64,
    #[serde(default = "default_fill_ratio")]
    pub fill_ratio: f64,
    #[serde(default = "default_back_intensity")]
    pub back_intensity: i64,
    #[serde(default = "default_legacy_mood")]
    pub mood: String,
}

impl Default for LegacyLightingParams {
    fn default() -> Self {
        LegacyLightingParams {
            key_intensity: default_key_intensity(),
            key_temp: default_key_temp(),
            light_angle: default_light_angle(),
            fill_ratio: default_fill_ratio(),
            back_intensity: default_back_intensity(),
            mood: default_legacy_mood(),
        }
    }
}

fn default_legacy_lens() -> String {
    "50mm".to_string()
}

fn default_legacy_fstop() -> f64 {
    2.8
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacySceneRequest {
    pub prompt: String,
    #[serde(default)]
    pub lighting: LegacyLightingParams,
    #[serde(default = "default_legacy_lens")]
    pub camera_lens: String,
    #[serde(default = "default_legacy_fstop")]
    pub camera_fstop: f64,
    #[serde(default = "default_true")]
    pub hdr_enabled: bool,
    #[serde(default)]
    pub seed: Option<i64>,
}

impl LegacySceneRequest {
    /// Expands the flat legacy parameters into a three-point rig. The fill
    /// tracks the key at the configured ratio on the opposite side; the back
    /// light sits at 180 degrees.
    pub fn into_scene_request(self) -> SceneRequest {
        let key_intensity = (self.lighting.key_intensity as f64 / 100.0).clamp(0.0, 2.0);
        let key = LightingUnit {
            light_type: LightType::Key,
            intensity: key_intensity,
            temperature: self.lighting.key_temp,
            direction_deg: self.lighting.light_angle,
            softness: if self.lighting.mood == "dramatic" { 0.3 } else { 0.7 },
            ..LightingUnit::default()
        };
        let fill = LightingUnit {
            light_type: LightType::Fill,
            intensity: (key_intensity * self.lighting.fill_ratio).clamp(0.0, 2.0),
            temperature: self.lighting.key_temp,
            direction_deg: (self.lighting.light_angle + 270) % 360,
            softness: 0.7,
            ..LightingUnit::default()
        };
        let back = LightingUnit {
            light_type: LightType::Back,
            intensity: (self.lighting.back_intensity as f64 / 100.0).clamp(0.0, 2.0),
            temperature: self.lighting.key_temp,
            direction_deg: 180,
            softness: 0.1,
            ..LightingUnit::default()
        };

        let camera = CameraParams {
            lens: CameraLens::parse(&self.camera_lens).unwrap_or_default(),
            f_stop: self.camera_fstop,
            ..CameraParams::default()
        };

        SceneRequest {
            prompt: self.prompt,
            lighting_setup: vec![key, fill, back],
            camera,
            hdr_enabled: self.hdr_enabled,
            style: "cinematic".to_string(),
            seed: self.seed,
            output_size: DEFAULT_OUTPUT_SIZE.to_string(),
        }
    }
}
