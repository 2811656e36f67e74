use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Output sizes accepted by the generation provider.
pub const SUPPORTED_OUTPUT_SIZES: &[&str] = &[
    "1024x1024",
    "768x768",
    "768x1024",
    "1024x768",
    "1024x576",
    "576x1024",
    "1536x1536",
];

pub const DEFAULT_OUTPUT_SIZE: &str = "1024x1024";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    #[default]
    Key,
    Fill,
    Back,
    Rim,
    Practical,
}

impl LightType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Fill => "fill",
            Self::Back => "back",
            Self::Rim => "rim",
            Self::Practical => "practical",
        }
    }
}

/// A single lighting unit in a rig. Value type; never mutated after
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingUnit {
    #[serde(rename = "type", default)]
    pub light_type: LightType,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default = "default_temperature")]
    pub temperature: i64,
    #[serde(default = "default_direction")]
    pub direction_deg: i64,
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default = "default_softness")]
    pub softness: f64,
}

fn default_intensity() -> f64 {
    1.0
}

fn default_temperature() -> i64 {
    5600
}

fn default_direction() -> i64 {
    45
}

fn default_distance() -> f64 {
    1.0
}

fn default_softness() -> f64 {
    0.5
}

impl Default for LightingUnit {
    fn default() -> Self {
        LightingUnit {
            light_type: LightType::Key,
            intensity: default_intensity(),
            temperature: default_temperature(),
            direction_deg: default_direction(),
            distance: default_distance(),
            softness: default_softness(),
        }
    }
}

impl LightingUnit {
    /// Natural-language rendering used when prompting the LLM.
    pub fn describe(&self) -> String {
        let temp_desc = if self.temperature < 4000 {
            "warm"
        } else if self.temperature > 6000 {
            "cool"
        } else {
            "neutral"
        };
        format!(
            "{} light at {} degrees, {:.0}% intensity, {} ({}K)",
            self.light_type.as_str(),
            self.direction_deg,
            self.intensity * 100.0,
            temp_desc,
            self.temperature
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.intensity) {
            return Err(anyhow!("intensity must be between 0.0 and 2.0"));
        }
        if !(1000..=10000).contains(&self.temperature) {
            return Err(anyhow!("temperature must be between 1000K and 10000K"));
        }
        if !(0..=360).contains(&self.direction_deg) {
            return Err(anyhow!("direction_deg must be between 0 and 360"));
        }
        if !(0.1..=10.0).contains(&self.distance) {
            return Err(anyhow!("distance must be between 0.1 and 10.0"));
        }
        if !(0.0..=1.0).contains(&self.softness) {
            return Err(anyhow!("softness must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CameraLens {
    #[serde(rename = "24mm")]
    Wide24,
    #[serde(rename = "35mm")]
    Cinema35,
    #[default]
    #[serde(rename = "50mm")]
    Normal50,
    #[serde(rename = "85mm")]
    Portrait85,
    #[serde(rename = "135mm")]
    Tele135,
}

impl CameraLens {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wide24 => "24mm",
            Self::Cinema35 => "35mm",
            Self::Normal50 => "50mm",
            Self::Portrait85 => "85mm",
            Self::Tele135 => "135mm",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "24mm" => Some(Self::Wide24),
            "35mm" => Some(Self::Cinema35),
            "50mm" => Some(Self::Normal50),
            "85mm" => Some(Self::Portrait85),
            "135mm" => Some(Self::Tele135),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    #[serde(default)]
    pub lens: CameraLens,
    #[serde(default = "default_f_stop")]
    pub f_stop: f64,
    #[serde(default = "default_focal_distance")]
    pub focal_distance: f64,
    #[serde(default = "default_angle")]
    pub angle: String,
    #[serde(default)]
    pub movement: Option<String>,
}

fn default_f_stop() -> f64 {
    2.8
}

fn default_focal_distance() -> f64 {
    5.0
}

fn default_angle() -> String {
    "eye-level".to_string()
}

impl Default for CameraParams {
    fn default() -> Self {
        CameraParams {
            lens: CameraLens::default(),
            f_stop: default_f_stop(),
            focal_distance: default_focal_distance(),
            angle: default_angle(),
            movement: None,
        }
    }
}

impl CameraParams {
    pub fn describe(&self) -> String {
        format!(
            "{} lens at f/{}, {} shot",
            self.lens.as_str(),
            self.f_stop,
            self.angle
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !(1.2..=16.0).contains(&self.f_stop) {
            return Err(anyhow!("f_stop must be between 1.2 and 16.0"));
        }
        if !(0.1..=100.0).contains(&self.focal_distance) {
            return Err(anyhow!("focal_distance must be between 0.1 and 100.0"));
        }
        Ok(())
    }
}

/// A complete scene generation request. Request-scoped: created from
/// incoming data, validated once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRequest {
    pub prompt: String,
    #[serde(default)]
    pub lighting_setup: Vec<LightingUnit>,
    #[serde(default)]
    pub camera: CameraParams,
    #[serde(default = "default_true")]
    pub hdr_enabled: bool,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default = "default_output_size")]
    pub output_size: String,
}

fn default_true() -> bool {
    true
}

fn default_style() -> String {
    "cinematic".to_string()
}

fn default_output_size() -> String {
    DEFAULT_OUTPUT_SIZE.to_string()
}

impl SceneRequest {
    pub fn validate(&self) -> Result<()> {
        let prompt_len = self.prompt.chars().count();
        if !(5..=500).contains(&prompt_len) {
            return Err(anyhow!("prompt must be between 5 and 500 characters"));
        }
        for (idx, light) in self.lighting_setup.iter().enumerate() {
            light
                .validate()
                .with_context(|| format!("lighting_setup[{idx}]"))?;
        }
        self.camera.validate()?;
        if !SUPPORTED_OUTPUT_SIZES.contains(&self.output_size.as_str()) {
            return Err(anyhow!(
                "output_size must be one of: {}",
                SUPPORTED_OUTPUT_SIZES.join(", ")
            ));
        }
        Ok(())
    }

    /// Every setup needs a key light; appends the default one when the rig
    /// has none.
    pub fn ensure_key_light(&mut self) {
        let has_key = self
            .lighting_setup
            .iter()
            .any(|light| light.light_type == LightType::Key);
        if !has_key {
            self.lighting_setup.push(LightingUnit::default());
        }
    }

    /// The key light drives mood/quality decisions; rigs are validated to
    /// contain one, but fall back to the default unit defensively.
    pub fn key_light(&self) -> LightingUnit {
        self.lighting_setup
            .iter()
            .find(|light| light.light_type == LightType::Key)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> SceneRequest {
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
    fn describes_a_warm_light() {
        let light = LightingUnit {
            light_type: LightType::Key,
            intensity: 0.8,
            temperature: 3200,
            direction_deg: 45,
            distance: 1.0,
            softness: 0.3,
        };
        assert_eq!(light.describe(), "key light at 45 degrees, 80% intensity, warm (3200K)");
    }

    #[test]
    fn describes_cool_and_neutral_temperatures() {
        let mut light = LightingUnit::default();
        light.temperature = 8000;
        assert!(light.describe().contains("cool (8000K)"));
        light.temperature = 5600;
        assert!(light.describe().contains("neutral (5600K)"));
    }

    #[test]
    fn camera_description_includes_lens_and_aperture() {
        let camera = CameraParams::default();
        assert_eq!(camera.describe(), "50mm lens at f/2.8, eye-level shot");
    }

    #[test]
    fn deserializes_lens_from_focal_length_string() {
        let camera: CameraParams = serde_json::from_str(r#"{"lens": "85mm"}"#).expect("camera");
        assert_eq!(camera.lens, CameraLens::Portrait85);
        assert_eq!(camera.f_stop, 2.8);
    }

    #[test]
    fn lighting_unit_defaults_match_the_standard_key_light() {
        let light: LightingUnit = serde_json::from_str("{}").expect("light");
        assert_eq!(light.light_type, LightType::Key);
        assert_eq!(light.intensity, 1.0);
        assert_eq!(light.temperature, 5600);
        assert_eq!(light.direction_deg, 45);
        assert_eq!(light.softness, 0.5);
    }

    #[test]
    fn rejects_prompt_that_is_too_short() {
        let mut request = valid_request();
        request.prompt = "dim".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_intensity() {
        let mut request = valid_request();
        request.lighting_setup[0].intensity = 2.5;
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("lighting_setup[0]"));
    }

    #[test]
    fn rejects_unsupported_output_size() {
        let mut request = valid_request();
        request.output_size = "640x480".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_f_stop_below_range() {
        let mut request = valid_request();
        request.camera.f_stop = 1.0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn injects_default_key_light_when_missing() {
        let mut request = valid_request();
        request.lighting_setup = vec![LightingUnit {
            light_type: LightType::Fill,
            ..LightingUnit::default()
        }];
        request.ensure_key_light();
        assert_eq!(request.lighting_setup.len(), 2);
        let injected = &request.lighting_setup[1];
        assert_eq!(injected.light_type, LightType::Key);
        assert_eq!(injected.intensity, 1.0);
        assert_eq!(injected.temperature, 5600);
        assert_eq!(injected.direction_deg, 45);
        assert_eq!(injected.softness, 0.5);
    }

    #[test]
    fn keeps_existing_key_light() {
        let mut request = valid_request();
        request.ensure_key_light();
        assert_eq!(request.lighting_setup.len(), 1);
    }
}
