use crate::models::scene::{LightType, LightingUnit};

/// Weighted color-temperature mix across a rig, described the way a gaffer
/// would ("3100K warm orange"). Weighting is by intensity.
pub fn mix_light_colors(lights: &[LightingUnit]) -> String {
    if lights.is_empty() {
        return "5600K neutral".to_string();
    }

    let total_intensity: f64 = lights.iter().map(|light| light.intensity).sum();
    if total_intensity == 0.0 {
        return "5600K neutral".to_string();
    }

    let avg_temp = lights
        .iter()
        .map(|light| light.temperature as f64 * light.intensity)
        .sum::<f64>()
        / total_intensity;

    let desc = if avg_temp < 3500.0 {
        "warm orange"
    } else if avg_temp < 4500.0 {
        "warm white"
    } else if avg_temp < 5500.0 {
        "neutral white"
    } else if avg_temp < 6500.0 {
        "cool white"
    } else {
        "cool blue"
    };

    format!("{}K {}", avg_temp as i64, desc)
}

/// Pre-configured cinematic lighting rigs served by `/api/presets/{name}`.
pub fn preset(name: &str) -> Option<Vec<LightingUnit>> {
    match name {
        "film_noir" => Some(film_noir()),
        "golden_hour" => Some(golden_hour()),
        "studio_portrait" => Some(studio_portrait()),
        "horror" => Some(horror()),
        "sci_fi" => Some(sci_fi()),
        _ => None,
    }
}

#[allow(dead_code)]
pub fn preset_names() -> &'static [&'static str] {
    &[
        "film_noir",
        "golden_hour",
        "studio_portrait",
        "horror",
        "sci_fi",
    ]
}

fn film_noir() -> Vec<LightingUnit> {
    vec![
        LightingUnit {
            light_type: LightType::Key,
            intensity: 0.8,
            temperature: 3200,
            direction_deg: 45,
            softness: 0.3,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Fill,
            intensity: 0.2,
            temperature: 3200,
            direction_deg: 315,
            softness: 0.7,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Back,
            intensity: 0.1,
            temperature: 2800,
            direction_deg: 180,
            softness: 0.1,
            ..LightingUnit::default()
        },
    ]
}

fn golden_hour() -> Vec<LightingUnit> {
    vec![
        LightingUnit {
            light_type: LightType::Key,
            intensity: 1.2,
            temperature: 2800,
            direction_deg: 30,
            softness: 0.6,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Fill,
            intensity: 0.4,
            temperature: 3800,
            direction_deg: 330,
            softness: 0.8,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Rim,
            intensity: 0.6,
            temperature: 2200,
            direction_deg: 150,
            softness: 0.2,
            ..LightingUnit::default()
        },
    ]
}

fn studio_portrait() -> Vec<LightingUnit> {
    vec![
        LightingUnit {
            light_type: LightType::Key,
            intensity: 1.0,
            temperature: 5600,
            direction_deg: 45,
            softness: 0.7,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Fill,
            intensity: 0.5,
            temperature: 5600,
            direction_deg: 315,
            softness: 0.9,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Rim,
            intensity: 0.8,
            temperature: 5600,
            direction_deg: 135,
            softness: 0.3,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Back,
            intensity: 0.3,
            temperature: 6000,
            direction_deg: 180,
            softness: 0.1,
            ..LightingUnit::default()
        },
    ]
}

fn horror() -> Vec<LightingUnit> {
    vec![
        LightingUnit {
            light_type: LightType::Key,
            intensity: 0.6,
            temperature: 4200,
            direction_deg: 90,
            softness: 0.2,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Practical,
            intensity: 0.3,
            temperature: 1800,
            direction_deg: 0,
            softness: 0.9,
            ..LightingUnit::default()
        },
    ]
}

fn sci_fi() -> Vec<LightingUnit> {
    vec![
        LightingUnit {
            light_type: LightType::Key,
            intensity: 0.9,
            temperature: 8000,
            direction_deg: 60,
            softness: 0.4,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Fill,
            intensity: 0.3,
            temperature: 10000,
            direction_deg: 300,
            softness: 0.6,
            ..LightingUnit::default()
        },
        LightingUnit {
            light_type: LightType::Practical,
            intensity: 0.5,
            temperature: 4000,
            direction_deg: 0,
            softness: 0.1,
            ..LightingUnit::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_preset_resolves_and_leads_with_a_key_light() {
        for name in preset_names() {
            let lights = preset(name).unwrap_or_else(|| panic!("missing preset {name}"));
            assert!(!lights.is_empty());
            assert_eq!(lights[0].light_type, LightType::Key, "preset {name}");
            for light in &lights {
                light.validate().expect("preset lights are in range");
            }
        }
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(preset("daylight_noir").is_none());
    }

    #[test]
    fn film_noir_is_a_three_point_low_key_rig() {
        let lights = preset("film_noir").expect("preset");
        assert_eq!(lights.len(), 3);
        assert_eq!(lights[0].temperature, 3200);
        assert_eq!(lights[2].light_type, LightType::Back);
    }

    #[test]
    fn color_mix_is_weighted_by_intensity() {
        let lights = vec![
            LightingUnit {
                intensity: 1.0,
                temperature: 3000,
                ..LightingUnit::default()
            },
            LightingUnit {
                light_type: LightType::Fill,
                intensity: 1.0,
                temperature: 7000,
                ..LightingUnit::default()
            },
        ];
        assert_eq!(mix_light_colors(&lights), "5000K neutral white");
    }

    #[test]
    fn color_mix_handles_empty_and_unlit_rigs() {
        assert_eq!(mix_light_colors(&[]), "5600K neutral");
        let dark = vec![LightingUnit {
            intensity: 0.0,
            ..LightingUnit::default()
        }];
        assert_eq!(mix_light_colors(&dark), "5600K neutral");
    }

    #[test]
    fn warm_rig_mixes_to_warm_orange() {
        let lights = preset("golden_hour").expect("preset");
        let profile = mix_light_colors(&lights);
        assert!(profile.contains("warm"), "got {profile}");
    }
}
