use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Inclusive `[min, max]` interval sampled uniformly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(inline)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    /// Linear interpolation from `min` to `max`.
    pub fn lerp(self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Old Movie", inline)]
#[serde(default)]
pub struct OldMovieOptions {
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    #[schemars(title = "Vignette Power", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub vignette_power: f32,
    #[schemars(title = "Grain Intensity", range(min = 0.0, max = 2.0), extend("step" = 0.01))]
    pub grain_intensity: f32,
    #[schemars(title = "Noise Alpha", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub noise_alpha: f32,
    #[schemars(title = "Tint Color")]
    pub tint_color: [f32; 3],
    #[schemars(title = "Tint Strength", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub tint_strength: f32,
    #[schemars(title = "Jolt Offset")]
    pub jolt_offset: [f32; 2],
    #[schemars(title = "Flickering Range")]
    pub flickering_range: Range,
    #[schemars(title = "Jolt Range")]
    pub jolt_range: Range,
    /// 0 disables the scratch/dust overlay.
    #[schemars(title = "Noise Type", range(min = 0, max = 5), extend("step" = 1))]
    pub noise_type: u32,
    #[schemars(title = "FPS", range(min = 1.0, max = 60.0), extend("step" = 1.0))]
    pub fps: f32,
}

impl Default for OldMovieOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            vignette_power: 0.15,
            grain_intensity: 0.5,
            noise_alpha: 0.1,
            // sepia brown 0x8B4513
            tint_color: [0.545, 0.271, 0.075],
            tint_strength: 0.3,
            jolt_offset: [0.0, 0.0],
            flickering_range: Range { min: 5.5, max: 10.0 },
            jolt_range: Range {
                min: -0.01,
                max: 0.07,
            },
            noise_type: 1,
            fps: 16.0,
        }
    }
}
