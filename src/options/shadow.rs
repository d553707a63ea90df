use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed-step view-space march parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Simple", inline)]
#[serde(default)]
pub struct SimpleShadowParams {
    #[schemars(title = "Steps", range(min = 1, max = 64), extend("step" = 1))]
    pub steps: u32,
    #[schemars(title = "Max Distance", range(min = 0.0, max = 256.0), extend("step" = 1.0))]
    pub max_distance: f32,
    #[schemars(title = "Tolerance", range(min = 0.0, max = 10.0), extend("step" = 0.1))]
    pub tolerance: f32,
}

impl Default for SimpleShadowParams {
    fn default() -> Self {
        Self {
            steps: 1,
            max_distance: 3.0,
            tolerance: 1.0,
        }
    }
}

/// Bend-style screen-space contact shadow parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Advanced", inline)]
#[serde(default)]
pub struct AdvancedShadowParams {
    #[schemars(title = "Sample Count", range(min = 1, max = 256), extend("step" = 1))]
    pub sample_count: u32,
    #[schemars(title = "Hard Shadow Samples", range(min = 0, max = 32), extend("step" = 1))]
    pub hard_shadow_samples: u32,
    #[schemars(title = "Fade Out Samples", range(min = 0, max = 64), extend("step" = 1))]
    pub fade_out_samples: u32,
    #[schemars(title = "Max Pixel Distance", range(min = 1.0, max = 2048.0), extend("step" = 1.0))]
    pub max_pixel_distance: f32,
    #[schemars(
        title = "Surface Thickness",
        range(min = 0.0001, max = 0.05),
        extend("step" = 0.0001)
    )]
    pub surface_thickness: f32,
    #[schemars(title = "Bilinear Threshold", range(min = 0.0, max = 0.25), extend("step" = 0.001))]
    pub bilinear_threshold: f32,
    #[schemars(title = "Shadow Contrast", range(min = 0.5, max = 16.0), extend("step" = 0.5))]
    pub shadow_contrast: f32,
    #[schemars(title = "Ignore Edge Pixels")]
    pub ignore_edge_pixels: bool,
    #[schemars(title = "Use Precision Offset")]
    pub use_precision_offset: bool,
    #[schemars(title = "Bilinear Sampling Offset Mode")]
    pub bilinear_sampling_offset_mode: bool,
}

impl Default for AdvancedShadowParams {
    fn default() -> Self {
        Self {
            sample_count: 60,
            hard_shadow_samples: 4,
            fade_out_samples: 8,
            max_pixel_distance: 120.0,
            surface_thickness: 0.005,
            bilinear_threshold: 0.02,
            shadow_contrast: 4.0,
            ignore_edge_pixels: false,
            use_precision_offset: false,
            bilinear_sampling_offset_mode: false,
        }
    }
}

/// Shadow algorithm and its parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ShadowMode {
    /// Fixed-step view-space ray march with a depth compare.
    Simple(SimpleShadowParams),
    /// Screen-space march with lane-accumulated soft minima.
    Advanced(AdvancedShadowParams),
}

impl Default for ShadowMode {
    fn default() -> Self {
        Self::Simple(SimpleShadowParams::default())
    }
}

impl ShadowMode {
    /// Value of the `uShadowMode` uniform.
    pub fn index(&self) -> i32 {
        match self {
            Self::Simple(_) => 0,
            Self::Advanced(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[schemars(title = "Shadows", inline)]
#[serde(default)]
pub struct ShadowOptions {
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    #[schemars(title = "Mode")]
    pub mode: ShadowMode,
}
