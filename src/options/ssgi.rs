use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Indirect Light", inline)]
#[serde(default)]
pub struct SsgiOptions {
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    #[schemars(title = "Samples", range(min = 1, max = 128), extend("step" = 1))]
    pub samples: u32,
    #[schemars(title = "Indirect Amount", range(min = 0.0, max = 3.0), extend("step" = 0.001))]
    pub indirect_amount: f32,
    #[schemars(title = "Noise Amount", range(min = 0.0, max = 256.0), extend("step" = 1.0))]
    pub noise_amount: f32,
    #[schemars(title = "Noise")]
    pub noise: bool,
    #[schemars(title = "Scale", range(min = 0.0, max = 2560.0), extend("step" = 0.01))]
    pub scale: f32,
    #[schemars(title = "Light Distance", range(min = 0.0, max = 25600.0), extend("step" = 1.0))]
    pub light_distance: f32,
    #[schemars(title = "Background")]
    pub background: bool,
    #[schemars(title = "Global Light")]
    pub global_light: bool,
}

impl Default for SsgiOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            samples: 20,
            indirect_amount: 0.007,
            noise_amount: 100.0,
            noise: true,
            scale: 1.0,
            light_distance: 0.0,
            background: true,
            global_light: false,
        }
    }
}
