//! Settings of every post-process pass with TOML preset support.
//!
//! Each pass reads its own group. Groups serialize to/from TOML for presets
//! stored in `assets/presets/`.

mod old_movie;
pub mod postprocessing;
mod shadow;
mod ssgi;

use std::path::Path;

pub use old_movie::{OldMovieOptions, Range};
pub use postprocessing::{ParamValue, PostprocessingProps, EFFECT_TOGGLES};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use shadow::{
    AdvancedShadowParams, ShadowMode, ShadowOptions, SimpleShadowParams,
};
pub use ssgi::SsgiOptions;

use crate::error::UmbraError;

/// Top-level options container. All groups use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[ssgi]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Screen-space shadows.
    pub shadow: ShadowOptions,
    /// Screen-space indirect lighting.
    pub ssgi: SsgiOptions,
    /// Occlusion, outline and hash transparency props.
    pub postprocessing: PostprocessingProps,
    /// Film look.
    pub old_movie: OldMovieOptions,
}

impl Options {
    /// Generate JSON Schema describing every option group.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Io`] if the file cannot be read and
    /// [`UmbraError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, UmbraError> {
        let content = std::fs::read_to_string(path).map_err(UmbraError::Io)?;
        let options = toml::from_str(&content)
            .map_err(|e| UmbraError::OptionsParse(e.to_string()))?;
        log::info!("loaded options from {}", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::OptionsParse`] if serialization fails and
    /// [`UmbraError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), UmbraError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| UmbraError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(UmbraError::Io)?;
        }
        std::fs::write(path, content).map_err(UmbraError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presets_dir() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/presets")
    }

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[ssgi]
enabled = true
samples = 8

[postprocessing]
outlineEnable = true
";
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert!(opts.ssgi.enabled);
        assert_eq!(opts.ssgi.samples, 8);
        // Everything else should be default
        assert_eq!(opts.ssgi.noise_amount, 100.0);
        assert!(opts.postprocessing.flag("outlineEnable"));
        assert!(!opts.postprocessing.flag("ssaoEnable"));
        assert_eq!(opts.shadow, ShadowOptions::default());
        assert_eq!(opts.old_movie, OldMovieOptions::default());
    }

    #[test]
    fn unknown_postprocessing_param_is_rejected() {
        let toml_str = r"
[postprocessing]
bloomEnable = true
";
        assert!(toml::from_str::<Options>(toml_str).is_err());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("umbra-options-{}", std::process::id()))
            .join("film.toml");
        let mut opts = Options::default();
        opts.old_movie.enabled = true;
        opts.shadow.enabled = true;
        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn load_reports_parse_errors() {
        let path = std::env::temp_dir()
            .join(format!("umbra-bad-options-{}.toml", std::process::id()));
        std::fs::write(&path, "[ssgi]\nsamples = \"many\"\n").unwrap();
        assert!(matches!(
            Options::load(&path),
            Err(UmbraError::OptionsParse(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bundled_presets_load() {
        let names = Options::list_presets(&presets_dir());
        assert!(names.contains(&"default".to_owned()));
        assert!(names.contains(&"film".to_owned()));
        for name in names {
            let path = presets_dir().join(format!("{name}.toml"));
            let _ = Options::load(&path).unwrap();
        }
        let film = Options::load(&presets_dir().join("film.toml")).unwrap();
        assert!(film.old_movie.enabled);
        assert!(film.postprocessing.enabled());
    }

    #[test]
    fn schema_has_every_group() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        for group in ["shadow", "ssgi", "postprocessing", "old_movie"] {
            assert!(props.contains_key(group), "missing {group}");
        }
    }
}
