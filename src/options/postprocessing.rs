//! Table-driven postprocessing props.
//!
//! Unlike the other option groups this is a map keyed by the logical
//! parameter names of [`PARAMS_MAPPING`], so adding a row to the table adds
//! the option, its JSON schema entry and its shader slot together.

use std::borrow::Cow;
use std::collections::BTreeMap;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

use crate::error::UmbraError;
use crate::renderer::postprocess::params_mapping::{
    find_param, param_definitions, ParamKind, PARAMS_MAPPING,
};

/// A postprocessing parameter value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    /// Toggle.
    Bool(bool),
    /// Numeric value; integer-valued for number defines.
    Number(f64),
}

impl ParamValue {
    /// Boolean payload, if any.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            Self::Number(_) => None,
        }
    }

    /// Numeric payload, if any.
    pub fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n),
            Self::Bool(_) => None,
        }
    }
}

/// Logical names of the four effect toggles.
pub const EFFECT_TOGGLES: [&str; 4] = [
    "occlusionEnable",
    "outlineEnable",
    "ssaoEnable",
    "hashEnable",
];

/// Full postprocessing prop set, one entry per [`PARAMS_MAPPING`] row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, ParamValue>",
    into = "BTreeMap<String, ParamValue>"
)]
pub struct PostprocessingProps {
    values: BTreeMap<String, ParamValue>,
}

impl Default for PostprocessingProps {
    fn default() -> Self {
        Self {
            values: PARAMS_MAPPING
                .iter()
                .map(|row| (row.name.to_owned(), row.default))
                .collect(),
        }
    }
}

/// Check that `name` is a declared parameter and `value` has its kind.
///
/// # Errors
///
/// Returns [`UmbraError::UnknownParam`] or [`UmbraError::ParamType`].
pub fn validate_param(name: &str, value: ParamValue) -> Result<(), UmbraError> {
    let row = find_param(name)
        .ok_or_else(|| UmbraError::UnknownParam(name.to_owned()))?;
    let matches = match row.kind {
        ParamKind::Boolean => value.as_bool().is_some(),
        ParamKind::F | ParamKind::Number => value.as_number().is_some(),
    };
    if matches {
        Ok(())
    } else {
        Err(UmbraError::ParamType {
            param: name.to_owned(),
            expected: row.kind.name(),
        })
    }
}

impl PostprocessingProps {
    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    /// Boolean value of `name`; `false` if absent or numeric.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(ParamValue::as_bool).unwrap_or(false)
    }

    /// Numeric value of `name`, if set.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_number)
    }

    /// Set one parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not declared or `value` has the wrong
    /// kind; the props are left unchanged.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), UmbraError> {
        validate_param(name, value)?;
        let _ = self.values.insert(name.to_owned(), value);
        Ok(())
    }

    /// Builder-style [`PostprocessingProps::set`].
    ///
    /// # Errors
    ///
    /// See [`PostprocessingProps::set`].
    pub fn with(mut self, name: &str, value: ParamValue) -> Result<Self, UmbraError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Whether any effect toggle is on. Derived on every call.
    pub fn enabled(&self) -> bool {
        EFFECT_TOGGLES.iter().any(|name| self.flag(name))
    }

    /// All entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl TryFrom<BTreeMap<String, ParamValue>> for PostprocessingProps {
    type Error = UmbraError;

    /// Overlay a (possibly partial) map onto the defaults.
    fn try_from(map: BTreeMap<String, ParamValue>) -> Result<Self, UmbraError> {
        let mut props = Self::default();
        for (name, value) in map {
            props.set(&name, value)?;
        }
        Ok(props)
    }
}

impl From<PostprocessingProps> for BTreeMap<String, ParamValue> {
    fn from(props: PostprocessingProps) -> Self {
        props.values
    }
}

impl JsonSchema for PostprocessingProps {
    fn schema_name() -> Cow<'static, str> {
        "PostprocessingProps".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        param_definitions().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_row() {
        let props = PostprocessingProps::default();
        assert_eq!(props.iter().count(), PARAMS_MAPPING.len());
        assert_eq!(props.number("ssao_aoCap"), Some(1.2));
        assert_eq!(props.number("occlusionKernelSize"), Some(4.0));
        assert!(!props.enabled());
    }

    #[test]
    fn enabled_follows_any_toggle() {
        for toggle in EFFECT_TOGGLES {
            let props = PostprocessingProps::default()
                .with(toggle, ParamValue::Bool(true))
                .unwrap();
            assert!(props.enabled(), "{toggle} should enable the pass");
        }
    }

    #[test]
    fn set_rejects_unknown_names_and_kinds() {
        let mut props = PostprocessingProps::default();
        assert!(matches!(
            props.set("bogus", ParamValue::Bool(true)),
            Err(UmbraError::UnknownParam(_))
        ));
        assert!(matches!(
            props.set("outlineEnable", ParamValue::Number(1.0)),
            Err(UmbraError::ParamType { .. })
        ));
        assert_eq!(props, PostprocessingProps::default());
    }

    #[test]
    fn partial_toml_overlays_defaults() {
        let props: PostprocessingProps =
            toml::from_str("outlineEnable = true\nssao_samples = 8\n").unwrap();
        assert!(props.flag("outlineEnable"));
        assert_eq!(props.number("ssao_samples"), Some(8.0));
        assert_eq!(props.number("outlineThreshold"), Some(0.8));
    }

    #[test]
    fn unknown_toml_key_is_an_error() {
        let result: Result<PostprocessingProps, _> = toml::from_str("glow = 1.0\n");
        assert!(result.is_err());
    }
}
