//! Declarative parameter table of the postprocessing pass.
//!
//! Each row binds a logical parameter to a shader slot. The table is read
//! once to build both the GPU schema ([`postprocessing_schema`]) and the
//! parameter definitions ([`param_definitions`]).

use std::sync::LazyLock;

use schemars::Schema;
use serde_json::{json, Map, Value as Json};

use crate::gpu::schema::{
    DefineType, RenderableSchema, SlotKind, TextureFilter, UniformType, Value,
};
use crate::options::ParamValue;

/// Where a parameter lives in the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStorage {
    /// Compile-time define; changing it recompiles the program.
    Define,
    /// Runtime uniform.
    Uniform,
}

/// Value tag of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Toggle.
    Boolean,
    /// Float uniform.
    F,
    /// Integer-valued number, used for loop-count defines.
    Number,
}

impl ParamKind {
    /// Human-readable kind for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::F | Self::Number => "number",
        }
    }
}

/// Numeric range of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    /// Minimum.
    pub min: f64,
    /// Maximum.
    pub max: f64,
    /// UI step.
    pub step: f64,
}

/// One row of the parameter table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamMapping {
    /// Logical parameter name (props key).
    pub name: &'static str,
    /// Shader slot name.
    pub slot: &'static str,
    /// Default value.
    pub default: ParamValue,
    /// Numeric range, for numeric parameters.
    pub range: Option<ParamRange>,
    /// Define or uniform.
    pub storage: ParamStorage,
    /// Value tag.
    pub kind: ParamKind,
}

const fn toggle(name: &'static str, slot: &'static str) -> ParamMapping {
    ParamMapping {
        name,
        slot,
        default: ParamValue::Bool(false),
        range: None,
        storage: ParamStorage::Define,
        kind: ParamKind::Boolean,
    }
}

const fn float(
    name: &'static str,
    slot: &'static str,
    default: f64,
    min: f64,
    max: f64,
    step: f64,
) -> ParamMapping {
    ParamMapping {
        name,
        slot,
        default: ParamValue::Number(default),
        range: Some(ParamRange { min, max, step }),
        storage: ParamStorage::Uniform,
        kind: ParamKind::F,
    }
}

const fn count(
    name: &'static str,
    slot: &'static str,
    default: f64,
    min: f64,
    max: f64,
) -> ParamMapping {
    ParamMapping {
        name,
        slot,
        default: ParamValue::Number(default),
        range: Some(ParamRange {
            min,
            max,
            step: 1.0,
        }),
        storage: ParamStorage::Define,
        kind: ParamKind::Number,
    }
}

/// The parameter table.
pub const PARAMS_MAPPING: &[ParamMapping] = &[
    // ring SSAO
    toggle("ssaoEnable", "dSSAOEnable"),
    float("ssao_scale", "ussao_scale", 1.0, 1.0, 100.0, 1.0),
    count("ssao_samples", "dssao_samples", 6.0, 1.0, 20.0),
    count("ssao_rings", "dssao_rings", 6.0, 1.0, 20.0),
    float("ssao_aoCap", "ussao_aoCap", 1.2, 0.0, 10.0, 0.1),
    float("ssao_aoMultiplier", "ussao_aoMultiplier", 200.0, 1.0, 500.0, 1.0),
    float("ssao_depthTolerance", "ussao_depthTolerance", 0.0, 0.0, 1.0, 0.01),
    float("ssao_aorange", "ussao_aorange", 60.0, 1.0, 500.0, 1.0),
    toggle("ssao_negative", "dssao_negative"),
    // hash / engraving
    toggle("hashEnable", "dHashEnable"),
    float("back_intensity", "back_intensity", 1.0, 0.0, 1.0, 0.1),
    float("line_intensity", "line_intensity", 0.0, 0.0, 1.0, 0.1),
    float("c_limit", "c_limit", 0.6, 0.0, 1.0, 0.1),
    float("c_spacing", "c_spacing", 2.0, 0.0, 100.0, 1.0),
    float("c_width", "c_width", 10.0, 0.0, 100.0, 1.0),
    float("s_spacing", "s_spacing", 6.0, 0.0, 10.0, 1.0),
    float("s_width", "s_width", 1.0, 0.0, 100.0, 1.0),
    float("d_spacing", "d_spacing", 4.0, 0.0, 10.0, 1.0),
    float("d_width_high", "d_width_high", 0.0, 0.0, 1.0, 0.1),
    float("d_width_low", "d_width_low", 0.0, 0.0, 10.0, 1.0),
    float("g_low", "g_low", 16000.0, 0.0, 10_000_000.0, 500.0),
    float("g_hight", "g_hight", 17000.0, 0.0, 10_000_000.0, 500.0),
    float("l_low", "l_low", 5000.0, 0.0, 10_000_000.0, 1000.0),
    float("l_hight", "l_hight", 10000.0, 0.0, 10_000_000.0, 1000.0),
    float("d_width_spread", "d_width_spread", 1.0, 0.0, 100.0, 1.0),
    float("zl_max", "zl_max", 0.0, 0.0, 1.0, 0.1),
    float("zl_min", "zl_min", 0.0, 0.0, 1.0, 0.1),
    // kernel occlusion
    toggle("occlusionEnable", "dOcclusionEnable"),
    count("occlusionKernelSize", "dOcclusionKernelSize", 4.0, 1.0, 100.0),
    float("occlusionBias", "uOcclusionBias", 0.5, 0.0, 1.0, 0.01),
    float("occlusionRadius", "uOcclusionRadius", 64.0, 0.0, 256.0, 1.0),
    // outline
    toggle("outlineEnable", "dOutlineEnable"),
    float("outlineScale", "uOutlineScale", 1.0, 0.0, 10.0, 1.0),
    float("outlineThreshold", "uOutlineThreshold", 0.8, 0.0, 1.0, 0.01),
];

/// Look up a row by logical name.
pub fn find_param(name: &str) -> Option<&'static ParamMapping> {
    PARAMS_MAPPING.iter().find(|row| row.name == name)
}

impl ParamMapping {
    /// Schema slot kind of this row.
    pub fn slot_kind(&self) -> SlotKind {
        match (self.storage, self.kind) {
            (ParamStorage::Define, ParamKind::Boolean) => SlotKind::Define(DefineType::Bool),
            (ParamStorage::Define, ParamKind::F | ParamKind::Number) => {
                SlotKind::Define(DefineType::Number)
            }
            (ParamStorage::Uniform, ParamKind::Boolean) => SlotKind::Uniform(UniformType::Bool),
            (ParamStorage::Uniform, ParamKind::F | ParamKind::Number) => {
                SlotKind::Uniform(UniformType::F32)
            }
        }
    }

    /// Convert a prop value into the slot value, or `None` if the kinds
    /// disagree.
    pub fn slot_value<T>(&self, value: ParamValue) -> Option<Value<T>> {
        match (self.slot_kind(), value) {
            (
                SlotKind::Define(DefineType::Bool) | SlotKind::Uniform(UniformType::Bool),
                ParamValue::Bool(b),
            ) => Some(Value::Bool(b)),
            (SlotKind::Define(DefineType::Number), ParamValue::Number(n)) => {
                Some(Value::I32(n.round() as i32))
            }
            (SlotKind::Uniform(_), ParamValue::Number(n)) => Some(Value::F32(n as f32)),
            _ => None,
        }
    }
}

static SCHEMA: LazyLock<RenderableSchema> = LazyLock::new(|| {
    let mut schema = RenderableSchema::new()
        .texture("tColor", TextureFilter::Nearest)
        .texture("tDepth", TextureFilter::Nearest)
        .uniform("uTexSize", UniformType::Vec2)
        .define("dPackedDepth", DefineType::Bool);
    for row in PARAMS_MAPPING {
        schema.push(row.slot, row.slot_kind());
    }
    schema
});

/// GPU schema of the postprocessing program, built once from the table.
pub fn postprocessing_schema() -> &'static RenderableSchema {
    &SCHEMA
}

static DEFINITIONS: LazyLock<Schema> = LazyLock::new(|| {
    let mut properties = Map::new();
    for row in PARAMS_MAPPING {
        let mut entry = Map::new();
        match row.default {
            ParamValue::Bool(b) => {
                let _ = entry.insert("type".to_owned(), json!("boolean"));
                let _ = entry.insert("default".to_owned(), json!(b));
            }
            ParamValue::Number(n) => {
                let ty = if row.kind == ParamKind::Number {
                    "integer"
                } else {
                    "number"
                };
                let _ = entry.insert("type".to_owned(), json!(ty));
                let _ = entry.insert("default".to_owned(), json!(n));
            }
        }
        if let Some(range) = row.range {
            let _ = entry.insert("minimum".to_owned(), json!(range.min));
            let _ = entry.insert("maximum".to_owned(), json!(range.max));
            let _ = entry.insert("step".to_owned(), json!(range.step));
        }
        let _ = properties.insert(row.name.to_owned(), Json::Object(entry));
    }
    let mut root = Map::new();
    let _ = root.insert("title".to_owned(), json!("Postprocessing"));
    let _ = root.insert("type".to_owned(), json!("object"));
    let _ = root.insert("properties".to_owned(), Json::Object(properties));
    let _ = root.insert("additionalProperties".to_owned(), json!(false));
    Schema::from(root)
});

/// JSON schema of every postprocessing parameter, built once from the table.
pub fn param_definitions() -> &'static Schema {
    &DEFINITIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_row_has_a_schema_slot() {
        let schema = postprocessing_schema();
        for row in PARAMS_MAPPING {
            let slot = schema.get(row.slot).unwrap();
            assert_eq!(slot.kind, row.slot_kind(), "{}", row.name);
        }
        assert!(schema.get("tColor").is_some());
        assert!(schema.get("dPackedDepth").is_some());
    }

    #[test]
    fn names_and_slots_are_unique() {
        for (i, a) in PARAMS_MAPPING.iter().enumerate() {
            for b in &PARAMS_MAPPING[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.slot, b.slot);
            }
        }
    }

    #[test]
    fn defaults_lie_in_range() {
        for row in PARAMS_MAPPING {
            if let (Some(range), ParamValue::Number(n)) = (row.range, row.default) {
                assert!(
                    (range.min..=range.max).contains(&n),
                    "{} default {n} outside [{}, {}]",
                    row.name,
                    range.min,
                    range.max
                );
            }
        }
    }

    #[test]
    fn definitions_expose_ranges_and_defaults() {
        let defs = serde_json::to_value(param_definitions()).unwrap();
        let scale = &defs["properties"]["outlineScale"];
        assert_eq!(scale["default"], json!(1.0));
        assert_eq!(scale["maximum"], json!(10.0));
        assert_eq!(defs["properties"]["outlineEnable"]["type"], json!("boolean"));
        assert_eq!(defs["properties"]["ssao_rings"]["type"], json!("integer"));
    }

    #[test]
    fn number_defines_become_integers() {
        let row = find_param("occlusionKernelSize").unwrap();
        assert_eq!(row.slot_value::<()>(ParamValue::Number(5.0)), Some(Value::I32(5)));
        assert_eq!(row.slot_value::<()>(ParamValue::Bool(true)), None);
    }
}
