//! Renderable schemas: the named uniform, texture and define slots of a
//! full-screen shader program, the values bound to them, and the WGSL
//! interface generated from them.
//!
//! The schema is the single source of truth for the shader interface. The
//! uniform struct, texture/sampler bindings and the full-screen vertex stage
//! are generated from it, so slot names and shader identifiers cannot drift
//! apart.

use std::fmt::Write as _;

use glam::{Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use super::value_cell::ValueCell;
use crate::error::UmbraError;

/// Runtime uniform types, laid out with WGSL uniform address-space rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    /// `f32`.
    F32,
    /// `i32`.
    I32,
    /// Boolean, stored as `i32` (bool is not host-shareable in WGSL).
    Bool,
    /// `vec2<f32>`.
    Vec2,
    /// `vec3<f32>`.
    Vec3,
    /// `vec4<f32>`.
    Vec4,
    /// `mat4x4<f32>`, column-major.
    Mat4,
    /// Fixed-capacity vec3 array, stored as `array<vec4<f32>, N>`.
    Vec3Array(usize),
}

impl UniformType {
    fn align(self) -> usize {
        match self {
            Self::F32 | Self::I32 | Self::Bool => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 | Self::Mat4 | Self::Vec3Array(_) => 16,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::F32 | Self::I32 | Self::Bool => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
            Self::Vec3Array(n) => 16 * n.max(1),
        }
    }

    fn wgsl(self) -> String {
        match self {
            Self::F32 => "f32".to_owned(),
            Self::I32 | Self::Bool => "i32".to_owned(),
            Self::Vec2 => "vec2<f32>".to_owned(),
            Self::Vec3 => "vec3<f32>".to_owned(),
            Self::Vec4 => "vec4<f32>".to_owned(),
            Self::Mat4 => "mat4x4<f32>".to_owned(),
            Self::Vec3Array(n) => format!("array<vec4<f32>, {}>", n.max(1)),
        }
    }

    fn zero<T>(self) -> Value<T> {
        match self {
            Self::F32 => Value::F32(0.0),
            Self::I32 => Value::I32(0),
            Self::Bool => Value::Bool(false),
            Self::Vec2 => Value::Vec2(Vec2::ZERO),
            Self::Vec3 => Value::Vec3(Vec3::ZERO),
            Self::Vec4 => Value::Vec4(Vec4::ZERO),
            Self::Mat4 => Value::Mat4(Mat4::IDENTITY),
            Self::Vec3Array(_) => Value::Vec3Array(Vec::new()),
        }
    }
}

/// Sampling mode of a texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Non-filterable float texture with a nearest sampler (depth inputs).
    Nearest,
    /// Filterable texture with a clamp-to-edge linear sampler.
    Linear,
    /// Filterable texture with a repeating linear sampler (tiled overlays).
    LinearRepeat,
}

/// Compile-time define types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineType {
    /// Enables `#ifdef` blocks when true.
    Bool,
    /// Integer substituted with `#{name}`.
    Number,
}

/// What a schema slot binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Runtime value packed into the uniform block.
    Uniform(UniformType),
    /// Sampled 2D texture plus its sampler.
    Texture(TextureFilter),
    /// Shader define; changing it requires recompilation.
    Define(DefineType),
}

/// A named slot of a renderable schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    /// Slot name, identical to the shader identifier.
    pub name: &'static str,
    /// Slot kind.
    pub kind: SlotKind,
}

/// Ordered set of slots describing one shader program's interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderableSchema {
    slots: Vec<SlotSpec>,
}

/// Offset of one uniform inside the packed uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    /// Slot name.
    pub name: &'static str,
    /// Uniform type.
    pub ty: UniformType,
    /// Byte offset in the block.
    pub offset: usize,
}

/// Packed uniform block layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    /// Fields in declaration order.
    pub fields: Vec<UniformField>,
    /// Block size in bytes, a multiple of 16.
    pub size: usize,
}

const fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

impl RenderableSchema {
    /// Empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot. A slot with the same name replaces the earlier one.
    #[must_use]
    pub fn with(mut self, name: &'static str, kind: SlotKind) -> Self {
        self.push(name, kind);
        self
    }

    /// Append a uniform slot.
    #[must_use]
    pub fn uniform(self, name: &'static str, ty: UniformType) -> Self {
        self.with(name, SlotKind::Uniform(ty))
    }

    /// Append a texture slot.
    #[must_use]
    pub fn texture(self, name: &'static str, filter: TextureFilter) -> Self {
        self.with(name, SlotKind::Texture(filter))
    }

    /// Append a define slot.
    #[must_use]
    pub fn define(self, name: &'static str, ty: DefineType) -> Self {
        self.with(name, SlotKind::Define(ty))
    }

    /// Append or replace a slot in place.
    pub fn push(&mut self, name: &'static str, kind: SlotKind) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.name == name) {
            slot.kind = kind;
        } else {
            self.slots.push(SlotSpec { name, kind });
        }
    }

    /// All slots in declaration order.
    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    /// Look up a slot by name.
    pub fn get(&self, name: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Texture slots in binding order.
    pub fn textures(&self) -> impl Iterator<Item = (&'static str, TextureFilter)> + '_ {
        self.slots.iter().filter_map(|s| match s.kind {
            SlotKind::Texture(filter) => Some((s.name, filter)),
            _ => None,
        })
    }

    /// Compute the packed uniform block layout.
    pub fn uniform_layout(&self) -> UniformLayout {
        let mut offset = 0;
        let mut fields = Vec::new();
        for slot in &self.slots {
            if let SlotKind::Uniform(ty) = slot.kind {
                offset = round_up(offset, ty.align());
                fields.push(UniformField {
                    name: slot.name,
                    ty,
                    offset,
                });
                offset += ty.size();
            }
        }
        UniformLayout {
            fields,
            size: round_up(offset.max(16), 16),
        }
    }

    /// Generate the WGSL interface: the `Uniforms` struct bound at
    /// `@binding(0)` as `u`, one texture + sampler pair per texture slot
    /// (`tName` at `1 + 2k`, `tNameSampler` at `2 + 2k`), and the
    /// full-screen triangle vertex entry point `vs_main`.
    pub fn wgsl_interface(&self) -> String {
        let mut out = String::new();
        out.push_str("struct Uniforms {\n");
        let layout = self.uniform_layout();
        if layout.fields.is_empty() {
            out.push_str("    _unused: vec4<f32>,\n");
        }
        for field in &layout.fields {
            let _ = writeln!(out, "    {}: {},", field.name, field.ty.wgsl());
        }
        out.push_str("};\n\n@group(0) @binding(0) var<uniform> u: Uniforms;\n");

        for (index, (name, _)) in self.textures().enumerate() {
            let binding = 1 + 2 * index;
            let _ = writeln!(
                out,
                "@group(0) @binding({binding}) var {name}: texture_2d<f32>;"
            );
            let _ = writeln!(
                out,
                "@group(0) @binding({}) var {name}Sampler: sampler;",
                binding + 1
            );
        }

        out.push_str(FULLSCREEN_VERTEX);
        out
    }
}

const FULLSCREEN_VERTEX: &str = "
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    var out: FullscreenOutput;
    out.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    return out;
}
";

/// A value bound to a schema slot. `T` is the backend's texture handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    /// Float uniform.
    F32(f32),
    /// Integer uniform or number define.
    I32(i32),
    /// Boolean uniform or boolean define.
    Bool(bool),
    /// vec2 uniform.
    Vec2(Vec2),
    /// vec3 uniform.
    Vec3(Vec3),
    /// vec4 uniform.
    Vec4(Vec4),
    /// mat4 uniform.
    Mat4(Mat4),
    /// vec3 array uniform.
    Vec3Array(Vec<Vec3>),
    /// Texture handle.
    Texture(T),
}

impl<T> Value<T> {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::F32(_) => "f32",
            Self::I32(_) => "i32",
            Self::Bool(_) => "bool",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat4(_) => "mat4",
            Self::Vec3Array(_) => "vec3 array",
            Self::Texture(_) => "texture",
        }
    }

    /// Float payload, if any.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer payload, if any.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Texture payload, if any.
    pub fn as_texture(&self) -> Option<&T> {
        match self {
            Self::Texture(t) => Some(t),
            _ => None,
        }
    }
}

fn expected_kind(kind: SlotKind) -> &'static str {
    match kind {
        SlotKind::Uniform(UniformType::F32) => "f32",
        SlotKind::Uniform(UniformType::I32) | SlotKind::Define(DefineType::Number) => "i32",
        SlotKind::Uniform(UniformType::Bool) | SlotKind::Define(DefineType::Bool) => "bool",
        SlotKind::Uniform(UniformType::Vec2) => "vec2",
        SlotKind::Uniform(UniformType::Vec3) => "vec3",
        SlotKind::Uniform(UniformType::Vec4) => "vec4",
        SlotKind::Uniform(UniformType::Mat4) => "mat4",
        SlotKind::Uniform(UniformType::Vec3Array(_)) => "vec3 array",
        SlotKind::Texture(_) => "texture",
    }
}

fn accepts<T>(kind: SlotKind, value: &Value<T>) -> bool {
    matches!(
        (kind, value),
        (SlotKind::Uniform(UniformType::F32), Value::F32(_))
            | (
                SlotKind::Uniform(UniformType::I32) | SlotKind::Define(DefineType::Number),
                Value::I32(_)
            )
            | (
                SlotKind::Uniform(UniformType::Bool) | SlotKind::Define(DefineType::Bool),
                Value::Bool(_)
            )
            | (SlotKind::Uniform(UniformType::Vec2), Value::Vec2(_))
            | (SlotKind::Uniform(UniformType::Vec3), Value::Vec3(_))
            | (SlotKind::Uniform(UniformType::Vec4), Value::Vec4(_))
            | (SlotKind::Uniform(UniformType::Mat4), Value::Mat4(_))
            | (SlotKind::Texture(_), Value::Texture(_))
    ) || matches!(
        (kind, value),
        (SlotKind::Uniform(UniformType::Vec3Array(cap)), Value::Vec3Array(v)) if v.len() <= cap
    )
}

/// A define value handed to the shader preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineValue {
    /// Boolean define; only `true` values are emitted.
    Bool(bool),
    /// Integer define.
    Int(i32),
}

/// Which slot categories changed since the last synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtySet {
    /// A define changed: the program must be recompiled.
    pub defines: bool,
    /// A uniform changed: the block must be re-uploaded.
    pub uniforms: bool,
    /// A texture changed: bindings must be rebuilt.
    pub textures: bool,
}

impl DirtySet {
    /// Whether nothing changed.
    pub fn is_clean(&self) -> bool {
        !(self.defines || self.uniforms || self.textures)
    }
}

/// One authoritative [`ValueCell`] per schema slot.
#[derive(Debug, Clone)]
pub struct RenderableValues<T> {
    schema: RenderableSchema,
    cells: FxHashMap<&'static str, ValueCell<Value<T>>>,
}

impl<T: Clone + PartialEq> RenderableValues<T> {
    /// Create values for `schema`. Uniforms start zeroed (identity for
    /// matrices), defines start false/0, and every texture slot must be
    /// supplied in `textures`.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::MissingTexture`] if a texture slot has no
    /// entry and [`UmbraError::UnknownSlot`] if an entry names no texture
    /// slot.
    pub fn new(
        schema: &RenderableSchema,
        textures: impl IntoIterator<Item = (&'static str, T)>,
    ) -> Result<Self, UmbraError> {
        let mut cells = FxHashMap::default();
        for slot in schema.slots() {
            let initial = match slot.kind {
                SlotKind::Uniform(ty) => Some(ty.zero()),
                SlotKind::Define(DefineType::Bool) => Some(Value::Bool(false)),
                SlotKind::Define(DefineType::Number) => Some(Value::I32(0)),
                SlotKind::Texture(_) => None,
            };
            if let Some(value) = initial {
                let _ = cells.insert(slot.name, ValueCell::new(value));
            }
        }
        for (name, texture) in textures {
            match schema.get(name) {
                Some(SlotSpec {
                    kind: SlotKind::Texture(_),
                    ..
                }) => {
                    let _ = cells.insert(name, ValueCell::new(Value::Texture(texture)));
                }
                _ => return Err(UmbraError::UnknownSlot(name.to_owned())),
            }
        }
        if let Some((name, _)) = schema.textures().find(|(name, _)| !cells.contains_key(name)) {
            return Err(UmbraError::MissingTexture(name.to_owned()));
        }
        Ok(Self {
            schema: schema.clone(),
            cells,
        })
    }

    /// The schema these values are bound to.
    pub fn schema(&self) -> &RenderableSchema {
        &self.schema
    }

    fn checked(&self, name: &str, value: &Value<T>) -> Result<&'static str, UmbraError> {
        let slot = self
            .schema
            .get(name)
            .ok_or_else(|| UmbraError::UnknownSlot(name.to_owned()))?;
        if !accepts(slot.kind, value) {
            return Err(UmbraError::SlotTypeMismatch {
                slot: name.to_owned(),
                expected: expected_kind(slot.kind),
                found: value.kind_name(),
            });
        }
        Ok(slot.name)
    }

    /// The cell bound to `name`.
    pub fn cell(&self, name: &str) -> Option<&ValueCell<Value<T>>> {
        self.cells.get(name)
    }

    /// Current value of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::UnknownSlot`] if the schema has no such slot.
    pub fn get(&self, name: &str) -> Result<&Value<T>, UmbraError> {
        self.cells
            .get(name)
            .map(ValueCell::get)
            .ok_or_else(|| UmbraError::UnknownSlot(name.to_owned()))
    }

    /// Unconditionally write `value` into `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or the value kind does not
    /// match the slot.
    pub fn set(&mut self, name: &str, value: Value<T>) -> Result<(), UmbraError> {
        let key = self.checked(name, &value)?;
        if let Some(cell) = self.cells.get_mut(key) {
            cell.set(value);
        }
        Ok(())
    }

    /// Write `value` into `name` only if it differs from the current value.
    /// Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is unknown or the value kind does not
    /// match the slot.
    pub fn update_if_changed(&mut self, name: &str, value: Value<T>) -> Result<bool, UmbraError> {
        let key = self.checked(name, &value)?;
        Ok(self
            .cells
            .get_mut(key)
            .is_some_and(|cell| cell.update_if_changed(value)))
    }

    /// Which slot categories have dirty cells.
    pub fn dirty(&self) -> DirtySet {
        let mut set = DirtySet::default();
        for slot in self.schema.slots() {
            if !self.cells.get(slot.name).is_some_and(ValueCell::is_dirty) {
                continue;
            }
            match slot.kind {
                SlotKind::Define(_) => set.defines = true,
                SlotKind::Uniform(_) => set.uniforms = true,
                SlotKind::Texture(_) => set.textures = true,
            }
        }
        set
    }

    /// Mark every cell as synchronized.
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    /// Current defines in schema order.
    pub fn defines(&self) -> Vec<(&'static str, DefineValue)> {
        self.schema
            .slots()
            .iter()
            .filter_map(|slot| {
                let value = self.cells.get(slot.name)?.get();
                match (slot.kind, value) {
                    (SlotKind::Define(_), Value::Bool(b)) => {
                        Some((slot.name, DefineValue::Bool(*b)))
                    }
                    (SlotKind::Define(_), Value::I32(n)) => {
                        Some((slot.name, DefineValue::Int(*n)))
                    }
                    _ => None,
                }
            })
            .collect()
    }

    /// Current textures in binding order.
    pub fn textures(&self) -> Vec<T> {
        self.schema
            .textures()
            .filter_map(|(name, _)| self.cells.get(name)?.get().as_texture().cloned())
            .collect()
    }

    /// Pack every uniform into a byte block following `layout`.
    pub fn pack_uniforms(&self, layout: &UniformLayout) -> Vec<u8> {
        let mut bytes = vec![0_u8; layout.size];
        for field in &layout.fields {
            let Some(cell) = self.cells.get(field.name) else {
                continue;
            };
            let at = field.offset;
            match cell.get() {
                Value::F32(v) => write_bytes(&mut bytes, at, bytemuck::bytes_of(v)),
                Value::I32(v) => write_bytes(&mut bytes, at, bytemuck::bytes_of(v)),
                Value::Bool(v) => write_bytes(&mut bytes, at, bytemuck::bytes_of(&i32::from(*v))),
                Value::Vec2(v) => write_bytes(&mut bytes, at, bytemuck::cast_slice(&v.to_array())),
                Value::Vec3(v) => write_bytes(&mut bytes, at, bytemuck::cast_slice(&v.to_array())),
                Value::Vec4(v) => write_bytes(&mut bytes, at, bytemuck::cast_slice(&v.to_array())),
                Value::Mat4(m) => {
                    write_bytes(&mut bytes, at, bytemuck::cast_slice(&m.to_cols_array()));
                }
                Value::Vec3Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        let item = item.to_array();
                        write_bytes(&mut bytes, at + 16 * i, bytemuck::cast_slice(&item));
                    }
                }
                Value::Texture(_) => {}
            }
        }
        bytes
    }
}

fn write_bytes(out: &mut [u8], offset: usize, data: &[u8]) {
    if let Some(dst) = out.get_mut(offset..offset + data.len()) {
        dst.copy_from_slice(data);
    }
}
