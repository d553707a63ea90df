use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderDefValue,
    ShaderLanguage, ShaderType,
};

use super::schema::DefineValue;
use crate::error::UmbraError;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support and shader defines.
///
/// Pre-loads the shared WGSL modules at construction time. Pass shaders use
/// `#import umbra::module_name::{...}` to pull in shared code. Defines map to
/// naga_oil shader defs: integers are substituted with `#{dName}`, `true`
/// booleans enable `#ifdef dName` blocks and `false` booleans are omitted.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

const MODULES: &[ModuleDef] = &[ModuleDef {
    source: include_str!("../../assets/shaders/modules/depth.wgsl"),
    file_path: "modules/depth.wgsl",
}];

impl ShaderComposer {
    /// Create a composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, UmbraError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    UmbraError::Shader(format!(
                        "failed to register shader module '{}': {e:?}",
                        m.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose a shader source into a `wgpu::ShaderModule`.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        defines: &[(&'static str, DefineValue)],
    ) -> Result<wgpu::ShaderModule, UmbraError> {
        let naga_module = self.compose_naga(source, label, defines)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without a GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Shader`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
        defines: &[(&'static str, DefineValue)],
    ) -> Result<naga::Module, UmbraError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                shader_defs: shader_defs(defines),
                ..Default::default()
            })
            .map_err(|e| {
                UmbraError::Shader(format!(
                    "failed to compose shader '{file_path}': {}",
                    e.emit_to_string(&self.composer)
                ))
            })
    }
}

fn shader_defs<M>(defines: &[(&'static str, DefineValue)]) -> M
where
    M: FromIterator<(String, ShaderDefValue)>,
{
    defines
        .iter()
        .filter_map(|(name, value)| match value {
            DefineValue::Bool(false) => None,
            DefineValue::Bool(true) => {
                Some(((*name).to_owned(), ShaderDefValue::Bool(true)))
            }
            DefineValue::Int(n) => {
                Some(((*name).to_owned(), ShaderDefValue::Int(*n)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::schema::{DefineType, RenderableValues, SlotKind, Value};
    use crate::renderer::postprocess::shader_programs;

    /// Default defines plus a variant with every boolean on and every
    /// number at 2, so both sides of each `#ifdef` are exercised.
    fn define_sets(
        values: &RenderableValues<u32>,
    ) -> Vec<Vec<(&'static str, DefineValue)>> {
        let defaults = values.defines();
        let mut all_on = Vec::new();
        for slot in values.schema().slots() {
            match slot.kind {
                SlotKind::Define(DefineType::Bool) => {
                    all_on.push((slot.name, DefineValue::Bool(true)));
                }
                SlotKind::Define(DefineType::Number) => {
                    all_on.push((slot.name, DefineValue::Int(2)));
                }
                _ => {}
            }
        }
        vec![defaults, all_on]
    }

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for (source, schema) in shader_programs() {
            let textures: Vec<_> =
                schema.textures().map(|(name, _)| (name, 0_u32)).collect();
            let mut values = RenderableValues::new(&schema, textures).unwrap();
            // Number defines start at 1 so every loop body is compiled.
            for (name, _) in values.defines() {
                let _ = values.update_if_changed(name, Value::I32(1));
            }
            let wgsl = source.assemble(&schema);
            for defines in define_sets(&values) {
                let module = composer
                    .compose_naga(&wgsl, source.label, &defines)
                    .unwrap_or_else(|e| {
                        panic!("shader '{}' failed to compose: {e}", source.label)
                    });
                let mut validator = naga::valid::Validator::new(
                    naga::valid::ValidationFlags::all(),
                    naga::valid::Capabilities::empty(),
                );
                let _ = validator.validate(&module).unwrap_or_else(|e| {
                    panic!("shader '{}' failed validation: {e:?}", source.label)
                });
            }
        }
    }

    #[test]
    fn false_booleans_are_omitted() {
        let defs: std::collections::HashMap<String, ShaderDefValue> = shader_defs(&[
            ("dA", DefineValue::Bool(false)),
            ("dB", DefineValue::Bool(true)),
            ("dN", DefineValue::Int(4)),
        ]);
        assert!(!defs.contains_key("dA"));
        assert_eq!(defs.get("dB"), Some(&ShaderDefValue::Bool(true)));
        assert_eq!(defs.get("dN"), Some(&ShaderDefValue::Int(4)));
    }
}
