//! Compute renderable: a schema-described full-screen program plus its
//! change-tracked values, treated as one updatable/renderable unit.

use super::backend::{Backend, DrawState, DrawTarget, ShaderSource};
use super::schema::{RenderableSchema, RenderableValues, UniformLayout, Value};
use crate::error::UmbraError;

/// What an [`ComputeRenderable::update`] call synchronized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The program was (re)compiled because a define changed.
    pub recompiled: bool,
    /// The uniform block was re-uploaded.
    pub uploaded: bool,
    /// Texture bindings were rebuilt.
    pub rebound: bool,
}

/// A full-screen program bound to a [`RenderableSchema`].
///
/// Values are written through [`ComputeRenderable::update_if_changed`] (or
/// [`ComputeRenderable::set`]) and synchronized with the GPU by
/// [`ComputeRenderable::update`], which must run before
/// [`ComputeRenderable::render`] whenever values changed.
pub struct ComputeRenderable<B: Backend> {
    source: ShaderSource,
    values: RenderableValues<B::Texture>,
    layout: UniformLayout,
    program: Option<B::Program>,
    compile_count: usize,
}

impl<B: Backend> ComputeRenderable<B> {
    /// Create a renderable. The program is compiled lazily by the first
    /// [`ComputeRenderable::update`].
    ///
    /// # Errors
    ///
    /// Returns an error if `textures` does not cover the schema's texture
    /// slots exactly.
    pub fn new(
        source: ShaderSource,
        schema: &RenderableSchema,
        textures: impl IntoIterator<Item = (&'static str, B::Texture)>,
    ) -> Result<Self, UmbraError> {
        Ok(Self {
            source,
            values: RenderableValues::new(schema, textures)?,
            layout: schema.uniform_layout(),
            program: None,
            compile_count: 0,
        })
    }

    /// Bound values.
    pub fn values(&self) -> &RenderableValues<B::Texture> {
        &self.values
    }

    /// Current value of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::UnknownSlot`] if the schema has no such slot.
    pub fn get(&self, name: &str) -> Result<&Value<B::Texture>, UmbraError> {
        self.values.get(name)
    }

    /// Unconditionally write a slot.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown slots or mismatched value kinds.
    pub fn set(&mut self, name: &str, value: Value<B::Texture>) -> Result<(), UmbraError> {
        self.values.set(name, value)
    }

    /// Write a slot only if the value changed. Returns whether it did.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown slots or mismatched value kinds.
    pub fn update_if_changed(
        &mut self,
        name: &str,
        value: Value<B::Texture>,
    ) -> Result<bool, UmbraError> {
        self.values.update_if_changed(name, value)
    }

    /// Whether the next [`ComputeRenderable::update`] recompiles.
    pub fn needs_recompile(&self) -> bool {
        self.program.is_none() || self.values.dirty().defines
    }

    /// Whether any value awaits synchronization.
    pub fn is_dirty(&self) -> bool {
        self.program.is_none() || !self.values.dirty().is_clean()
    }

    /// Number of program compilations so far.
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// Synchronize dirty values with the GPU: recompile on define changes,
    /// re-upload the uniform block on uniform changes, rebind on texture
    /// changes. Free when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Shader`] if recompilation fails. The previous
    /// program stays in place and the values stay dirty.
    pub fn update(&mut self, backend: &mut B) -> Result<UpdateOutcome, UmbraError> {
        let dirty = self.values.dirty();
        let mut outcome = UpdateOutcome::default();

        if self.program.is_none() || dirty.defines {
            let defines = self.values.defines();
            let program = backend.compile_program(
                &self.source,
                self.values.schema(),
                &defines,
            )?;
            self.program = Some(program);
            self.compile_count += 1;
            outcome.recompiled = true;
            log::debug!(
                "compiled '{}' with defines {defines:?}",
                self.source.label
            );
        }

        let Some(program) = self.program.as_mut() else {
            return Ok(outcome);
        };
        if outcome.recompiled || dirty.uniforms {
            let bytes = self.values.pack_uniforms(&self.layout);
            backend.write_uniforms(program, &bytes);
            outcome.uploaded = true;
        }
        if outcome.recompiled || dirty.textures {
            backend.bind_textures(program, &self.values.textures());
            outcome.rebound = true;
        }
        self.values.clear();
        Ok(outcome)
    }

    /// Draw the full-screen triangle into `target`.
    ///
    /// Rendering before the first [`ComputeRenderable::update`] is a
    /// programming error: the draw is skipped.
    pub fn render(
        &mut self,
        backend: &mut B,
        target: DrawTarget<'_, B::Target>,
        state: &DrawState,
    ) {
        debug_assert!(self.program.is_some(), "render called before update");
        let Some(program) = self.program.as_mut() else {
            log::warn!(
                "'{}' rendered before its first update, draw skipped",
                self.source.label
            );
            return;
        };
        backend.draw(program, target, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::MockBackend;
    use crate::gpu::schema::{DefineType, TextureFilter, UniformType};
    use crate::gpu::TextureImage;

    const SOURCE: ShaderSource = ShaderSource {
        label: "test",
        imports: &[],
        fragment: "",
    };

    fn renderable(backend: &mut MockBackend) -> ComputeRenderable<MockBackend> {
        let tex = backend.create_texture("t", &TextureImage::black(1, 1), TextureFilter::Linear);
        let schema = RenderableSchema::new()
            .texture("tColor", TextureFilter::Linear)
            .uniform("uAmount", UniformType::F32)
            .define("dCount", DefineType::Number);
        ComputeRenderable::new(SOURCE, &schema, [("tColor", tex)]).unwrap()
    }

    #[test]
    fn first_update_compiles_uploads_and_binds() {
        let mut backend = MockBackend::new();
        let mut r = renderable(&mut backend);
        assert!(r.needs_recompile());
        let outcome = r.update(&mut backend).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome {
                recompiled: true,
                uploaded: true,
                rebound: true
            }
        );
        assert_eq!(backend.stats().compiles, 1);
    }

    #[test]
    fn update_is_free_when_nothing_changed() {
        let mut backend = MockBackend::new();
        let mut r = renderable(&mut backend);
        let _ = r.update(&mut backend).unwrap();
        let before = backend.stats();
        assert_eq!(r.update(&mut backend).unwrap(), UpdateOutcome::default());
        assert_eq!(backend.stats(), before);
    }

    #[test]
    fn uniform_change_uploads_without_recompiling() {
        let mut backend = MockBackend::new();
        let mut r = renderable(&mut backend);
        let _ = r.update(&mut backend).unwrap();
        assert!(r.update_if_changed("uAmount", Value::F32(2.0)).unwrap());
        assert!(!r.needs_recompile());
        let outcome = r.update(&mut backend).unwrap();
        assert!(outcome.uploaded && !outcome.recompiled && !outcome.rebound);
        assert_eq!(backend.stats().compiles, 1);
        assert_eq!(backend.stats().uniform_uploads, 2);
    }

    #[test]
    fn define_change_recompiles() {
        let mut backend = MockBackend::new();
        let mut r = renderable(&mut backend);
        let _ = r.update(&mut backend).unwrap();
        assert!(r.update_if_changed("dCount", Value::I32(3)).unwrap());
        assert!(r.needs_recompile());
        assert!(r.update(&mut backend).unwrap().recompiled);
        assert_eq!(r.compile_count(), 2);
    }

    #[test]
    fn render_draws_after_update() {
        let mut backend = MockBackend::new();
        let mut r = renderable(&mut backend);
        let _ = r.update(&mut backend).unwrap();
        r.render(&mut backend, DrawTarget::DrawingBuffer, &DrawState::default());
        assert_eq!(backend.stats().draws, 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "render called before update")]
    fn render_before_update_is_caught_in_debug() {
        let mut backend = MockBackend::new();
        let mut r = renderable(&mut backend);
        r.render(&mut backend, DrawTarget::DrawingBuffer, &DrawState::default());
    }
}
