//! Full-screen texture copy.

use std::sync::LazyLock;

use glam::Vec2;

use crate::error::UmbraError;
use crate::gpu::backend::{Backend, DrawState, DrawTarget, ShaderSource};
use crate::gpu::renderable::{ComputeRenderable, UpdateOutcome};
use crate::gpu::schema::{RenderableSchema, TextureFilter, UniformType, Value};

pub(crate) const COPY_SHADER: ShaderSource = ShaderSource {
    label: "copy",
    imports: &[],
    fragment: include_str!("../../../assets/shaders/screen/copy.wgsl"),
};

pub(crate) static COPY_SCHEMA: LazyLock<RenderableSchema> = LazyLock::new(|| {
    RenderableSchema::new()
        .texture("tColor", TextureFilter::Linear)
        .uniform("uTexSize", UniformType::Vec2)
});

/// Copies one texture into a target or the drawing buffer.
pub struct CopyPass<B: Backend> {
    renderable: ComputeRenderable<B>,
}

impl<B: Backend> CopyPass<B> {
    /// Copy pass reading `texture` of size `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects an initial value.
    pub fn new(texture: B::Texture, width: u32, height: u32) -> Result<Self, UmbraError> {
        let mut renderable =
            ComputeRenderable::new(COPY_SHADER, &COPY_SCHEMA, [("tColor", texture)])?;
        renderable.set("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32)))?;
        Ok(Self { renderable })
    }

    /// Point the copy at another source texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects the value.
    pub fn set_texture(&mut self, texture: B::Texture) -> Result<(), UmbraError> {
        let _ = self.renderable.update_if_changed("tColor", Value::Texture(texture))?;
        Ok(())
    }

    /// Re-point the size uniform.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects the value.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), UmbraError> {
        let _ = self
            .renderable
            .update_if_changed("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32)))?;
        Ok(())
    }

    /// The underlying renderable.
    pub fn renderable(&self) -> &ComputeRenderable<B> {
        &self.renderable
    }

    /// Synchronize dirty values with the GPU.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    pub fn update(&mut self, backend: &mut B) -> Result<UpdateOutcome, UmbraError> {
        self.renderable.update(backend)
    }

    /// Draw the copy.
    pub fn render(
        &mut self,
        backend: &mut B,
        target: DrawTarget<'_, B::Target>,
        state: &DrawState,
    ) {
        self.renderable.render(backend, target, state);
    }
}
