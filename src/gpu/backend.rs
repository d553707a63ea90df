//! Narrow GPU protocol consumed by the passes.
//!
//! Passes never touch raw GPU objects. They create render targets and
//! textures, compile schema-described programs and issue full-screen draws
//! through a [`Backend`]. [`super::wgpu_backend::WgpuBackend`] implements it
//! on wgpu; tests use an in-memory mock.

use std::fmt::Debug;

use super::schema::{DefineValue, RenderableSchema, TextureFilter};
use crate::camera::Viewport;
use crate::error::UmbraError;

/// Fragment program source of a full-screen pass.
///
/// The final shader is `imports` + the interface generated from the schema
/// + `fragment`, which must define `fs_main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSource {
    /// Human-readable label, also used as the virtual file path.
    pub label: &'static str,
    /// `#import` lines of shared WGSL modules.
    pub imports: &'static [&'static str],
    /// Fragment stage source.
    pub fragment: &'static str,
}

impl ShaderSource {
    /// Assemble the complete WGSL source for `schema`.
    pub fn assemble(&self, schema: &RenderableSchema) -> String {
        let mut source = String::new();
        for line in self.imports {
            source.push_str(line);
            source.push('\n');
        }
        source.push('\n');
        source.push_str(&schema.wgsl_interface());
        source.push('\n');
        source.push_str(self.fragment);
        source
    }
}

/// CPU-side texel data for texture creation.
#[derive(Debug, Clone, PartialEq)]
pub enum TexelData {
    /// 8-bit RGBA, row-major, 4 bytes per texel.
    Rgba8(Vec<u8>),
    /// Single-channel float depth, row-major.
    Depth(Vec<f32>),
}

/// A 2D image to upload as a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel payload.
    pub data: TexelData,
}

impl TextureImage {
    /// RGBA8 image.
    #[must_use]
    pub fn rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: TexelData::Rgba8(data),
        }
    }

    /// Transparent black RGBA8 image.
    #[must_use]
    pub fn black(width: u32, height: u32) -> Self {
        Self::rgba8(width, height, vec![0; (width * height * 4) as usize])
    }

    /// Single-channel depth image.
    #[must_use]
    pub fn depth(width: u32, height: u32, data: Vec<f32>) -> Self {
        Self {
            width,
            height,
            data: TexelData::Depth(data),
        }
    }
}

/// An owned off-screen render target.
pub trait RenderTarget {
    /// Texture handle type of the owning backend.
    type Texture;

    /// Color texture the target renders into.
    fn texture(&self) -> &Self::Texture;

    /// Current size in pixels.
    fn size(&self) -> (u32, u32);
}

/// Where a draw writes.
#[derive(Debug)]
pub enum DrawTarget<'a, T> {
    /// An owned render target.
    Target(&'a T),
    /// The drawing buffer (swapchain or externally supplied output view).
    DrawingBuffer,
}

impl<T> Clone for DrawTarget<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DrawTarget<'_, T> {}

/// Fixed-function state of a full-screen draw. Blending and depth testing
/// are always disabled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawState {
    /// Viewport rectangle; `None` covers the whole target.
    pub viewport: Option<Viewport>,
    /// Scissor rectangle; `None` disables the scissor test.
    pub scissor: Option<Viewport>,
    /// Clear color applied before drawing; `None` loads existing contents.
    pub clear: Option<[f64; 4]>,
}

impl DrawState {
    /// Clip both viewport and scissor to `viewport`.
    #[must_use]
    pub fn clipped(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
            scissor: Some(viewport),
            clear: None,
        }
    }

    /// Builder-style setter for the clear color.
    #[must_use]
    pub fn with_clear(mut self, color: [f64; 4]) -> Self {
        self.clear = Some(color);
        self
    }
}

/// GPU resource and draw protocol.
pub trait Backend {
    /// Texture handle. Equality is identity: two handles compare equal iff
    /// they refer to the same GPU texture.
    type Texture: Clone + PartialEq + Debug;
    /// Owned render target.
    type Target: RenderTarget<Texture = Self::Texture>;
    /// Compiled program with its uniform buffer and bindings.
    type Program;

    /// Device pixel ratio of the drawing buffer.
    fn pixel_ratio(&self) -> f32;

    /// Create an RGBA render target.
    fn create_render_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        filter: TextureFilter,
    ) -> Self::Target;

    /// Resize `target` in place. The target's texture handle may change.
    fn resize_render_target(
        &mut self,
        target: &mut Self::Target,
        width: u32,
        height: u32,
    );

    /// Upload an image as a sampled texture.
    fn create_texture(
        &mut self,
        label: &str,
        image: &TextureImage,
        filter: TextureFilter,
    ) -> Self::Texture;

    /// Compile `source` against `schema` with the given shader defines.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Shader`] if composition or validation fails.
    fn compile_program(
        &mut self,
        source: &ShaderSource,
        schema: &RenderableSchema,
        defines: &[(&'static str, DefineValue)],
    ) -> Result<Self::Program, UmbraError>;

    /// Upload the packed uniform block.
    fn write_uniforms(&mut self, program: &mut Self::Program, bytes: &[u8]);

    /// Bind textures in schema order.
    fn bind_textures(
        &mut self,
        program: &mut Self::Program,
        textures: &[Self::Texture],
    );

    /// Issue the full-screen triangle draw.
    fn draw(
        &mut self,
        program: &mut Self::Program,
        target: DrawTarget<'_, Self::Target>,
        state: &DrawState,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::schema::UniformType;

    #[test]
    fn assembled_source_orders_imports_interface_fragment() {
        let source = ShaderSource {
            label: "test",
            imports: &["#import umbra::depth::perspective_depth_to_view_z"],
            fragment: "@fragment\n\
                fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(u.uValue); }\n",
        };
        let schema = RenderableSchema::new().uniform("uValue", UniformType::F32);
        let wgsl = source.assemble(&schema);
        let import = wgsl.find("#import").unwrap();
        let uniforms = wgsl.find("struct Uniforms").unwrap();
        let fragment = wgsl.find("fn fs_main").unwrap();
        assert!(import < uniforms && uniforms < fragment);
    }
}
