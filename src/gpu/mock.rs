//! In-memory [`Backend`] that records calls instead of touching a GPU.

use super::backend::{
    Backend, DrawState, DrawTarget, RenderTarget, ShaderSource, TextureImage,
};
use super::schema::{DefineValue, RenderableSchema, TextureFilter};
use crate::error::UmbraError;

/// Texture handle: a unique id plus the size it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTexture {
    /// Unique id.
    pub id: u64,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

/// Render target whose texture is replaced on every resize.
#[derive(Debug)]
pub struct MockTarget {
    texture: MockTexture,
}

impl RenderTarget for MockTarget {
    type Texture = MockTexture;

    fn texture(&self) -> &MockTexture {
        &self.texture
    }

    fn size(&self) -> (u32, u32) {
        (self.texture.width, self.texture.height)
    }
}

/// Program: what was compiled, uploaded and bound.
#[derive(Debug)]
pub struct MockProgram {
    /// Source label.
    pub label: &'static str,
    /// Defines the program was compiled with.
    pub defines: Vec<(&'static str, DefineValue)>,
    /// Last uploaded uniform block.
    pub uniforms: Vec<u8>,
    /// Currently bound textures.
    pub textures: Vec<MockTexture>,
}

/// Call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Program compilations.
    pub compiles: usize,
    /// Uniform block uploads.
    pub uniform_uploads: usize,
    /// Texture rebinds.
    pub texture_binds: usize,
    /// Draw calls.
    pub draws: usize,
    /// Render target resizes.
    pub target_resizes: usize,
    /// Textures created (including render target textures).
    pub textures_created: usize,
}

/// One recorded draw.
#[derive(Debug, Clone, PartialEq)]
pub struct MockDraw {
    /// Label of the program drawn.
    pub label: &'static str,
    /// Texture of the destination target; `None` for the drawing buffer.
    pub target: Option<MockTexture>,
    /// Fixed-function state of the draw.
    pub state: DrawState,
}

/// Recording backend.
#[derive(Debug)]
pub struct MockBackend {
    next_id: u64,
    pixel_ratio: f32,
    stats: MockStats,
    draws: Vec<MockDraw>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend with pixel ratio 1.
    pub fn new() -> Self {
        Self::with_pixel_ratio(1.0)
    }

    /// Backend with the given device pixel ratio.
    pub fn with_pixel_ratio(pixel_ratio: f32) -> Self {
        Self {
            next_id: 1,
            pixel_ratio,
            stats: MockStats::default(),
            draws: Vec::new(),
        }
    }

    /// Call counters so far.
    pub fn stats(&self) -> MockStats {
        self.stats
    }

    /// Draws in issue order.
    pub fn draws(&self) -> &[MockDraw] {
        &self.draws
    }

    fn texture(&mut self, width: u32, height: u32) -> MockTexture {
        let id = self.next_id;
        self.next_id += 1;
        self.stats.textures_created += 1;
        MockTexture { id, width, height }
    }
}

impl Backend for MockBackend {
    type Texture = MockTexture;
    type Target = MockTarget;
    type Program = MockProgram;

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn create_render_target(
        &mut self,
        _label: &str,
        width: u32,
        height: u32,
        _filter: TextureFilter,
    ) -> MockTarget {
        MockTarget {
            texture: self.texture(width, height),
        }
    }

    fn resize_render_target(
        &mut self,
        target: &mut MockTarget,
        width: u32,
        height: u32,
    ) {
        self.stats.target_resizes += 1;
        target.texture = self.texture(width, height);
    }

    fn create_texture(
        &mut self,
        _label: &str,
        image: &TextureImage,
        _filter: TextureFilter,
    ) -> MockTexture {
        self.texture(image.width, image.height)
    }

    fn compile_program(
        &mut self,
        source: &ShaderSource,
        _schema: &RenderableSchema,
        defines: &[(&'static str, DefineValue)],
    ) -> Result<MockProgram, UmbraError> {
        self.stats.compiles += 1;
        Ok(MockProgram {
            label: source.label,
            defines: defines.to_vec(),
            uniforms: Vec::new(),
            textures: Vec::new(),
        })
    }

    fn write_uniforms(&mut self, program: &mut MockProgram, bytes: &[u8]) {
        self.stats.uniform_uploads += 1;
        program.uniforms = bytes.to_vec();
    }

    fn bind_textures(
        &mut self,
        program: &mut MockProgram,
        textures: &[MockTexture],
    ) {
        self.stats.texture_binds += 1;
        program.textures = textures.to_vec();
    }

    fn draw(
        &mut self,
        program: &mut MockProgram,
        target: DrawTarget<'_, MockTarget>,
        state: &DrawState,
    ) {
        self.stats.draws += 1;
        self.draws.push(MockDraw {
            label: program.label,
            target: match target {
                DrawTarget::Target(t) => Some(t.texture),
                DrawTarget::DrawingBuffer => None,
            },
            state: *state,
        });
    }
}
