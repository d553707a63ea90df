//! GPU layer: change-tracked values, renderable schemas, the backend
//! protocol and its wgpu implementation.

/// Narrow GPU protocol consumed by the passes.
pub mod backend;
/// Recording backend used by unit tests.
#[cfg(test)]
pub(crate) mod mock;
/// Shared wgpu boilerplate helpers for full-screen pass pipelines.
pub mod pipeline_helpers;
/// Headless and embedded wgpu device setup.
pub mod render_context;
/// Schema-described full-screen programs.
pub mod renderable;
/// Renderable schemas, slot values and WGSL interface generation.
pub mod schema;
/// WGSL shader composition with `#import` and define support via naga-oil.
pub mod shader_composer;
/// wgpu texture handles and render targets.
pub mod texture;
/// Change-tracked value container.
pub mod value_cell;
/// [`backend::Backend`] implementation on wgpu.
pub mod wgpu_backend;

pub use backend::{
    Backend, DrawState, DrawTarget, RenderTarget, ShaderSource, TexelData,
    TextureImage,
};
pub use renderable::{ComputeRenderable, UpdateOutcome};
pub use schema::{
    DefineType, DefineValue, RenderableSchema, RenderableValues, SlotKind,
    TextureFilter, UniformType, Value,
};
pub use value_cell::ValueCell;
pub use wgpu_backend::WgpuBackend;
