//! Screen-space post-process passes.
//!
//! Provides contact shadows, indirect lighting (SSGI), the combined
//! occlusion/outline/hash pass and an old-film look, plus the stack that
//! runs them in order.

pub mod copy;
pub mod old_movie;
pub mod params_mapping;
pub mod post_process;
pub mod postprocessing;
pub mod shadow;
pub mod ssgi;

use crate::gpu::backend::ShaderSource;
use crate::gpu::schema::RenderableSchema;

/// Every shader program with the schema it is compiled against.
pub fn shader_programs() -> Vec<(ShaderSource, RenderableSchema)> {
    vec![
        (shadow::SHADOW_SHADER, shadow::SHADOW_SCHEMA.clone()),
        (
            postprocessing::POSTPROCESSING_SHADER,
            params_mapping::postprocessing_schema().clone(),
        ),
        (ssgi::SSGI_SHADER, ssgi::SSGI_SCHEMA.clone()),
        (old_movie::OLD_MOVIE_SHADER, old_movie::OLD_MOVIE_SCHEMA.clone()),
        (copy::COPY_SHADER, copy::COPY_SCHEMA.clone()),
    ]
}
