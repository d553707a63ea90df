//! Screen-space one-bounce indirect lighting.
//!
//! Samples come from a hemisphere table computed once per process and
//! shared by every [`SsgiPass`]; instances only rescale a prefix of it.

use std::sync::LazyLock;

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::camera::{CameraSnapshot, Viewport};
use crate::error::UmbraError;
use crate::gpu::backend::{Backend, DrawState, DrawTarget, ShaderSource};
use crate::gpu::renderable::{ComputeRenderable, UpdateOutcome};
use crate::gpu::schema::{DefineType, RenderableSchema, TextureFilter, UniformType, Value};
use crate::lighting::{Light, MAX_LIGHTS};
use crate::options::SsgiOptions;

/// Number of vectors in the shared hemisphere table.
pub const HEMISPHERE_SIZE: usize = 256;

static HEMISPHERE: LazyLock<[Vec3; HEMISPHERE_SIZE]> = LazyLock::new(|| {
    let mut rng = rand::rng();
    std::array::from_fn(|_| {
        let v = Vec3::new(
            rng.random::<f32>() * 2.0 - 1.0,
            rng.random::<f32>() * 2.0 - 1.0,
            rng.random::<f32>(),
        );
        v.normalize_or(Vec3::Z) * rng.random::<f32>()
    })
});

/// The shared hemisphere table: `z >= 0`, lengths in `[0, 1)`.
pub fn hemisphere() -> &'static [Vec3; HEMISPHERE_SIZE] {
    &HEMISPHERE
}

/// The first `n` hemisphere vectors (at most [`HEMISPHERE_SIZE`]), scaled
/// so that early samples cluster near the origin.
pub fn samples(n: usize) -> Vec<Vec3> {
    let n = n.min(HEMISPHERE_SIZE);
    hemisphere()[..n]
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let t = (i + 1) as f32 / n as f32;
            let scale = (0.1 + 0.9 * t * t).clamp(0.1, 1.0);
            *v * scale
        })
        .collect()
}

pub(crate) const SSGI_SHADER: ShaderSource = ShaderSource {
    label: "ssgi",
    imports: &["#import umbra::depth::{unpack_rgba_to_depth, is_background, outside_bounds, \
                screen_to_view, view_to_screen}"],
    fragment: include_str!("../../../assets/shaders/screen/ssgi.wgsl"),
};

pub(crate) static SSGI_SCHEMA: LazyLock<RenderableSchema> = LazyLock::new(|| {
    RenderableSchema::new()
        .texture("tDepth", TextureFilter::Nearest)
        .texture("tColor", TextureFilter::Nearest)
        .uniform("uTexSize", UniformType::Vec2)
        .uniform("uProjection", UniformType::Mat4)
        .uniform("uInvProjection", UniformType::Mat4)
        .uniform("uBounds", UniformType::Vec4)
        .uniform("uNear", UniformType::F32)
        .uniform("uFar", UniformType::F32)
        .uniform("uSamples", UniformType::Vec3Array(HEMISPHERE_SIZE))
        .uniform("uIndirectamount", UniformType::F32)
        .uniform("uNoiseamount", UniformType::F32)
        .uniform("uNoise", UniformType::Bool)
        .uniform("uBackground", UniformType::Bool)
        .uniform("uGlobalLight", UniformType::Bool)
        .uniform("uLightDistance", UniformType::F32)
        .uniform("uScale", UniformType::F32)
        .uniform("uLightDirection", UniformType::Vec3Array(MAX_LIGHTS))
        .uniform("uLightColor", UniformType::Vec3Array(MAX_LIGHTS))
        .define("dOrthographic", DefineType::Bool)
        .define("dPackedDepth", DefineType::Bool)
        .define("dNSamples", DefineType::Number)
        .define("dLightCount", DefineType::Number)
});

const INITIAL_SAMPLES: usize = 8;

/// SSGI pass. Renders into a caller-supplied target or the drawing buffer.
pub struct SsgiPass<B: Backend> {
    renderable: ComputeRenderable<B>,
}

impl<B: Backend> SsgiPass<B> {
    /// Create the pass for a `width` x `height` buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects an initial value.
    pub fn new(
        width: u32,
        height: u32,
        color: B::Texture,
        depth: B::Texture,
        packed_depth: bool,
    ) -> Result<Self, UmbraError> {
        let mut renderable = ComputeRenderable::new(
            SSGI_SHADER,
            &SSGI_SCHEMA,
            [("tDepth", depth), ("tColor", color)],
        )?;
        let initial = [
            ("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32))),
            ("uSamples", Value::Vec3Array(samples(INITIAL_SAMPLES))),
            ("dNSamples", Value::I32(INITIAL_SAMPLES as i32)),
            ("uIndirectamount", Value::F32(3.0)),
            ("uNoiseamount", Value::F32(1.0)),
            ("uLightDistance", Value::F32(10.0)),
            ("uScale", Value::F32(1.0)),
            ("uNear", Value::F32(1.0)),
            ("uFar", Value::F32(10_000.0)),
            ("dPackedDepth", Value::Bool(packed_depth)),
        ];
        for (name, value) in initial {
            renderable.set(name, value)?;
        }
        Ok(Self { renderable })
    }

    /// The underlying renderable.
    pub fn renderable(&self) -> &ComputeRenderable<B> {
        &self.renderable
    }

    /// Re-point the size uniform. The pass owns no target.
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

    /// Push camera, inputs, props and lights, then synchronize.
    ///
    /// Recompiles only when the sample count, light count or projection
    /// kind changed.
    ///
    /// # Errors
    ///
    /// Returns an error if recompilation fails.
    pub fn update(
        &mut self,
        backend: &mut B,
        camera: &CameraSnapshot,
        color: B::Texture,
        depth: B::Texture,
        props: &SsgiOptions,
        light: &Light,
    ) -> Result<UpdateOutcome, UmbraError> {
        let size = match self.renderable.get("uTexSize")? {
            Value::Vec2(size) => *size,
            _ => Vec2::ONE,
        };
        let n_samples = (props.samples as usize).clamp(1, HEMISPHERE_SIZE);
        if self
            .renderable
            .update_if_changed("dNSamples", Value::I32(n_samples as i32))?
        {
            self.renderable
                .set("uSamples", Value::Vec3Array(samples(n_samples)))?;
        }

        let count = light.count();
        let values = [
            ("tColor", Value::Texture(color)),
            ("tDepth", Value::Texture(depth)),
            ("uProjection", Value::Mat4(camera.projection)),
            ("uInvProjection", Value::Mat4(camera.inverse_projection())),
            ("uBounds", Value::Vec4(camera.viewport.bounds(size.x, size.y))),
            ("uNear", Value::F32(camera.near)),
            ("uFar", Value::F32(camera.far)),
            ("dOrthographic", Value::Bool(camera.is_orthographic())),
            ("uIndirectamount", Value::F32(props.indirect_amount)),
            ("uNoiseamount", Value::F32(props.noise_amount)),
            ("uNoise", Value::Bool(props.noise)),
            ("uBackground", Value::Bool(props.background)),
            ("uGlobalLight", Value::Bool(props.global_light)),
            ("uLightDistance", Value::F32(props.light_distance)),
            ("uScale", Value::F32(props.scale)),
            (
                "uLightDirection",
                Value::Vec3Array(light.view_directions(camera.head_rotation)),
            ),
            ("uLightColor", Value::Vec3Array(light.colors()[..count].to_vec())),
            ("dLightCount", Value::I32(count as i32)),
        ];
        for (name, value) in values {
            let _ = self.renderable.update_if_changed(name, value)?;
        }
        self.renderable.update(backend)
    }

    /// Clear to opaque black and draw, clipped to `viewport`.
    pub fn render(&mut self, backend: &mut B, viewport: Viewport, target: Option<&B::Target>) {
        let target = target.map_or(DrawTarget::DrawingBuffer, DrawTarget::Target);
        let state = DrawState::clipped(viewport).with_clear([0.0, 0.0, 0.0, 1.0]);
        self.renderable.render(backend, target, &state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::backend::RenderTarget;
    use crate::gpu::mock::{MockBackend, MockTexture};
    use crate::gpu::TextureImage;

    fn inputs(backend: &mut MockBackend) -> (MockTexture, MockTexture) {
        let color =
            backend.create_texture("color", &TextureImage::black(8, 8), TextureFilter::Nearest);
        let depth = backend.create_texture(
            "depth",
            &TextureImage::depth(8, 8, vec![0.5; 64]),
            TextureFilter::Nearest,
        );
        (color, depth)
    }

    fn camera() -> CameraSnapshot {
        CameraSnapshot::perspective(1.0, Viewport::full(8, 8), 0.1, 100.0)
    }

    #[test]
    fn hemisphere_is_shared_and_in_the_upper_half() {
        assert!(std::ptr::eq(hemisphere(), hemisphere()));
        for v in hemisphere() {
            assert!(v.z >= 0.0);
            assert!(v.length() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn samples_grow_towards_full_length() {
        let s = samples(4);
        let table = hemisphere();
        assert_eq!(s.len(), 4);
        // (1/4)^2 * 0.9 + 0.1
        assert!((s[0] - table[0] * 0.156_25).length() < 1e-6);
        assert!((s[3] - table[3]).length() < 1e-6);
        assert_eq!(samples(1000).len(), HEMISPHERE_SIZE);
    }

    #[test]
    fn sample_count_change_recompiles_once() {
        let mut backend = MockBackend::new();
        let (color, depth) = inputs(&mut backend);
        let mut pass = SsgiPass::<MockBackend>::new(8, 8, color, depth, false).unwrap();
        let light = Light::single(Vec3::Z, Vec3::ONE);
        let mut props = SsgiOptions::default();

        let _ = pass
            .update(&mut backend, &camera(), color, depth, &props, &light)
            .unwrap();
        let compiles = backend.stats().compiles;

        props.samples = 12;
        let outcome = pass
            .update(&mut backend, &camera(), color, depth, &props, &light)
            .unwrap();
        assert!(outcome.recompiled);
        assert_eq!(backend.stats().compiles, compiles + 1);
        let uploaded = match pass.renderable().get("uSamples").unwrap() {
            Value::Vec3Array(v) => v.len(),
            _ => 0,
        };
        assert_eq!(uploaded, 12);

        // same count again
        let _ = pass
            .update(&mut backend, &camera(), color, depth, &props, &light)
            .unwrap();
        assert_eq!(backend.stats().compiles, compiles + 1);
    }

    #[test]
    fn uniform_change_does_not_recompile() {
        let mut backend = MockBackend::new();
        let (color, depth) = inputs(&mut backend);
        let mut pass = SsgiPass::<MockBackend>::new(8, 8, color, depth, false).unwrap();
        let light = Light::single(Vec3::Z, Vec3::ONE);
        let mut props = SsgiOptions::default();
        let _ = pass
            .update(&mut backend, &camera(), color, depth, &props, &light)
            .unwrap();

        props.indirect_amount = 0.5;
        let outcome = pass
            .update(&mut backend, &camera(), color, depth, &props, &light)
            .unwrap();
        assert!(outcome.uploaded);
        assert!(!outcome.recompiled);
        assert_eq!(
            pass.renderable().get("uIndirectamount").unwrap().as_f32(),
            Some(0.5)
        );
    }

    #[test]
    fn render_clears_to_black_inside_viewport() {
        let mut backend = MockBackend::new();
        let (color, depth) = inputs(&mut backend);
        let target = backend.create_render_target("out", 8, 8, TextureFilter::Linear);
        let mut pass = SsgiPass::<MockBackend>::new(8, 8, color, depth, false).unwrap();
        let _ = pass
            .update(
                &mut backend,
                &camera(),
                color,
                depth,
                &SsgiOptions::default(),
                &Light::default(),
            )
            .unwrap();
        let viewport = Viewport {
            x: 2,
            y: 2,
            width: 4,
            height: 4,
        };
        pass.render(&mut backend, viewport, Some(&target));
        pass.render(&mut backend, viewport, None);

        let draws = backend.draws();
        assert_eq!(draws[0].target, Some(*target.texture()));
        assert_eq!(draws[0].state.clear, Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(draws[0].state.scissor, Some(viewport));
        assert_eq!(draws[1].target, None);
    }

    #[test]
    fn set_size_only_moves_the_uniform() {
        let mut backend = MockBackend::new();
        let (color, depth) = inputs(&mut backend);
        let mut pass = SsgiPass::<MockBackend>::new(8, 8, color, depth, false).unwrap();
        pass.set_size(32, 16).unwrap();
        assert_eq!(
            pass.renderable().get("uTexSize").unwrap(),
            &Value::Vec2(Vec2::new(32.0, 16.0))
        );
        assert_eq!(backend.stats().target_resizes, 0);
    }
}
