//! Screen-space shadow pass.
//!
//! Produces a single greyscale occlusion factor per pixel: the ratio of
//! shadow-attenuated light magnitude to total light magnitude (ambient
//! included). Two algorithms share one program, selected at runtime by
//! `uShadowMode`: a fixed-step view-space march ([`ShadowMode::Simple`]) and
//! Bend-style contact shadows ([`ShadowMode::Advanced`]).

use std::sync::LazyLock;

use glam::{Vec2, Vec3, Vec4};

use crate::camera::{CameraSnapshot, Viewport};
use crate::error::UmbraError;
use crate::gpu::backend::{Backend, DrawState, DrawTarget, RenderTarget, ShaderSource};
use crate::gpu::renderable::{ComputeRenderable, UpdateOutcome};
use crate::gpu::schema::{DefineType, RenderableSchema, TextureFilter, UniformType, Value};
use crate::lighting::{Light, MAX_LIGHTS};
use crate::options::{ShadowMode, ShadowOptions};

pub(crate) const SHADOW_SHADER: ShaderSource = ShaderSource {
    label: "shadows",
    imports: &["#import umbra::depth::{unpack_rgba_to_depth, perspective_depth_to_view_z, \
                orthographic_depth_to_view_z, is_background, outside_bounds, screen_fade, \
                screen_to_view, view_to_screen}"],
    fragment: include_str!("../../../assets/shaders/screen/shadows.wgsl"),
};

pub(crate) static SHADOW_SCHEMA: LazyLock<RenderableSchema> = LazyLock::new(|| {
    RenderableSchema::new()
        .texture("tDepth", TextureFilter::Nearest)
        .uniform("uTexSize", UniformType::Vec2)
        .uniform("uProjection", UniformType::Mat4)
        .uniform("uInvProjection", UniformType::Mat4)
        .uniform("uBounds", UniformType::Vec4)
        .uniform("uNear", UniformType::F32)
        .uniform("uFar", UniformType::F32)
        .uniform("uShadowMode", UniformType::I32)
        .uniform("uMaxDistance", UniformType::F32)
        .uniform("uTolerance", UniformType::F32)
        .uniform("uSampleCount", UniformType::I32)
        .uniform("uHardShadowSamples", UniformType::I32)
        .uniform("uFadeOutSamples", UniformType::I32)
        .uniform("uMaxPixelDistance", UniformType::F32)
        .uniform("uSurfaceThickness", UniformType::F32)
        .uniform("uBilinearThreshold", UniformType::F32)
        .uniform("uShadowContrast", UniformType::F32)
        .uniform("uIgnoreEdgePixels", UniformType::Bool)
        .uniform("uUsePrecisionOffset", UniformType::Bool)
        .uniform("uBilinearSamplingOffsetMode", UniformType::Bool)
        .uniform("uLightDirection", UniformType::Vec3Array(MAX_LIGHTS))
        .uniform("uLightColor", UniformType::Vec3Array(MAX_LIGHTS))
        .uniform("uAmbientColor", UniformType::Vec3)
        .define("dOrthographic", DefineType::Bool)
        .define("dPackedDepth", DefineType::Bool)
        .define("dSteps", DefineType::Number)
        .define("dLightCount", DefineType::Number)
});

/// Screen-space shadow pass owning its output target.
pub struct ShadowPass<B: Backend> {
    renderable: ComputeRenderable<B>,
    target: B::Target,
    viewport: Viewport,
}

impl<B: Backend> ShadowPass<B> {
    /// Whether the pass should run for these options.
    pub fn is_enabled(options: &ShadowOptions) -> bool {
        options.enabled
    }

    /// Create the pass with a `width` x `height` target, sampling `depth`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects an initial value.
    pub fn new(
        backend: &mut B,
        width: u32,
        height: u32,
        depth: B::Texture,
        packed_depth: bool,
    ) -> Result<Self, UmbraError> {
        let target = backend.create_render_target("shadows", width, height, TextureFilter::Linear);
        let mut renderable =
            ComputeRenderable::new(SHADOW_SHADER, &SHADOW_SCHEMA, [("tDepth", depth)])?;

        let initial = [
            ("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32))),
            ("uNear", Value::F32(1.0)),
            ("uFar", Value::F32(10_000.0)),
            ("uMaxDistance", Value::F32(3.0)),
            ("uTolerance", Value::F32(1.0)),
            ("uSampleCount", Value::I32(60)),
            ("uHardShadowSamples", Value::I32(4)),
            ("uFadeOutSamples", Value::I32(8)),
            ("uMaxPixelDistance", Value::F32(120.0)),
            ("uSurfaceThickness", Value::F32(0.005)),
            ("uBilinearThreshold", Value::F32(0.02)),
            ("uShadowContrast", Value::F32(4.0)),
            ("uBounds", Value::Vec4(Vec4::new(0.0, 0.0, 1.0, 1.0))),
            ("dPackedDepth", Value::Bool(packed_depth)),
            ("dSteps", Value::I32(1)),
            ("dLightCount", Value::I32(0)),
            ("uAmbientColor", Value::Vec3(Vec3::ZERO)),
        ];
        for (name, value) in initial {
            renderable.set(name, value)?;
        }

        Ok(Self {
            renderable,
            target,
            viewport: Viewport::full(width, height),
        })
    }

    /// The pass output target.
    pub fn target(&self) -> &B::Target {
        &self.target
    }

    /// The underlying renderable.
    pub fn renderable(&self) -> &ComputeRenderable<B> {
        &self.renderable
    }

    /// Resize the target. No-op when the size is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the size uniform is rejected by the schema.
    pub fn set_size(&mut self, backend: &mut B, width: u32, height: u32) -> Result<(), UmbraError> {
        if self.target.size() == (width, height) {
            return Ok(());
        }
        backend.resize_render_target(&mut self.target, width, height);
        log::debug!("shadow target resized to {width}x{height}");
        let _ = self
            .renderable
            .update_if_changed("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32)))?;
        Ok(())
    }

    /// Swap the depth input. An identical texture is not rebound.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects the value.
    pub fn set_depth_texture(
        &mut self,
        depth: B::Texture,
        packed_depth: bool,
    ) -> Result<(), UmbraError> {
        let _ = self.renderable.update_if_changed("tDepth", Value::Texture(depth))?;
        let _ = self
            .renderable
            .update_if_changed("dPackedDepth", Value::Bool(packed_depth))?;
        Ok(())
    }

    /// Recompute every per-frame value and synchronize with the GPU.
    ///
    /// Recompiles only when `dOrthographic`, `dLightCount` or `dSteps`
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns an error if recompilation fails.
    pub fn update(
        &mut self,
        backend: &mut B,
        camera: &CameraSnapshot,
        light: &Light,
        ambient: Vec3,
        mode: &ShadowMode,
    ) -> Result<UpdateOutcome, UmbraError> {
        let (width, height) = self.target.size();
        self.viewport = camera.viewport;

        let mut values: Vec<(&str, Value<B::Texture>)> = vec![
            ("uProjection", Value::Mat4(camera.projection)),
            ("uInvProjection", Value::Mat4(camera.inverse_projection())),
            (
                "uBounds",
                Value::Vec4(camera.viewport.bounds(width as f32, height as f32)),
            ),
            ("uNear", Value::F32(camera.near)),
            ("uFar", Value::F32(camera.far)),
            ("dOrthographic", Value::Bool(camera.is_orthographic())),
            ("uShadowMode", Value::I32(mode.index())),
        ];

        match mode {
            ShadowMode::Simple(p) => values.extend([
                ("uMaxDistance", Value::F32(p.max_distance * camera.scale)),
                ("uTolerance", Value::F32(p.tolerance * camera.scale)),
                ("dSteps", Value::I32(p.steps.max(1) as i32)),
            ]),
            ShadowMode::Advanced(p) => values.extend([
                ("uSampleCount", Value::I32(p.sample_count as i32)),
                ("uHardShadowSamples", Value::I32(p.hard_shadow_samples as i32)),
                ("uFadeOutSamples", Value::I32(p.fade_out_samples as i32)),
                ("uMaxPixelDistance", Value::F32(p.max_pixel_distance)),
                ("uSurfaceThickness", Value::F32(p.surface_thickness)),
                ("uBilinearThreshold", Value::F32(p.bilinear_threshold)),
                ("uShadowContrast", Value::F32(p.shadow_contrast)),
                ("uIgnoreEdgePixels", Value::Bool(p.ignore_edge_pixels)),
                ("uUsePrecisionOffset", Value::Bool(p.use_precision_offset)),
                (
                    "uBilinearSamplingOffsetMode",
                    Value::Bool(p.bilinear_sampling_offset_mode),
                ),
            ]),
        }

        let count = light.count();
        values.extend([
            (
                "uLightDirection",
                Value::Vec3Array(light.view_directions(camera.head_rotation)),
            ),
            ("uLightColor", Value::Vec3Array(light.colors()[..count].to_vec())),
            ("dLightCount", Value::I32(count as i32)),
            ("uAmbientColor", Value::Vec3(ambient)),
        ]);

        for (name, value) in values {
            let _ = self.renderable.update_if_changed(name, value)?;
        }
        self.renderable.update(backend)
    }

    /// Draw into the pass target, clipped to the last camera viewport.
    pub fn render(&mut self, backend: &mut B) {
        let state = DrawState::clipped(self.viewport).with_clear([1.0, 1.0, 1.0, 1.0]);
        self.renderable
            .render(backend, DrawTarget::Target(&self.target), &state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::MockBackend;
    use crate::gpu::TextureImage;
    use crate::options::{AdvancedShadowParams, SimpleShadowParams};

    fn pass(backend: &mut MockBackend) -> ShadowPass<MockBackend> {
        let depth = backend.create_texture(
            "depth",
            &TextureImage::depth(4, 4, vec![1.0; 16]),
            TextureFilter::Nearest,
        );
        ShadowPass::new(backend, 64, 32, depth, false).unwrap()
    }

    fn camera() -> CameraSnapshot {
        CameraSnapshot::perspective(1.0, Viewport::full(64, 32), 0.5, 50.0)
    }

    fn simple(steps: u32) -> ShadowMode {
        ShadowMode::Simple(SimpleShadowParams {
            steps,
            ..Default::default()
        })
    }

    #[test]
    fn set_size_is_idempotent() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        pass.set_size(&mut backend, 128, 64).unwrap();
        pass.set_size(&mut backend, 128, 64).unwrap();
        assert_eq!(backend.stats().target_resizes, 1);
        assert_eq!(
            pass.renderable().get("uTexSize").unwrap(),
            &Value::Vec2(Vec2::new(128.0, 64.0))
        );

        pass.set_size(&mut backend, 64, 32).unwrap();
        assert_eq!(backend.stats().target_resizes, 2);
    }

    #[test]
    fn recompiles_only_on_define_changes() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let light = Light::single(Vec3::Z, Vec3::ONE);

        let first = pass
            .update(&mut backend, &camera(), &light, Vec3::splat(0.2), &simple(1))
            .unwrap();
        assert!(first.recompiled);

        // same frame again: nothing to do
        let again = pass
            .update(&mut backend, &camera(), &light, Vec3::splat(0.2), &simple(1))
            .unwrap();
        assert_eq!(again, UpdateOutcome::default());

        // uniform-only change
        let ambient = pass
            .update(&mut backend, &camera(), &light, Vec3::splat(0.4), &simple(1))
            .unwrap();
        assert!(ambient.uploaded && !ambient.recompiled);

        // step count is a define
        assert!(pass
            .update(&mut backend, &camera(), &light, Vec3::splat(0.4), &simple(4))
            .unwrap()
            .recompiled);

        // projection kind is a define
        let ortho = CameraSnapshot::orthographic(5.0, Viewport::full(64, 32), 0.5, 50.0);
        assert!(pass
            .update(&mut backend, &ortho, &light, Vec3::splat(0.4), &simple(4))
            .unwrap()
            .recompiled);

        // light count is a define
        let two = Light::new(vec![Vec3::Z, Vec3::X], vec![Vec3::ONE; 2]).unwrap();
        assert!(pass
            .update(&mut backend, &ortho, &two, Vec3::splat(0.4), &simple(4))
            .unwrap()
            .recompiled);
        assert_eq!(pass.renderable().compile_count(), 4);
    }

    #[test]
    fn simple_distances_scale_with_camera() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let light = Light::single(Vec3::Z, Vec3::ONE);
        let cam = camera().with_scale(2.5);
        let _ = pass
            .update(&mut backend, &cam, &light, Vec3::ZERO, &simple(1))
            .unwrap();
        let r = pass.renderable();
        assert_eq!(r.get("uMaxDistance").unwrap().as_f32(), Some(7.5));
        assert_eq!(r.get("uTolerance").unwrap().as_f32(), Some(2.5));
        assert_eq!(r.get("uShadowMode").unwrap().as_i32(), Some(0));
    }

    #[test]
    fn advanced_mode_pushes_its_parameters() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let light = Light::single(Vec3::Z, Vec3::ONE);
        let mode = ShadowMode::Advanced(AdvancedShadowParams {
            sample_count: 12,
            ignore_edge_pixels: true,
            ..Default::default()
        });
        let outcome = pass
            .update(&mut backend, &camera(), &light, Vec3::ZERO, &mode)
            .unwrap();
        assert!(outcome.uploaded);
        let r = pass.renderable();
        assert_eq!(r.get("uShadowMode").unwrap().as_i32(), Some(1));
        assert_eq!(r.get("uSampleCount").unwrap().as_i32(), Some(12));
        assert_eq!(r.get("uIgnoreEdgePixels").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn head_rotation_rotates_light_directions() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let light = Light::single(Vec3::X, Vec3::ONE);
        let rot = glam::Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let cam = camera().with_head_rotation(rot);
        let _ = pass
            .update(&mut backend, &cam, &light, Vec3::ZERO, &simple(1))
            .unwrap();
        let dirs = match pass.renderable().get("uLightDirection").unwrap() {
            Value::Vec3Array(dirs) => dirs.clone(),
            _ => Vec::new(),
        };
        assert_eq!(dirs.len(), 1);
        assert!((dirs[0] - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn render_draws_into_own_target_clipped_to_viewport() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let viewport = Viewport {
            x: 8,
            y: 4,
            width: 32,
            height: 16,
        };
        let cam = CameraSnapshot::perspective(1.0, viewport, 0.5, 50.0);
        let _ = pass
            .update(&mut backend, &cam, &Light::default(), Vec3::ONE, &simple(1))
            .unwrap();
        pass.render(&mut backend);

        let draw = &backend.draws()[0];
        assert_eq!(draw.label, "shadows");
        assert_eq!(draw.target, Some(*pass.target().texture()));
        assert_eq!(draw.state.scissor, Some(viewport));
        assert_eq!(draw.state.viewport, Some(viewport));
    }

    #[test]
    fn unchanged_depth_texture_is_not_rebound() {
        let mut backend = MockBackend::new();
        let depth = backend.create_texture(
            "depth",
            &TextureImage::depth(4, 4, vec![1.0; 16]),
            TextureFilter::Nearest,
        );
        let mut pass = ShadowPass::new(&mut backend, 64, 32, depth, false).unwrap();
        let light = Light::single(Vec3::Z, Vec3::ONE);
        let _ = pass
            .update(&mut backend, &camera(), &light, Vec3::ZERO, &simple(1))
            .unwrap();

        pass.set_depth_texture(depth, false).unwrap();
        let outcome = pass
            .update(&mut backend, &camera(), &light, Vec3::ZERO, &simple(1))
            .unwrap();
        assert!(!outcome.rebound);
    }
}
