//! Combined screen-space effects pass: kernel occlusion, ring SSAO,
//! hash/engraving shading and depth outlines, each toggled by a define.
//!
//! The shader interface comes from [`PARAMS_MAPPING`]; this module only
//! moves prop values into the slots the table names.

use glam::Vec2;

use super::params_mapping::{find_param, postprocessing_schema, PARAMS_MAPPING};
use crate::error::UmbraError;
use crate::gpu::backend::{Backend, DrawState, DrawTarget, RenderTarget, ShaderSource};
use crate::gpu::renderable::{ComputeRenderable, UpdateOutcome};
use crate::gpu::schema::{TextureFilter, Value};
use crate::options::postprocessing::validate_param;
use crate::options::{ParamValue, PostprocessingProps};

pub(crate) const POSTPROCESSING_SHADER: ShaderSource = ShaderSource {
    label: "postprocessing",
    imports: &["#import umbra::depth::unpack_rgba_to_depth"],
    fragment: include_str!("../../../assets/shaders/screen/postprocessing.wgsl"),
};

/// Parameter whose value is in CSS pixels and scaled by the pixel ratio.
const PIXEL_SCALED_PARAM: &str = "outlineScale";

/// Postprocessing pass owning its output target.
pub struct PostprocessingPass<B: Backend> {
    renderable: ComputeRenderable<B>,
    target: B::Target,
    props: PostprocessingProps,
}

impl<B: Backend> PostprocessingPass<B> {
    /// Create the pass reading `color` and `depth`, with default props.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects an initial value.
    pub fn new(
        backend: &mut B,
        width: u32,
        height: u32,
        color: B::Texture,
        depth: B::Texture,
        packed_depth: bool,
    ) -> Result<Self, UmbraError> {
        let target =
            backend.create_render_target("postprocessing", width, height, TextureFilter::Linear);
        let mut renderable = ComputeRenderable::new(
            POSTPROCESSING_SHADER,
            postprocessing_schema(),
            [("tColor", color), ("tDepth", depth)],
        )?;
        renderable.set(
            "uTexSize",
            Value::Vec2(Vec2::new(width as f32, height as f32)),
        )?;
        renderable.set("dPackedDepth", Value::Bool(packed_depth))?;

        let mut pass = Self {
            renderable,
            target,
            props: PostprocessingProps::default(),
        };
        let defaults: Vec<_> = PARAMS_MAPPING
            .iter()
            .map(|row| (row.name, row.default))
            .collect();
        pass.set_props(backend, &defaults)?;
        Ok(pass)
    }

    /// The pass output target.
    pub fn target(&self) -> &B::Target {
        &self.target
    }

    /// The underlying renderable.
    pub fn renderable(&self) -> &ComputeRenderable<B> {
        &self.renderable
    }

    /// Current props.
    pub fn props(&self) -> &PostprocessingProps {
        &self.props
    }

    /// Whether any effect is switched on. Callers skip the pass otherwise.
    pub fn enabled(&self) -> bool {
        self.props.enabled()
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
        log::debug!("postprocessing target resized to {width}x{height}");
        let _ = self
            .renderable
            .update_if_changed("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32)))?;
        Ok(())
    }

    /// Swap the borrowed inputs. Unchanged textures are not rebound.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects a value.
    pub fn set_inputs(
        &mut self,
        color: B::Texture,
        depth: B::Texture,
        packed_depth: bool,
    ) -> Result<(), UmbraError> {
        let _ = self.renderable.update_if_changed("tColor", Value::Texture(color))?;
        let _ = self.renderable.update_if_changed("tDepth", Value::Texture(depth))?;
        let _ = self
            .renderable
            .update_if_changed("dPackedDepth", Value::Bool(packed_depth))?;
        Ok(())
    }

    /// Push a partial prop set into the shader slots.
    ///
    /// Every entry is validated before any is applied, so a rejected call
    /// leaves the pass untouched. `outlineScale` is multiplied by the
    /// backend pixel ratio.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::UnknownParam`] for names missing from the
    /// parameter table and [`UmbraError::ParamType`] for values of the wrong
    /// kind.
    pub fn set_props(
        &mut self,
        backend: &B,
        partial: &[(&str, ParamValue)],
    ) -> Result<(), UmbraError> {
        for (name, value) in partial {
            validate_param(name, *value)?;
        }
        let pixel_ratio = f64::from(backend.pixel_ratio());
        for (name, value) in partial {
            let Some(row) = find_param(name) else {
                continue;
            };
            self.props.set(name, *value)?;
            let value = match *value {
                ParamValue::Number(n) if row.name == PIXEL_SCALED_PARAM => {
                    ParamValue::Number(n * pixel_ratio)
                }
                other => other,
            };
            if let Some(slot_value) = row.slot_value(value) {
                let _ = self.renderable.update_if_changed(row.slot, slot_value)?;
            }
        }
        Ok(())
    }

    /// Replace every prop with `props`.
    ///
    /// # Errors
    ///
    /// See [`PostprocessingPass::set_props`].
    pub fn apply_props(
        &mut self,
        backend: &B,
        props: &PostprocessingProps,
    ) -> Result<(), UmbraError> {
        let entries: Vec<_> = props.iter().collect();
        self.set_props(backend, &entries)
    }

    /// Synchronize dirty values with the GPU.
    ///
    /// # Errors
    ///
    /// Returns an error if recompilation fails.
    pub fn update(&mut self, backend: &mut B) -> Result<UpdateOutcome, UmbraError> {
        self.renderable.update(backend)
    }

    /// Draw into the drawing buffer or the pass target, covering it fully.
    pub fn render(&mut self, backend: &mut B, to_drawing_buffer: bool) {
        let target = if to_drawing_buffer {
            DrawTarget::DrawingBuffer
        } else {
            DrawTarget::Target(&self.target)
        };
        self.renderable.render(backend, target, &DrawState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::{MockBackend, MockTexture};
    use crate::gpu::TextureImage;

    fn inputs(backend: &mut MockBackend) -> (MockTexture, MockTexture) {
        let color =
            backend.create_texture("color", &TextureImage::black(8, 8), TextureFilter::Nearest);
        let depth = backend.create_texture(
            "depth",
            &TextureImage::depth(8, 8, vec![1.0; 64]),
            TextureFilter::Nearest,
        );
        (color, depth)
    }

    fn pass(backend: &mut MockBackend) -> PostprocessingPass<MockBackend> {
        let (color, depth) = inputs(backend);
        PostprocessingPass::new(backend, 8, 8, color, depth, false).unwrap()
    }

    #[test]
    fn defaults_land_in_slots() {
        let mut backend = MockBackend::new();
        let pass = pass(&mut backend);
        let r = pass.renderable();
        assert_eq!(r.get("uOcclusionBias").unwrap().as_f32(), Some(0.5));
        assert_eq!(r.get("dssao_rings").unwrap().as_i32(), Some(6));
        assert_eq!(r.get("dOutlineEnable").unwrap().as_bool(), Some(false));
        assert!(!pass.enabled());
    }

    #[test]
    fn set_props_round_trips_through_slots() {
        let mut backend = MockBackend::with_pixel_ratio(2.0);
        let mut pass = pass(&mut backend);
        let input = [
            ("outlineEnable", ParamValue::Bool(true)),
            ("outlineScale", ParamValue::Number(3.0)),
            ("outlineThreshold", ParamValue::Number(0.25)),
            ("occlusionKernelSize", ParamValue::Number(7.0)),
            ("ssao_aoCap", ParamValue::Number(2.5)),
        ];
        pass.set_props(&backend, &input).unwrap();

        let r = pass.renderable();
        assert_eq!(r.get("dOutlineEnable").unwrap().as_bool(), Some(true));
        assert_eq!(r.get("uOutlineScale").unwrap().as_f32(), Some(3.0 * 2.0));
        assert_eq!(r.get("uOutlineThreshold").unwrap().as_f32(), Some(0.25));
        assert_eq!(r.get("dOcclusionKernelSize").unwrap().as_i32(), Some(7));
        assert_eq!(r.get("ussao_aoCap").unwrap().as_f32(), Some(2.5));
        // props keep the unscaled value
        assert_eq!(pass.props().number("outlineScale"), Some(3.0));
        assert!(pass.enabled());
    }

    #[test]
    fn rejected_props_leave_the_pass_untouched() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let before = pass.props().clone();
        let err = pass
            .set_props(
                &backend,
                &[
                    ("outlineEnable", ParamValue::Bool(true)),
                    ("glowRadius", ParamValue::Number(1.0)),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, UmbraError::UnknownParam(name) if name == "glowRadius"));
        assert_eq!(pass.props(), &before);
        assert_eq!(
            pass.renderable().get("dOutlineEnable").unwrap().as_bool(),
            Some(false)
        );
    }

    #[test]
    fn toggles_recompile_and_floats_upload() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let _ = pass.update(&mut backend).unwrap();

        pass.set_props(&backend, &[("occlusionBias", ParamValue::Number(0.7))])
            .unwrap();
        let outcome = pass.update(&mut backend).unwrap();
        assert!(outcome.uploaded && !outcome.recompiled);

        pass.set_props(&backend, &[("hashEnable", ParamValue::Bool(true))])
            .unwrap();
        assert!(pass.update(&mut backend).unwrap().recompiled);
        assert_eq!(backend.stats().compiles, 2);
    }

    #[test]
    fn set_size_is_idempotent() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        pass.set_size(&mut backend, 8, 8).unwrap();
        assert_eq!(backend.stats().target_resizes, 0);
        pass.set_size(&mut backend, 16, 12).unwrap();
        pass.set_size(&mut backend, 16, 12).unwrap();
        assert_eq!(backend.stats().target_resizes, 1);
        assert_eq!(pass.target().size(), (16, 12));
    }

    #[test]
    fn render_targets_drawing_buffer_or_own_target() {
        let mut backend = MockBackend::new();
        let mut pass = pass(&mut backend);
        let _ = pass.update(&mut backend).unwrap();
        pass.render(&mut backend, true);
        pass.render(&mut backend, false);
        let draws = backend.draws();
        assert_eq!(draws[0].target, None);
        assert_eq!(draws[1].target, Some(*pass.target().texture()));
        assert_eq!(draws[0].state.scissor, None);
    }
}
