use glam::Vec3;

use super::copy::CopyPass;
use super::old_movie::OldMoviePass;
use super::postprocessing::PostprocessingPass;
use super::shadow::ShadowPass;
use super::ssgi::SsgiPass;
use crate::assets::AssetResolver;
use crate::camera::CameraSnapshot;
use crate::error::UmbraError;
use crate::gpu::backend::{Backend, DrawState, DrawTarget, RenderTarget};
use crate::gpu::schema::TextureFilter;
use crate::lighting::Light;
use crate::options::Options;

/// Per-frame inputs of the stack. Textures are borrowed for the frame.
pub struct FrameInputs<'a, B: Backend> {
    /// Camera snapshot of the frame.
    pub camera: &'a CameraSnapshot,
    /// Directional lights in view space.
    pub light: &'a Light,
    /// Ambient light color.
    pub ambient: Vec3,
    /// Scene color.
    pub color: B::Texture,
    /// Scene depth.
    pub depth: B::Texture,
    /// Whether `depth` is RGBA-packed.
    pub packed_depth: bool,
}

/// Which passes ran in a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassesRun {
    /// Shadow pass (into its own target).
    pub shadow: bool,
    /// Indirect lighting.
    pub ssgi: bool,
    /// Combined occlusion/outline/hash pass.
    pub postprocessing: bool,
    /// Film look.
    pub old_movie: bool,
}

/// Owns every screen-space pass and runs them in the fixed order
/// shadow, SSGI, postprocessing, old movie. Disabled passes are skipped;
/// the last enabled color pass writes to the drawing buffer. The shadow
/// factor stays in [`PostProcessStack::shadow_target`] for the caller to
/// composite.
pub struct PostProcessStack<B: Backend> {
    shadow: ShadowPass<B>,
    ssgi: SsgiPass<B>,
    ssgi_target: B::Target,
    postprocessing: PostprocessingPass<B>,
    old_movie: OldMoviePass<B>,
    copy: CopyPass<B>,
}

impl<B: Backend> PostProcessStack<B> {
    /// Build every pass for a `width` x `height` drawing buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass fails to initialize.
    pub fn new(
        backend: &mut B,
        width: u32,
        height: u32,
        color: &B::Texture,
        depth: &B::Texture,
        packed_depth: bool,
        resolver: Box<dyn AssetResolver>,
    ) -> Result<Self, UmbraError> {
        let shadow = ShadowPass::new(backend, width, height, depth.clone(), packed_depth)?;
        let ssgi = SsgiPass::new(width, height, color.clone(), depth.clone(), packed_depth)?;
        let ssgi_target =
            backend.create_render_target("ssgi", width, height, TextureFilter::Linear);
        let postprocessing = PostprocessingPass::new(
            backend,
            width,
            height,
            color.clone(),
            depth.clone(),
            packed_depth,
        )?;
        let old_movie = OldMoviePass::new(backend, width, height, color.clone(), resolver)?;
        let copy = CopyPass::new(color.clone(), width, height)?;
        log::debug!("post-process stack created at {width}x{height}");
        Ok(Self {
            shadow,
            ssgi,
            ssgi_target,
            postprocessing,
            old_movie,
            copy,
        })
    }

    /// Shadow factor of the last frame.
    pub fn shadow_target(&self) -> &B::Target {
        self.shadow.target()
    }

    /// The shadow pass.
    pub fn shadow(&self) -> &ShadowPass<B> {
        &self.shadow
    }

    /// The SSGI pass.
    pub fn ssgi(&self) -> &SsgiPass<B> {
        &self.ssgi
    }

    /// The postprocessing pass.
    pub fn postprocessing(&self) -> &PostprocessingPass<B> {
        &self.postprocessing
    }

    /// The old-movie pass.
    pub fn old_movie(&self) -> &OldMoviePass<B> {
        &self.old_movie
    }

    /// Propagate a drawing-buffer resize to every pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass rejects the new size.
    pub fn set_size(&mut self, backend: &mut B, width: u32, height: u32) -> Result<(), UmbraError> {
        self.shadow.set_size(backend, width, height)?;
        self.ssgi.set_size(width, height)?;
        if self.ssgi_target.size() != (width, height) {
            backend.resize_render_target(&mut self.ssgi_target, width, height);
        }
        self.postprocessing.set_size(backend, width, height)?;
        self.old_movie.set_size(backend, width, height)?;
        self.copy.set_size(width, height)
    }

    /// Run one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass fails to update.
    pub fn render(
        &mut self,
        backend: &mut B,
        frame: &FrameInputs<'_, B>,
        options: &Options,
    ) -> Result<PassesRun, UmbraError> {
        let viewport = frame.camera.viewport;
        let run = PassesRun {
            shadow: ShadowPass::<B>::is_enabled(&options.shadow),
            ssgi: options.ssgi.enabled,
            postprocessing: options.postprocessing.enabled(),
            old_movie: OldMoviePass::<B>::is_enabled(&options.old_movie),
        };

        if run.shadow {
            self.shadow
                .set_depth_texture(frame.depth.clone(), frame.packed_depth)?;
            let _ = self.shadow.update(
                backend,
                frame.camera,
                frame.light,
                frame.ambient,
                &options.shadow.mode,
            )?;
            self.shadow.render(backend);
        }

        let mut current = frame.color.clone();

        if run.ssgi {
            let last = !run.postprocessing && !run.old_movie;
            let _ = self.ssgi.update(
                backend,
                frame.camera,
                current.clone(),
                frame.depth.clone(),
                &options.ssgi,
                frame.light,
            )?;
            if last {
                self.ssgi.render(backend, viewport, None);
            } else {
                self.ssgi.render(backend, viewport, Some(&self.ssgi_target));
                current = self.ssgi_target.texture().clone();
            }
        }

        if run.postprocessing {
            let last = !run.old_movie;
            self.postprocessing
                .apply_props(backend, &options.postprocessing)?;
            self.postprocessing
                .set_inputs(current.clone(), frame.depth.clone(), frame.packed_depth)?;
            let _ = self.postprocessing.update(backend)?;
            self.postprocessing.render(backend, last);
            if !last {
                current = self.postprocessing.target().texture().clone();
            }
        }

        if run.old_movie {
            let _ = self
                .old_movie
                .update(backend, current, &options.old_movie)?;
            self.old_movie.render(backend, viewport, None);
        } else if !run.ssgi && !run.postprocessing {
            self.copy.set_texture(current)?;
            let _ = self.copy.update(backend)?;
            self.copy
                .render(backend, DrawTarget::DrawingBuffer, &DrawState::clipped(viewport));
        }

        Ok(run)
    }
}
