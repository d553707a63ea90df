//! Old-movie film look: flickering vignette, grain, scratches, sepia tint
//! and frame jolt, re-randomized at the configured frame rate.

use std::sync::LazyLock;

use glam::{Vec2, Vec4};
use rand::Rng;
use web_time::Instant;

use super::copy::CopyPass;
use crate::assets::{
    procedural_noise, AssetLoader, AssetResolver, AssetSlot, FALLBACK_SIZE, NOISE_COUNT,
};
use crate::camera::Viewport;
use crate::error::UmbraError;
use crate::gpu::backend::{Backend, DrawState, DrawTarget, RenderTarget, ShaderSource, TextureImage};
use crate::gpu::renderable::{ComputeRenderable, UpdateOutcome};
use crate::gpu::schema::{RenderableSchema, TextureFilter, UniformType, Value};
use crate::options::OldMovieOptions;

pub(crate) const OLD_MOVIE_SHADER: ShaderSource = ShaderSource {
    label: "old_movie",
    imports: &[],
    fragment: include_str!("../../../assets/shaders/screen/old_movie.wgsl"),
};

pub(crate) static OLD_MOVIE_SCHEMA: LazyLock<RenderableSchema> = LazyLock::new(|| {
    RenderableSchema::new()
        .texture("tColor", TextureFilter::Linear)
        .texture("tGrain", TextureFilter::LinearRepeat)
        .texture("tNoise", TextureFilter::Linear)
        .uniform("uTexSize", UniformType::Vec2)
        .uniform("uVignette", UniformType::Vec4)
        .uniform("uGrain", UniformType::Vec4)
        .uniform("uTint", UniformType::Vec4)
        .uniform("uJolt", UniformType::Vec2)
});

/// Texel size the grain tiling is computed against.
const GRAIN_TILE: f32 = 256.0;

/// Per-frame random state.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameState {
    frame: Option<u64>,
    flicker: f32,
    tiling: Vec4,
    jolt: Vec2,
}

/// Old-movie pass. Renders into its own target, then copies out.
pub struct OldMoviePass<B: Backend> {
    renderable: ComputeRenderable<B>,
    copy: CopyPass<B>,
    target: B::Target,
    grain: B::Texture,
    noise: Vec<B::Texture>,
    black: B::Texture,
    loader: Option<AssetLoader>,
    state: FrameState,
    started: Instant,
}

impl<B: Backend> OldMoviePass<B> {
    /// Whether the pass should run for these options.
    pub fn is_enabled(options: &OldMovieOptions) -> bool {
        options.enabled
    }

    /// Create the pass and start loading grain and noise images through
    /// `resolver`. Placeholders are used until [`OldMoviePass::poll_assets`]
    /// installs the results.
    ///
    /// # Errors
    ///
    /// Returns an error if the loader thread fails to spawn or the schema
    /// rejects an initial value.
    pub fn new(
        backend: &mut B,
        width: u32,
        height: u32,
        color: B::Texture,
        resolver: Box<dyn AssetResolver>,
    ) -> Result<Self, UmbraError> {
        let target =
            backend.create_render_target("old_movie", width, height, TextureFilter::Linear);
        let black = backend.create_texture(
            "old_movie_black",
            &TextureImage::black(FALLBACK_SIZE, FALLBACK_SIZE),
            TextureFilter::Linear,
        );
        let grain = backend.create_texture(
            "old_movie_grain",
            &procedural_noise(FALLBACK_SIZE),
            TextureFilter::LinearRepeat,
        );

        let mut renderable = ComputeRenderable::new(
            OLD_MOVIE_SHADER,
            &OLD_MOVIE_SCHEMA,
            [
                ("tColor", color),
                ("tGrain", grain.clone()),
                ("tNoise", black.clone()),
            ],
        )?;
        let state = FrameState {
            frame: None,
            flicker: 15.0,
            tiling: Vec4::new(2.0, 2.0, 0.0, 0.0),
            jolt: Vec2::ZERO,
        };
        let initial = [
            ("uTexSize", Value::Vec2(Vec2::new(width as f32, height as f32))),
            ("uVignette", Value::Vec4(Vec4::new(state.flicker, 0.15, 0.5, 0.1))),
            ("uGrain", Value::Vec4(state.tiling)),
            ("uTint", Value::Vec4(Vec4::new(0.545, 0.271, 0.075, 0.3))),
            ("uJolt", Value::Vec2(state.jolt)),
        ];
        for (name, value) in initial {
            renderable.set(name, value)?;
        }

        let copy = CopyPass::new(target.texture().clone(), width, height)?;
        let loader = AssetLoader::spawn(resolver)?;

        Ok(Self {
            renderable,
            copy,
            target,
            grain,
            noise: vec![black.clone(); NOISE_COUNT],
            black,
            loader: Some(loader),
            state,
            started: Instant::now(),
        })
    }

    /// The pass output target.
    pub fn target(&self) -> &B::Target {
        &self.target
    }

    /// The effect renderable.
    pub fn renderable(&self) -> &ComputeRenderable<B> {
        &self.renderable
    }

    /// Resize the target. No-op when the size is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects a value.
    pub fn set_size(&mut self, backend: &mut B, width: u32, height: u32) -> Result<(), UmbraError> {
        if self.target.size() == (width, height) {
            return Ok(());
        }
        backend.resize_render_target(&mut self.target, width, height);
        log::debug!("old movie target resized to {width}x{height}");
        let size = Value::Vec2(Vec2::new(width as f32, height as f32));
        let _ = self.renderable.update_if_changed("uTexSize", size)?;
        self.copy.set_size(width, height)?;
        self.copy.set_texture(self.target.texture().clone())
    }

    /// Install every asset image that finished loading. Returns how many
    /// were installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema rejects the new grain texture.
    pub fn poll_assets(&mut self, backend: &mut B) -> Result<usize, UmbraError> {
        let Some(loader) = self.loader.as_mut() else {
            return Ok(0);
        };
        let loaded = loader.poll();
        if loader.is_finished() {
            self.loader = None;
        }
        for image in &loaded {
            match image.slot {
                AssetSlot::Grain => {
                    self.grain = backend.create_texture(
                        "old_movie_grain",
                        &image.image,
                        TextureFilter::LinearRepeat,
                    );
                    let _ = self
                        .renderable
                        .update_if_changed("tGrain", Value::Texture(self.grain.clone()))?;
                }
                AssetSlot::Noise(index) => {
                    let texture = backend.create_texture(
                        "old_movie_noise",
                        &image.image,
                        TextureFilter::Linear,
                    );
                    if let Some(slot) = self.noise.get_mut(index) {
                        *slot = texture;
                    }
                }
            }
        }
        Ok(loaded.len())
    }

    /// Whether asset loading is still in progress.
    pub fn assets_pending(&self) -> bool {
        self.loader.is_some()
    }

    /// Push the input and the effect settings for the current wall-clock
    /// time, then synchronize.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    pub fn update(
        &mut self,
        backend: &mut B,
        input: B::Texture,
        props: &OldMovieOptions,
    ) -> Result<UpdateOutcome, UmbraError> {
        let seconds = self.started.elapsed().as_secs_f64();
        self.update_at(backend, input, props, seconds)
    }

    /// [`OldMoviePass::update`] at an explicit time in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    pub fn update_at(
        &mut self,
        backend: &mut B,
        input: B::Texture,
        props: &OldMovieOptions,
        seconds: f64,
    ) -> Result<UpdateOutcome, UmbraError> {
        let _ = self.poll_assets(backend)?;
        let _ = self.renderable.update_if_changed("tColor", Value::Texture(input))?;
        self.apply_settings(props, seconds)?;
        let _ = self.copy.update(backend)?;
        self.renderable.update(backend)
    }

    fn apply_settings(&mut self, props: &OldMovieOptions, seconds: f64) -> Result<(), UmbraError> {
        let frame = (seconds * f64::from(props.fps.max(1.0))).floor() as u64;
        if self.state.frame != Some(frame) {
            let mut rng = rand::rng();
            let (width, height) = self.target.size();
            self.state = FrameState {
                frame: Some(frame),
                flicker: props.flickering_range.lerp(rng.random()),
                tiling: Vec4::new(
                    width as f32 / GRAIN_TILE,
                    height as f32 / GRAIN_TILE,
                    rng.random(),
                    rng.random(),
                ),
                jolt: Vec2::new(
                    props.jolt_range.lerp(rng.random()) * props.jolt_offset[0],
                    props.jolt_range.lerp(rng.random()) * props.jolt_offset[1],
                ),
            };
            let noise = if props.noise_type == 0 || self.noise.is_empty() {
                self.black.clone()
            } else {
                self.noise[rng.random_range(0..self.noise.len())].clone()
            };
            let _ = self.renderable.update_if_changed("tNoise", Value::Texture(noise))?;
        }

        let [r, g, b] = props.tint_color;
        let values = [
            (
                "uVignette",
                Value::Vec4(Vec4::new(
                    self.state.flicker,
                    props.vignette_power,
                    props.grain_intensity,
                    props.noise_alpha,
                )),
            ),
            ("uGrain", Value::Vec4(self.state.tiling)),
            ("uTint", Value::Vec4(Vec4::new(r, g, b, props.tint_strength))),
            ("uJolt", Value::Vec2(self.state.jolt)),
        ];
        for (name, value) in values {
            let _ = self.renderable.update_if_changed(name, value)?;
        }
        Ok(())
    }

    /// Draw the effect into the pass target, then copy it to `target` or
    /// the drawing buffer. Both draws are clipped to `viewport`.
    pub fn render(&mut self, backend: &mut B, viewport: Viewport, target: Option<&B::Target>) {
        let state = DrawState::clipped(viewport);
        self.renderable
            .render(backend, DrawTarget::Target(&self.target), &state);
        let out = target.map_or(DrawTarget::DrawingBuffer, DrawTarget::Target);
        self.copy.render(backend, out, &state);
    }
}
