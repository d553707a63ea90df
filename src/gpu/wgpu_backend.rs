//! [`Backend`] implementation on wgpu.
//!
//! Draws are recorded into one command encoder that is submitted by
//! [`WgpuBackend::flush`]. Uniform writes go through the queue and take
//! effect at the next submission, so every program is expected to be drawn
//! at most once per flush.

use rustc_hash::FxHashMap;

use super::backend::{
    Backend, DrawState, DrawTarget, RenderTarget, ShaderSource, TexelData,
    TextureImage,
};
use super::pipeline_helpers::{
    create_screen_space_pipeline, sampler_for, texture_slot, uniform_buffer,
};
use super::render_context::RenderContext;
use super::schema::{DefineValue, RenderableSchema, TextureFilter};
use super::shader_composer::ShaderComposer;
use super::texture::{GpuTexture, WgpuTarget, TARGET_FORMAT};
use crate::camera::Viewport;
use crate::error::UmbraError;

/// Compiled full-screen program: shader module, bind group layout, uniform
/// buffer, per-slot samplers and one pipeline per output format.
pub struct WgpuProgram {
    label: &'static str,
    module: wgpu::ShaderModule,
    layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    samplers: Vec<wgpu::Sampler>,
    bind_group: Option<wgpu::BindGroup>,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

/// wgpu-backed pass executor.
pub struct WgpuBackend {
    context: RenderContext,
    composer: ShaderComposer,
    encoder: Option<wgpu::CommandEncoder>,
    drawing_buffer: Option<wgpu::TextureView>,
}

impl WgpuBackend {
    /// Wrap a render context.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Shader`] if the shared shader modules fail to
    /// register.
    pub fn new(context: RenderContext) -> Result<Self, UmbraError> {
        Ok(Self {
            context,
            composer: ShaderComposer::new()?,
            encoder: None,
            drawing_buffer: None,
        })
    }

    /// The wrapped render context.
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Mutable access to the wrapped render context.
    pub fn context_mut(&mut self) -> &mut RenderContext {
        &mut self.context
    }

    /// Set the view that [`DrawTarget::DrawingBuffer`] draws into. Its
    /// format must be the context's drawing-buffer format.
    pub fn set_drawing_buffer(&mut self, view: Option<wgpu::TextureView>) {
        self.drawing_buffer = view;
    }

    /// Submit every recorded draw.
    pub fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.context.submit(encoder);
        }
    }

    /// Flush, then copy `target` back to the CPU as tightly packed RGBA8.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Readback`] if the staging buffer cannot be
    /// mapped.
    pub fn read_target(&mut self, target: &WgpuTarget) -> Result<Vec<u8>, UmbraError> {
        self.flush();
        let (width, height) = target.size();
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let device = &self.context.device;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.context.create_encoder();
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture().texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.submit(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait);
        rx.recv()
            .map_err(|e| UmbraError::Readback(e.to_string()))?
            .map_err(|e| UmbraError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in mapped.chunks(padded as usize).take(height as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        staging.unmap();
        Ok(pixels)
    }
}

fn texture_format(data: &TexelData) -> (wgpu::TextureFormat, u32) {
    match data {
        TexelData::Rgba8(_) => (wgpu::TextureFormat::Rgba8Unorm, 4),
        TexelData::Depth(_) => (wgpu::TextureFormat::R32Float, 4),
    }
}

fn set_viewport(pass: &mut wgpu::RenderPass<'_>, viewport: Viewport) {
    pass.set_viewport(
        viewport.x as f32,
        viewport.y as f32,
        viewport.width as f32,
        viewport.height as f32,
        0.0,
        1.0,
    );
}

impl Backend for WgpuBackend {
    type Texture = GpuTexture;
    type Target = WgpuTarget;
    type Program = WgpuProgram;

    fn pixel_ratio(&self) -> f32 {
        self.context.pixel_ratio
    }

    fn create_render_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        _filter: TextureFilter,
    ) -> WgpuTarget {
        WgpuTarget::new(&self.context.device, label, width, height)
    }

    fn resize_render_target(
        &mut self,
        target: &mut WgpuTarget,
        width: u32,
        height: u32,
    ) {
        target.resize(&self.context.device, width, height);
    }

    fn create_texture(
        &mut self,
        label: &str,
        image: &TextureImage,
        _filter: TextureFilter,
    ) -> GpuTexture {
        let (format, texel_size) = texture_format(&image.data);
        let size = wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut bytes = match &image.data {
            TexelData::Rgba8(data) => data.clone(),
            TexelData::Depth(data) => bytemuck::cast_slice(data).to_vec(),
        };
        let expected = (size.width * size.height * texel_size) as usize;
        if bytes.len() != expected {
            log::warn!(
                "texture '{label}' has {} bytes, expected {expected}; padding",
                bytes.len()
            );
            bytes.resize(expected, 0);
        }
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * texel_size),
                rows_per_image: Some(size.height),
            },
            size,
        );
        GpuTexture::new(texture)
    }

    fn compile_program(
        &mut self,
        source: &ShaderSource,
        schema: &RenderableSchema,
        defines: &[(&'static str, DefineValue)],
    ) -> Result<WgpuProgram, UmbraError> {
        let device = &self.context.device;
        let wgsl = source.assemble(schema);
        let module = self.composer.compose(device, source.label, &wgsl, defines)?;

        let mut entries = vec![uniform_buffer(0)];
        let mut samplers = Vec::new();
        for (index, (_, filter)) in schema.textures().enumerate() {
            entries.extend(texture_slot(1 + 2 * index as u32, filter));
            samplers.push(sampler_for(device, filter));
        }
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Bind Group Layout", source.label)),
            entries: &entries,
        });
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniforms", source.label)),
            size: schema.uniform_layout().size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(WgpuProgram {
            label: source.label,
            module,
            layout,
            uniforms,
            samplers,
            bind_group: None,
            pipelines: FxHashMap::default(),
        })
    }

    fn write_uniforms(&mut self, program: &mut WgpuProgram, bytes: &[u8]) {
        self.context.queue.write_buffer(&program.uniforms, 0, bytes);
    }

    fn bind_textures(&mut self, program: &mut WgpuProgram, textures: &[GpuTexture]) {
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: program.uniforms.as_entire_binding(),
        }];
        for (index, (texture, sampler)) in
            textures.iter().zip(&program.samplers).enumerate()
        {
            let binding = 1 + 2 * index as u32;
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(texture.view()),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        program.bind_group = Some(self.context.device.create_bind_group(
            &wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Bind Group", program.label)),
                layout: &program.layout,
                entries: &entries,
            },
        ));
    }

    fn draw(
        &mut self,
        program: &mut WgpuProgram,
        target: DrawTarget<'_, WgpuTarget>,
        state: &DrawState,
    ) {
        let (view, format, size) = match target {
            DrawTarget::Target(t) => {
                (t.texture().view().clone(), TARGET_FORMAT, t.size())
            }
            DrawTarget::DrawingBuffer => {
                let Some(view) = self.drawing_buffer.clone() else {
                    log::warn!(
                        "'{}' targets the drawing buffer but none is set",
                        program.label
                    );
                    return;
                };
                (view, self.context.format(), self.context.size())
            }
        };
        let Some(bind_group) = program.bind_group.as_ref() else {
            log::warn!("'{}' drawn without texture bindings", program.label);
            return;
        };

        let device = &self.context.device;
        let pipeline = program.pipelines.entry(format).or_insert_with(|| {
            create_screen_space_pipeline(
                device,
                program.label,
                &program.module,
                format,
                None,
                &[&program.layout],
            )
        });

        let load = state.clear.map_or(wgpu::LoadOp::Load, |[r, g, b, a]| {
            wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a })
        });
        let encoder = self
            .encoder
            .get_or_insert_with(|| self.context.create_encoder());
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(program.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        if let Some(viewport) = state.viewport {
            set_viewport(&mut pass, viewport);
        }
        if let Some(scissor) = state.scissor {
            // Scissor rects must lie inside the attachment.
            let x = scissor.x.min(size.0);
            let y = scissor.y.min(size.1);
            let width = scissor.width.min(size.0 - x);
            let height = scissor.height.min(size.1 - y);
            pass.set_scissor_rect(x, y, width, height);
        }
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
