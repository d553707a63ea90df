//! Shared wgpu boilerplate helpers for full-screen pass pipelines.

use super::schema::TextureFilter;

/// Fragment-visible uniform buffer binding.
pub fn uniform_buffer(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Texture + sampler layout entries for a texture slot at `binding` and
/// `binding + 1`. Nearest slots bind non-filterable float textures so depth
/// and float targets can be read through them.
pub fn texture_slot(
    binding: u32,
    filter: TextureFilter,
) -> [wgpu::BindGroupLayoutEntry; 2] {
    let filterable = filter != TextureFilter::Nearest;
    let sampler = if filterable {
        wgpu::SamplerBindingType::Filtering
    } else {
        wgpu::SamplerBindingType::NonFiltering
    };
    [
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: binding + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(sampler),
            count: None,
        },
    ]
}

/// Create a full-screen render pipeline with `vs_main` / `fs_main` entry
/// points, no vertex buffers, and a single color target.
pub fn create_screen_space_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::RenderPipeline {
    let pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts,
            push_constant_ranges: &[],
        });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label} Pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Sampler matching a texture slot's filter mode.
pub fn sampler_for(
    device: &wgpu::Device,
    filter: TextureFilter,
) -> wgpu::Sampler {
    let (address_mode, filter_mode, label) = match filter {
        TextureFilter::Nearest => (
            wgpu::AddressMode::ClampToEdge,
            wgpu::FilterMode::Nearest,
            "Nearest Sampler",
        ),
        TextureFilter::Linear => (
            wgpu::AddressMode::ClampToEdge,
            wgpu::FilterMode::Linear,
            "Linear Sampler",
        ),
        TextureFilter::LinearRepeat => (
            wgpu::AddressMode::Repeat,
            wgpu::FilterMode::Linear,
            "Linear Repeat Sampler",
        ),
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        mag_filter: filter_mode,
        min_filter: filter_mode,
        ..Default::default()
    })
}
