//! wgpu texture handles and render targets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::backend::RenderTarget;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a GPU texture and its default view.
///
/// Cloning is cheap. Equality is identity: clones of one handle compare
/// equal, distinct textures never do.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    id: u64,
    texture: Arc<wgpu::Texture>,
    view: Arc<wgpu::TextureView>,
}

impl PartialEq for GpuTexture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GpuTexture {}

impl GpuTexture {
    /// Wrap a texture, creating its default view.
    #[must_use]
    pub fn new(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            texture: Arc::new(texture),
            view: Arc::new(view),
        }
    }

    /// The underlying GPU texture.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Default full-texture view.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Size in texels.
    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

/// An off-screen RGBA8 render target.
///
/// The texture is created with `RENDER_ATTACHMENT | TEXTURE_BINDING |
/// COPY_SRC` usage, suitable for rendering followed by sampling in a later
/// pass or read-back.
#[derive(Debug)]
pub struct WgpuTarget {
    label: String,
    texture: GpuTexture,
}

/// Color format of every render target.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn create_target_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> GpuTexture {
    GpuTexture::new(device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    }))
}

impl WgpuTarget {
    /// Create a new render target with the given dimensions.
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        Self {
            label: label.to_owned(),
            texture: create_target_texture(device, label, width, height),
        }
    }

    /// Reallocate at a new size. The texture handle changes.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.texture = create_target_texture(device, &self.label, width, height);
    }
}

impl RenderTarget for WgpuTarget {
    type Texture = GpuTexture;

    fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    fn size(&self) -> (u32, u32) {
        self.texture.size()
    }
}
