//! Host-side evaluation of the screen-space kernels.
//!
//! Each function here mirrors a WGSL function of `assets/shaders` line for
//! line so the shading math can be checked without a GPU. Depth is sampled
//! with nearest filtering and clamp-to-edge addressing, as the passes bind
//! their depth inputs.

pub mod postprocessing;
pub mod shadow;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::camera::{CameraSnapshot, ProjectionMode};

/// 255/256 divided by (256^3, 256^2, 256, 1).
const UNPACK_FACTORS: Vec4 = Vec4::new(
    0.996_093_75 / 16_777_216.0,
    0.996_093_75 / 65_536.0,
    0.996_093_75 / 256.0,
    0.996_093_75,
);

/// Depth value marking background pixels.
pub const BACKGROUND_DEPTH: f32 = 1.0;

/// A CPU depth image in `[0, 1]` device depth, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthBuffer {
    /// Buffer filled with `depth`.
    #[must_use]
    pub fn filled(width: u32, height: u32, depth: f32) -> Self {
        Self::from_fn(width, height, |_, _| depth)
    }

    /// Buffer whose texel `(x, y)` is `f(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size as a float vector, the value of `uTexSize`.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Texel `(x, y)`, clamped to the edge.
    pub fn texel(&self, x: i64, y: i64) -> f32 {
        if self.data.is_empty() {
            return BACKGROUND_DEPTH;
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.data[y * self.width as usize + x]
    }

    /// Nearest sample at normalized `uv`.
    pub fn sample(&self, uv: Vec2) -> f32 {
        let px = (uv * self.size()).floor();
        self.texel(px.x as i64, px.y as i64)
    }

    /// Normalized coordinates of the center of pixel `(x, y)`.
    pub fn pixel_center(&self, x: u32, y: u32) -> Vec2 {
        (Vec2::new(x as f32, y as f32) + 0.5) / self.size()
    }

    /// The raw texels.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Decode an RGBA-packed depth value.
pub fn unpack_rgba_to_depth(v: Vec4) -> f32 {
    v.dot(UNPACK_FACTORS)
}

/// View-space Z of a perspective depth value.
pub fn perspective_depth_to_view_z(depth: f32, near: f32, far: f32) -> f32 {
    near * far / ((far - near) * depth - far)
}

/// View-space Z of an orthographic depth value.
pub fn orthographic_depth_to_view_z(depth: f32, near: f32, far: f32) -> f32 {
    depth * (near - far) - near
}

/// View-space Z of `depth` through the formula matching the camera mode.
pub fn depth_to_view_z(depth: f32, camera: &CameraSnapshot) -> f32 {
    match camera.mode {
        ProjectionMode::Perspective => {
            perspective_depth_to_view_z(depth, camera.near, camera.far)
        }
        ProjectionMode::Orthographic => {
            orthographic_depth_to_view_z(depth, camera.near, camera.far)
        }
    }
}

/// Whether `depth` is the background sentinel.
pub fn is_background(depth: f32) -> bool {
    depth == BACKGROUND_DEPTH
}

/// Whether `p` lies outside `bounds` (`min_u, min_v, max_u, max_v`).
pub fn outside_bounds(p: Vec2, bounds: Vec4) -> bool {
    p.x < bounds.x || p.y < bounds.y || p.x > bounds.z || p.y > bounds.w
}

/// 1 inside `bounds`, falling to 0 over the outer twelfth at each edge.
pub fn screen_fade(coords: Vec2, bounds: Vec4) -> f32 {
    let min = Vec2::new(bounds.x, bounds.y);
    let max = Vec2::new(bounds.z, bounds.w);
    let c = (coords - min) / (max - min);
    let f = ((c - 0.5).abs() * 12.0 - 5.0).max(Vec2::ZERO);
    (1.0 - f.dot(f)).clamp(0.0, 1.0)
}

/// View position of `uv` at `depth`.
pub fn screen_to_view(uv: Vec2, depth: f32, inv_projection: Mat4) -> Vec3 {
    let ndc = Vec4::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let view = inv_projection * ndc;
    view.truncate() / view.w
}

/// Screen position of `view_pos` as `(u, v, depth)`.
pub fn view_to_screen(view_pos: Vec3, projection: Mat4) -> Vec3 {
    let clip = projection * view_pos.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    Vec3::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5, ndc.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;

    const EPS: f32 = 1e-3;

    #[test]
    fn perspective_view_z_inverts_the_projection() {
        let camera = CameraSnapshot::perspective(1.0, Viewport::full(64, 64), 1.0, 100.0);
        for z in [-1.0_f32, -2.5, -10.0, -42.0, -99.0] {
            let depth = view_to_screen(Vec3::new(0.0, 0.0, z), camera.projection).z;
            let view_z = depth_to_view_z(depth, &camera);
            assert!((view_z - z).abs() < EPS * z.abs(), "{view_z} != {z}");
        }
        assert!((perspective_depth_to_view_z(0.0, 1.0, 100.0) + 1.0).abs() < EPS);
        assert!((perspective_depth_to_view_z(1.0, 1.0, 100.0) + 100.0).abs() < EPS);
    }

    #[test]
    fn orthographic_view_z_is_linear() {
        let camera = CameraSnapshot::orthographic(5.0, Viewport::full(64, 64), 1.0, 11.0);
        assert!(camera.is_orthographic());
        assert!((depth_to_view_z(0.5, &camera) + 6.0).abs() < EPS);
        for z in [-1.0_f32, -3.0, -7.5, -11.0] {
            let depth = view_to_screen(Vec3::new(0.3, -0.2, z), camera.projection).z;
            assert!((depth_to_view_z(depth, &camera) - z).abs() < EPS);
        }
    }

    #[test]
    fn modes_route_to_different_formulas() {
        let viewport = Viewport::full(64, 64);
        let persp = CameraSnapshot::perspective(1.0, viewport, 1.0, 100.0);
        let ortho = CameraSnapshot::orthographic(5.0, viewport, 1.0, 100.0);
        assert_eq!(
            depth_to_view_z(0.5, &persp),
            perspective_depth_to_view_z(0.5, 1.0, 100.0)
        );
        assert_eq!(
            depth_to_view_z(0.5, &ortho),
            orthographic_depth_to_view_z(0.5, 1.0, 100.0)
        );
        assert!((depth_to_view_z(0.5, &persp) - depth_to_view_z(0.5, &ortho)).abs() > 1.0);
    }

    #[test]
    fn screen_round_trip() {
        let camera = CameraSnapshot::perspective(0.8, Viewport::full(32, 32), 0.5, 50.0);
        let p = Vec3::new(0.4, -0.3, -6.0);
        let s = view_to_screen(p, camera.projection);
        let back = screen_to_view(s.truncate(), s.z, camera.inverse_projection());
        assert!((back - p).length() < EPS);
    }

    #[test]
    fn screen_fade_is_one_in_the_middle_and_zero_at_edges() {
        let bounds = Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(screen_fade(Vec2::splat(0.5), bounds), 1.0);
        assert_eq!(screen_fade(Vec2::new(0.6, 0.4), bounds), 1.0);
        assert_eq!(screen_fade(Vec2::new(0.0, 0.5), bounds), 0.0);
        let mid = screen_fade(Vec2::new(0.04, 0.5), bounds);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn unpack_reads_the_red_channel_as_most_significant() {
        assert!((unpack_rgba_to_depth(Vec4::new(0.0, 0.0, 0.0, 1.0)) - 0.996).abs() < EPS);
        assert!(unpack_rgba_to_depth(Vec4::new(1.0, 0.0, 0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn depth_buffer_clamps_to_edge() {
        let buffer = DepthBuffer::from_fn(4, 2, |x, y| (x + 10 * y) as f32);
        assert_eq!(buffer.sample(Vec2::new(0.0, 0.0)), 0.0);
        assert_eq!(buffer.sample(Vec2::new(0.99, 0.99)), 13.0);
        assert_eq!(buffer.sample(Vec2::new(-1.0, 5.0)), 10.0);
        assert_eq!(buffer.texel(7, -3), 3.0);
        assert_eq!(buffer.pixel_center(1, 0), Vec2::new(0.375, 0.25));
    }
}
