//! Per-frame camera snapshot consumed by the screen-space passes.
//!
//! The snapshot is immutable for the duration of a frame. Passes derive the
//! inverse projection, the orthographic flag and the normalized viewport
//! bounds from it.

use glam::{Mat4, Vec4};

/// Axis-aligned pixel rectangle inside the drawing buffer (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a whole `width` x `height` buffer.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Viewport bounds normalized by the texture size, as
    /// `(min_u, min_v, max_u, max_v)`.
    #[must_use]
    pub fn bounds(&self, tex_width: f32, tex_height: f32) -> Vec4 {
        let w = tex_width.max(1.0);
        let h = tex_height.max(1.0);
        Vec4::new(
            self.x as f32 / w,
            self.y as f32 / h,
            (self.x + self.width) as f32 / w,
            (self.y + self.height) as f32 / h,
        )
    }
}

/// Projection kind of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// Immutable camera state for one frame.
///
/// `projection` follows the wgpu `[0, 1]` depth convention
/// (`Mat4::perspective_rh` / `Mat4::orthographic_rh`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    /// View-to-clip projection matrix.
    pub projection: Mat4,
    /// Perspective or orthographic.
    pub mode: ProjectionMode,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
    /// World-unit scale applied to distance-like shadow parameters.
    pub scale: f32,
    /// Region of the drawing buffer the camera renders into.
    pub viewport: Viewport,
    /// XR head rotation; the zero matrix when head tracking is inactive.
    pub head_rotation: Mat4,
}

impl CameraSnapshot {
    /// Perspective camera with a vertical field of view in radians.
    #[must_use]
    pub fn perspective(
        fov_y: f32,
        viewport: Viewport,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
        Self {
            projection: Mat4::perspective_rh(fov_y, aspect, near, far),
            mode: ProjectionMode::Perspective,
            near,
            far,
            scale: 1.0,
            viewport,
            head_rotation: Mat4::ZERO,
        }
    }

    /// Orthographic camera whose view volume is `half_height` units above
    /// and below the view axis.
    #[must_use]
    pub fn orthographic(
        half_height: f32,
        viewport: Viewport,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
        let half_width = half_height * aspect;
        Self {
            projection: Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                near,
                far,
            ),
            mode: ProjectionMode::Orthographic,
            near,
            far,
            scale: 1.0,
            viewport,
            head_rotation: Mat4::ZERO,
        }
    }

    /// Builder-style setter for [`CameraSnapshot::scale`].
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Builder-style setter for [`CameraSnapshot::head_rotation`].
    #[must_use]
    pub fn with_head_rotation(mut self, head_rotation: Mat4) -> Self {
        self.head_rotation = head_rotation;
        self
    }

    /// Whether the projection is orthographic.
    pub fn is_orthographic(&self) -> bool {
        self.mode == ProjectionMode::Orthographic
    }

    /// Inverse of the projection matrix.
    pub fn inverse_projection(&self) -> Mat4 {
        self.projection.inverse()
    }

    /// Whether an XR head rotation is active.
    pub fn has_head_rotation(&self) -> bool {
        self.head_rotation != Mat4::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_normalize_by_texture_size() {
        let viewport = Viewport {
            x: 10,
            y: 20,
            width: 50,
            height: 60,
        };
        let b = viewport.bounds(100.0, 200.0);
        assert_eq!(b, Vec4::new(0.1, 0.1, 0.6, 0.4));
    }

    #[test]
    fn head_rotation_defaults_to_zero() {
        let cam = CameraSnapshot::perspective(1.0, Viewport::full(64, 64), 0.1, 100.0);
        assert!(!cam.has_head_rotation());
        let cam = cam.with_head_rotation(Mat4::IDENTITY);
        assert!(cam.has_head_rotation());
    }

    #[test]
    fn orthographic_constructor_sets_mode() {
        let cam = CameraSnapshot::orthographic(5.0, Viewport::full(64, 32), 1.0, 50.0);
        assert!(cam.is_orthographic());
        let p = cam.projection.project_point3(glam::Vec3::new(10.0, 0.0, -1.0));
        assert!((p.x - 1.0).abs() < 1e-5);
    }
}
