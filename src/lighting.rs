//! Directional lights in view space.

use glam::{Mat4, Vec3};

use crate::error::UmbraError;

/// Maximum number of lights a pass uploads. [`Light::new`] drops the rest.
pub const MAX_LIGHTS: usize = 8;

/// A set of directional lights. Directions are in view space and point
/// from the light towards the scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Light {
    directions: Vec<Vec3>,
    colors: Vec<Vec3>,
}

impl Light {
    /// Build a light set from parallel direction and color arrays.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::LightMismatch`] if the arrays differ in length.
    pub fn new(mut directions: Vec<Vec3>, mut colors: Vec<Vec3>) -> Result<Self, UmbraError> {
        if directions.len() != colors.len() {
            return Err(UmbraError::LightMismatch {
                directions: directions.len(),
                colors: colors.len(),
            });
        }
        if directions.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights supplied, only the first {MAX_LIGHTS} are used",
                directions.len()
            );
            directions.truncate(MAX_LIGHTS);
            colors.truncate(MAX_LIGHTS);
        }
        Ok(Self { directions, colors })
    }

    /// A single light.
    #[must_use]
    pub fn single(direction: Vec3, color: Vec3) -> Self {
        Self {
            directions: vec![direction],
            colors: vec![color],
        }
    }

    /// Number of lights, at most [`MAX_LIGHTS`].
    pub fn count(&self) -> usize {
        self.directions.len()
    }

    /// Light directions.
    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    /// Light colors.
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    /// Directions to upload: transformed by the inverse head rotation when
    /// one is active, unchanged otherwise.
    pub fn view_directions(&self, head_rotation: Mat4) -> Vec<Vec3> {
        if head_rotation == Mat4::ZERO {
            return self.directions.clone();
        }
        let inv = head_rotation.inverse();
        self.directions
            .iter()
            .map(|d| inv.transform_vector3(*d))
            .collect()
    }
}
