//! Host mirror of `shadows.wgsl`.

use glam::{Vec2, Vec3, Vec4};

use super::{
    depth_to_view_z, is_background, outside_bounds, screen_fade, screen_to_view,
    view_to_screen, DepthBuffer,
};
use crate::camera::CameraSnapshot;
use crate::lighting::Light;
use crate::options::{AdvancedShadowParams, ShadowMode, SimpleShadowParams};

/// Loop ceiling of the screen-space march, independent of the sample count.
pub const MAX_SHADOW_SAMPLES: i32 = 1024;

/// Depth input and camera of one shadow evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ShadowScene<'a> {
    /// Scene depth.
    pub depth: &'a DepthBuffer,
    /// Camera the depth was rendered with.
    pub camera: &'a CameraSnapshot,
}

impl ShadowScene<'_> {
    fn bounds(&self) -> Vec4 {
        self.camera
            .viewport
            .bounds(self.depth.width() as f32, self.depth.height() as f32)
    }

    fn view_z(&self, uv: Vec2) -> f32 {
        depth_to_view_z(self.depth.sample(uv), self.camera)
    }
}

/// Fixed-step march from `position` against `light_dir`. Returns the light
/// color reaching `position`.
pub fn shadow_simple(
    scene: &ShadowScene<'_>,
    position: Vec3,
    light_dir: Vec3,
    light_color: Vec3,
    params: &SimpleShadowParams,
) -> Vec3 {
    let steps = params.steps.max(1);
    let max_distance = params.max_distance * scene.camera.scale;
    let tolerance = params.tolerance * scene.camera.scale;
    let bounds = scene.bounds();

    let ray_step = -light_dir * (max_distance / steps as f32);
    let mut ray_pos = position;
    for _ in 0..steps {
        ray_pos += ray_step;
        let coords = view_to_screen(ray_pos, scene.camera.projection).truncate();
        if outside_bounds(coords, bounds) {
            return light_color;
        }
        let z_delta = ray_pos.z - scene.view_z(coords);
        if z_delta < tolerance {
            return Vec3::ZERO.lerp(light_color, 1.0 - screen_fade(coords, bounds));
        }
    }
    light_color
}

fn screen_dir_from_light(scene: &ShadowScene<'_>, view_pos: Vec3, light_dir: Vec3) -> Vec2 {
    let uv0 = view_to_screen(view_pos, scene.camera.projection).truncate();
    let uv1 = view_to_screen(view_pos - light_dir * 0.05, scene.camera.projection).truncate();
    let d = uv1 - uv0;
    d / d.length().max(1e-6)
}

fn apply_contrast(v: f32, contrast: f32) -> f32 {
    (v * contrast + (1.0 - contrast)).clamp(0.0, 1.0)
}

/// Bend-style contact shadow of the fragment at `uv_start`.
///
/// Steps are spread over four lanes by `i & 3`; only lanes that received a
/// sample take part in the final average, so sample counts below four are
/// not biased towards lit.
pub fn shadow_bend(
    scene: &ShadowScene<'_>,
    view_pos: Vec3,
    light_dir: Vec3,
    light_color: Vec3,
    uv_start: Vec2,
    params: &AdvancedShadowParams,
) -> Vec3 {
    let mut start_depth = scene.depth.sample(uv_start);
    if is_background(start_depth) {
        return Vec3::ZERO;
    }
    if params.use_precision_offset {
        start_depth += start_depth / 65535.0;
    }

    let sample_count = params.sample_count as i32;
    let hard_samples = params.hard_shadow_samples as i32;
    let fade_samples = params.fade_out_samples as i32;
    let contrast = params.shadow_contrast;

    let size = scene.depth.size();
    let bounds = scene.bounds();
    let dir_uv = screen_dir_from_light(scene, view_pos, light_dir);
    let max_dim = size.x.max(size.y);
    let step_uv = params.max_pixel_distance / max_dim / sample_count.max(1) as f32;
    let z_sign = if scene.camera.near > scene.camera.far { -1.0 } else { 1.0 };
    let fade_start = sample_count - fade_samples;
    let edge_fade = screen_fade(uv_start, bounds);

    let mut lanes = [1.0_f32; 4];
    let mut lane_used = [false; 4];
    let mut hard_min = 1.0_f32;
    let mut uv = uv_start;

    for i in 0..MAX_SHADOW_SAMPLES.min(sample_count) {
        uv += dir_uv * step_uv;
        if outside_bounds(uv, bounds) {
            break;
        }

        let perp = Vec2::new(-dir_uv.y, dir_uv.x);
        let phase = (uv * size).dot(perp).fract();
        let side = perp * (0.5 / max_dim) * if phase > 0.5 { 1.0 } else { -1.0 };

        let d0 = scene.depth.sample(uv);
        let d1 = scene.depth.sample(uv + side);
        let thickness_scale = d0.abs();
        let use_point = (d0 - d1).abs() > thickness_scale * params.bilinear_threshold;

        let shadowing_depth = if params.bilinear_sampling_offset_mode {
            let bilinear = if use_point { 0.0 } else { (phase - 0.5).abs() };
            let sampling_depth = d0 + (d1 - d0) * bilinear;
            if params.ignore_edge_pixels && use_point {
                1e20
            } else {
                sampling_depth
            }
        } else if use_point {
            if params.ignore_edge_pixels {
                1e20
            } else {
                d0
            }
        } else {
            d0 + (d0 - d1).abs() * z_sign
        };

        let depth_scale = ((i + 1) as f32).min(1.0 / params.surface_thickness.max(1e-6))
            / thickness_scale.max(1e-6);
        let start_scaled = start_depth * depth_scale - z_sign;
        let delta = (start_scaled - shadowing_depth * depth_scale).abs();

        if i < hard_samples {
            hard_min = hard_min.min(delta);
        }
        let lane = (i & 3) as usize;
        if i >= hard_samples && i < fade_start {
            lanes[lane] = lanes[lane].min(delta);
            lane_used[lane] = true;
        }
        if i >= fade_start {
            let t = (i + 1 - fade_start) as f32 / (fade_samples + 1) as f32;
            lanes[lane] = lanes[lane].min(delta + 0.75 * t);
            lane_used[lane] = true;
        }
    }

    let (sum, count) = lanes
        .iter()
        .zip(lane_used)
        .filter(|(_, used)| *used)
        .fold((0.0, 0.0), |(sum, count), (lane, _)| {
            (sum + apply_contrast(*lane, contrast), count + 1.0)
        });
    let mut result = if count > 0.0 { sum / count } else { 1.0 };
    result = result.min(apply_contrast(hard_min, contrast));
    result += (1.0 - result) * (1.0 - edge_fade);
    light_color * result
}

/// Ratio of the light reaching a fragment to the light it would receive
/// unshadowed. `lights` pairs each shadowed color with its full color.
pub fn combine_lights(ambient: Vec3, lights: &[(Vec3, Vec3)]) -> f32 {
    let (lit, total) = lights.iter().fold(
        (ambient.length(), ambient.length()),
        |(lit, total), (shadowed, color)| (lit + shadowed.length(), total + color.length()),
    );
    lit / total.max(1e-6)
}

/// Shadow factor written for the fragment at `coords`; 0 on background.
pub fn shadow_factor(
    scene: &ShadowScene<'_>,
    coords: Vec2,
    light: &Light,
    ambient: Vec3,
    mode: &ShadowMode,
) -> f32 {
    let depth = scene.depth.sample(coords);
    if is_background(depth) {
        return 0.0;
    }
    let view_pos = screen_to_view(coords, depth, scene.camera.inverse_projection());

    let count = light.count();
    let directions = light.view_directions(scene.camera.head_rotation);
    let lights: Vec<(Vec3, Vec3)> = directions
        .iter()
        .zip(&light.colors()[..count])
        .map(|(direction, color)| {
            let light_dir = direction.normalize_or_zero();
            let shadowed = match mode {
                ShadowMode::Simple(p) => shadow_simple(scene, view_pos, light_dir, *color, p),
                ShadowMode::Advanced(p) => {
                    shadow_bend(scene, view_pos, light_dir, *color, coords, p)
                }
            };
            (shadowed, *color)
        })
        .collect();
    combine_lights(ambient, &lights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;

    const SIZE: u32 = 64;

    fn camera() -> CameraSnapshot {
        CameraSnapshot::perspective(1.0, Viewport::full(SIZE, SIZE), 1.0, 1000.0)
    }

    fn depth_of(camera: &CameraSnapshot, z: f32) -> f32 {
        view_to_screen(Vec3::new(0.0, 0.0, z), camera.projection).z
    }

    fn advanced(sample_count: u32, max_pixel_distance: f32) -> AdvancedShadowParams {
        AdvancedShadowParams {
            sample_count,
            hard_shadow_samples: 0,
            fade_out_samples: 0,
            max_pixel_distance,
            ..AdvancedShadowParams::default()
        }
    }

    /// Depth 0.8 at the center pixel, `occluder(x)` for every other column.
    fn column_scene(occluder: impl Fn(u32) -> f32) -> DepthBuffer {
        DepthBuffer::from_fn(SIZE, SIZE, |x, y| {
            if (x, y) == (SIZE / 2, SIZE / 2) {
                0.8
            } else {
                occluder(x)
            }
        })
    }

    fn bend_at_center(depth: &DepthBuffer, params: &AdvancedShadowParams) -> Vec3 {
        let camera = camera();
        let scene = ShadowScene {
            depth,
            camera: &camera,
        };
        let uv = depth.pixel_center(SIZE / 2, SIZE / 2);
        let view_pos = screen_to_view(uv, depth.sample(uv), camera.inverse_projection());
        // marches towards +u
        shadow_bend(&scene, view_pos, Vec3::NEG_X, Vec3::ONE, uv, params)
    }

    #[test]
    fn simple_march_that_never_hits_is_fully_lit() {
        let camera = camera();
        let depth = DepthBuffer::filled(SIZE, SIZE, depth_of(&camera, -100.0));
        let scene = ShadowScene {
            depth: &depth,
            camera: &camera,
        };
        let params = SimpleShadowParams {
            steps: 1,
            max_distance: 3.0,
            tolerance: 1.0,
        };
        let color = Vec3::new(0.9, 0.8, 0.7);
        let lit = shadow_simple(&scene, Vec3::new(0.0, 0.0, -5.0), Vec3::Z, color, &params);
        assert_eq!(lit, color);
    }

    #[test]
    fn simple_march_into_geometry_is_shadowed() {
        let camera = camera();
        let depth = DepthBuffer::filled(SIZE, SIZE, depth_of(&camera, -10.0));
        let scene = ShadowScene {
            depth: &depth,
            camera: &camera,
        };
        // light travels away from the camera, the ray goes behind the plane
        let shadowed = shadow_simple(
            &scene,
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::Z,
            Vec3::ONE,
            &SimpleShadowParams::default(),
        );
        assert!(shadowed.length() < 1e-3);
    }

    #[test]
    fn simple_distances_follow_camera_scale() {
        let camera = camera().with_scale(0.0);
        let depth = DepthBuffer::filled(SIZE, SIZE, depth_of(&camera, -10.0));
        let scene = ShadowScene {
            depth: &depth,
            camera: &camera,
        };
        // zero scale collapses the march; the tolerance collapses with it
        let lit = shadow_simple(
            &scene,
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::Z,
            Vec3::ONE,
            &SimpleShadowParams::default(),
        );
        assert_eq!(lit, Vec3::ONE);
    }

    #[test]
    fn advanced_coincident_hit_is_nearly_black() {
        let depth = column_scene(|_| 0.4);
        let shadowed = bend_at_center(&depth, &advanced(1, 4.0));
        assert!(shadowed.length() < 1e-3, "{shadowed}");
    }

    #[test]
    fn advanced_without_occluder_is_lit() {
        let depth = DepthBuffer::filled(SIZE, SIZE, 0.8);
        for n in 1..=8 {
            let lit = bend_at_center(&depth, &advanced(n, 4.0));
            assert!((lit - Vec3::ONE).length() < 1e-4, "{n} samples: {lit}");
        }
    }

    #[test]
    fn small_sample_counts_use_only_active_lanes() {
        // step i lands on column 36 + 4i; each occluder sits where the
        // thickness-scaled delta of that step is zero
        let blocked = column_scene(|x| match x {
            36 => 0.4,
            40 => 1.6 / 3.0,
            44 => 0.6,
            _ => 0.8,
        });
        for n in 1..4 {
            let shadowed = bend_at_center(&blocked, &advanced(n, 4.0 * n as f32));
            assert!(shadowed.length() < 1e-3, "{n} samples: {shadowed}");
        }

        // first step hits at column 36, second lands on open depth at 40
        let partial = column_scene(|x| if (33..=38).contains(&x) { 0.4 } else { 0.8 });
        let half = bend_at_center(&partial, &advanced(2, 8.0));
        assert!((half.x - 0.5).abs() < 1e-4, "{half}");
    }

    #[test]
    fn march_stops_at_the_viewport_edge() {
        let depth = column_scene(|_| 0.4);
        // one step jumps far outside the buffer
        let lit = bend_at_center(&depth, &advanced(1, 4.0 * SIZE as f32));
        assert_eq!(lit, Vec3::ONE);
    }

    #[test]
    fn background_fragments_write_zero() {
        let camera = camera();
        let depth = DepthBuffer::filled(SIZE, SIZE, 1.0);
        let scene = ShadowScene {
            depth: &depth,
            camera: &camera,
        };
        let light = Light::single(Vec3::Z, Vec3::ONE);
        let factor = shadow_factor(
            &scene,
            Vec2::splat(0.5),
            &light,
            Vec3::splat(0.3),
            &ShadowMode::default(),
        );
        assert_eq!(factor, 0.0);
    }

    #[test]
    fn lights_combine_by_magnitude() {
        let ambient = Vec3::ZERO;
        let lit = (Vec3::ONE, Vec3::ONE);
        let blocked = (Vec3::ZERO, Vec3::ONE);
        assert_eq!(combine_lights(ambient, &[lit, lit]), 1.0);
        assert!((combine_lights(ambient, &[lit, blocked]) - 0.5).abs() < 1e-6);
        let with_ambient = combine_lights(Vec3::new(0.0, 3.0, 4.0), &[blocked]);
        let expected = 5.0 / (5.0 + 3.0_f32.sqrt());
        assert!((with_ambient - expected).abs() < 1e-6);
    }

    #[test]
    fn factor_of_a_lit_scene_is_one() {
        let camera = camera();
        let depth = DepthBuffer::filled(SIZE, SIZE, depth_of(&camera, -100.0));
        let scene = ShadowScene {
            depth: &depth,
            camera: &camera,
        };
        // rays march towards the camera and stay in front of the plane
        let light = Light::new(vec![Vec3::NEG_Z, Vec3::NEG_Z], vec![Vec3::ONE, Vec3::X]).unwrap();
        let factor = shadow_factor(
            &scene,
            depth.pixel_center(10, 20),
            &light,
            Vec3::splat(0.2),
            &ShadowMode::default(),
        );
        assert!((factor - 1.0).abs() < 1e-6);
    }
}
