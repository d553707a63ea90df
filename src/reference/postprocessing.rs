//! Host mirror of `postprocessing.wgsl`: kernel occlusion, ring SSAO,
//! hash/engraving shading and outlines.
//!
//! The hash stage works in pixel coordinates (`frag_coord.xy`); its
//! derivative stencils step one texel and its hatch spacings are in pixels.

use std::f32::consts::PI;

use glam::{Vec2, Vec4};

use super::{is_background, DepthBuffer};
use crate::options::PostprocessingProps;

const NOISE_AMOUNT: f32 = 0.0002;

// Truncated pi, matching the period the shader hash uses.
#[allow(clippy::approx_constant)]
const HASH_PERIOD: f32 = 3.14159;

/// Props and depth shared by every pixel of one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PostprocessingScene<'a> {
    /// Scene depth, also the output size.
    pub depth: &'a DepthBuffer,
    /// Effect props as set on the pass.
    pub props: &'a PostprocessingProps,
    /// Device pixel ratio applied to `outlineScale`.
    pub pixel_ratio: f32,
}

impl PostprocessingScene<'_> {
    fn number(&self, name: &str) -> f32 {
        self.props.number(name).unwrap_or(0.0) as f32
    }

    fn count(&self, name: &str) -> i32 {
        self.props.number(name).unwrap_or(0.0).round() as i32
    }

    fn flag(&self, name: &str) -> bool {
        self.props.flag(name)
    }
}

fn floor_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

fn noise(coords: Vec2) -> f32 {
    let dt = coords.dot(Vec2::new(12.9898, 78.233));
    (floor_mod(dt, HASH_PERIOD).sin() * 43758.545).fract()
}

/// Fraction of kernel taps closer to the camera than `depth`.
pub fn calc_occlusion(scene: &PostprocessingScene<'_>, coords: Vec2, depth: f32) -> f32 {
    let size = scene.depth.size();
    let k = scene.count("occlusionKernelSize");
    let radius = scene.number("occlusionRadius") / k.max(1) as f32;
    let mut occluded = 0.0;
    for i in -k..=k {
        for j in -k..=k {
            let mut c = coords + radius * Vec2::new(i as f32, j as f32) / size;
            c += NOISE_AMOUNT * (noise(c) - 0.5) / size;
            c = c.clamp(0.5 / size, 1.0 - 1.0 / size);
            if scene.depth.sample(c) < depth {
                occluded += 1.0;
            }
        }
    }
    let n = (2 * k + 1) as f32;
    occluded / (n * n)
}

fn compare_depths(scene: &PostprocessingScene<'_>, depth1: f32, depth2: f32) -> f32 {
    let diff = (1.0 - (depth1 - depth2) / scene.number("ssao_aorange"))
        .clamp(0.0, 1.0)
        .sqrt();
    let occlusion = (depth1 - depth2 - scene.number("ssao_depthTolerance")).max(0.0)
        * scene.number("ssao_aoMultiplier");
    scene.number("ssao_aoCap").min(occlusion) * diff
}

/// Ring SSAO: `ssao_rings` rings with `ring * ssao_samples` taps each.
pub fn compute_ao(scene: &PostprocessingScene<'_>, coords: Vec2) -> f32 {
    let size = scene.depth.size();
    let depth = scene.depth.sample(coords);
    let aspect = size.x / size.y;
    let falloff = depth.clamp(0.05, 1.0);
    let scale = scene.number("ssao_scale");
    let w = (scale / size.x) / falloff + 0.001;
    let h = (scale / size.y) / falloff + 0.001;

    let mut ao = 0.0;
    let mut taps = 0.0;
    for ring in 1..=scene.count("ssao_rings") {
        let ring_samples = ring * scene.count("ssao_samples");
        let angle_step = PI * 2.0 / ring_samples as f32;
        for j in 0..ring_samples {
            let pw = (j as f32 * angle_step).cos() * ring as f32;
            let ph = (j as f32 * angle_step).sin() * ring as f32 * aspect;
            let sample = scene.depth.sample(Vec2::new(coords.x + pw * w, coords.y + ph * h));
            ao += compare_depths(scene, depth, sample);
            taps += 1.0;
        }
    }
    ao / f32::max(taps, 1.0)
}

fn depth_at_pixel(scene: &PostprocessingScene<'_>, px: Vec2) -> f32 {
    scene.depth.sample(px / scene.depth.size())
}

/// The eight neighbours of `px`, ordered `a b c / d e / f g h` with `a`
/// at `(-1, +1)`.
fn neighbours(scene: &PostprocessingScene<'_>, px: Vec2) -> [f32; 8] {
    [
        (-1.0, 1.0),
        (0.0, 1.0),
        (1.0, 1.0),
        (-1.0, 0.0),
        (1.0, 0.0),
        (-1.0, -1.0),
        (0.0, -1.0),
        (1.0, -1.0),
    ]
    .map(|(x, y)| depth_at_pixel(scene, px + Vec2::new(x, y)))
}

/// Sobel depth gradient mapped through `g_low..g_hight`, times -10000.
pub fn first_derivative(scene: &PostprocessingScene<'_>, px: Vec2) -> f32 {
    let [za, zb, zc, zd, ze, zf, zg, zh] = neighbours(scene, px);
    let g = ((za + 2.0 * zb + zc - zf - 2.0 * zg).abs()
        + (zc + 2.0 * ze + zh - za - 2.0 * zd - zf).abs())
        / 8.0;
    let (low, high) = (scene.number("g_low"), scene.number("g_hight"));
    ((g - low) / (high - low)).clamp(0.0, 1.0) * -10000.0
}

/// Depth Laplacian mapped through `l_low..l_hight`, times -10000. The
/// lower-left neighbour is counted twice, as in the shader.
pub fn second_derivative(scene: &PostprocessingScene<'_>, px: Vec2) -> f32 {
    let zx = depth_at_pixel(scene, px);
    let [za, zb, zc, zd, ze, zf, zg, zh] = neighbours(scene, px);
    let l = (8.0 * zx - za - zb - zc - zd - ze - zf - zf - zg - zh).abs() / 3.0;
    let (low, high) = (scene.number("l_low"), scene.number("l_hight"));
    ((l - low) / (high - low)).clamp(0.0, 1.0) * -10000.0
}

/// Average of the 3x3 second derivatives when more than six are positive,
/// `center` otherwise.
pub fn second_derivative_average(scene: &PostprocessingScene<'_>, px: Vec2, center: f32) -> f32 {
    let mut sum = 0.0;
    let mut positive = 0;
    for i in -1..2 {
        for j in -1..2 {
            let l = second_derivative(scene, px + Vec2::new(i as f32, j as f32));
            sum += l;
            if l > 0.0 {
                positive += 1;
            }
        }
    }
    if positive > 6 {
        f32::min(1.0, sum / 6.0)
    } else {
        center
    }
}

fn hatch_distance(value: f32, spacing: f32) -> f32 {
    let d = floor_mod(value, spacing).abs();
    d.min(spacing - d)
}

/// Engraving intensity in `[0, 1]` of the pixel at `px`: 1 is untouched
/// paper (`back_intensity`), lower values are inked lines.
pub fn hash_shade(scene: &PostprocessingScene<'_>, px: Vec2, depth: f32, color: Vec4) -> f32 {
    let shade_image = 0.21 * color.x + 0.72 * color.y + 0.07 * color.z;
    let d = -10000.0 * depth;
    let zl_spread = scene.number("zl_max") - scene.number("zl_min");

    let g_opacity = first_derivative(scene, px);
    let l_opacity = second_derivative(scene, px);
    let l_opacity_ave = second_derivative_average(scene, px, l_opacity);

    let mut x_opacity = 0.0;
    let mut y_opacity = 0.0;
    let mut s_opacity = 0.0;
    let foreground = d != -10000.0;
    if foreground {
        let c_spacing = scene.number("c_spacing");
        let contour = (1.0 - (shade_image / scene.number("c_limit")).min(1.0))
            * scene.number("c_width")
            / 2.0;
        x_opacity = contour - hatch_distance(d - px.x, c_spacing);
        y_opacity = contour - hatch_distance(d - px.y, c_spacing);
        if depth < 0.95 * shade_image {
            s_opacity = scene.number("s_width") / 2.0
                - hatch_distance(px.x + px.y, scene.number("s_spacing"));
        }
    }

    let depth_hatch = hatch_distance(px.x + px.y, scene.number("d_spacing"));
    let d_width_low = scene.number("d_width_low");
    let d_opacity = if foreground {
        ((d - scene.number("zl_min")) / zl_spread * scene.number("d_width_spread") + d_width_low)
            / 2.0
            - depth_hatch
    } else {
        d_width_low / 2.0 - depth_hatch
    };

    let line_opacity = [g_opacity, l_opacity_ave, x_opacity, y_opacity, s_opacity, d_opacity]
        .into_iter()
        .fold(0.0_f32, f32::max)
        .min(1.0);
    let back = scene.number("back_intensity");
    (back - (back - scene.number("line_intensity")) * line_opacity).min(1.0)
}

/// Depth gradient magnitude across the outline footprint, times 100.
pub fn calc_edge_depth(scene: &PostprocessingScene<'_>, coords: Vec2) -> f32 {
    let inv_tex_size = 1.0 / scene.depth.size();
    let outline_scale = scene.number("outlineScale") * scene.pixel_ratio;
    let half_floor = (outline_scale * 0.5).floor();
    let half_ceil = (outline_scale * 0.5).ceil();

    let bottom_left = coords - inv_tex_size * half_floor;
    let top_right = coords + inv_tex_size * half_ceil;
    let bottom_right =
        coords + Vec2::new(inv_tex_size.x * half_ceil, -inv_tex_size.y * half_floor);
    let top_left = coords + Vec2::new(-inv_tex_size.x * half_floor, inv_tex_size.y * half_ceil);

    let diff0 = scene.depth.sample(top_right) - scene.depth.sample(bottom_left);
    let diff1 = scene.depth.sample(top_left) - scene.depth.sample(bottom_right);
    (diff0 * diff0 + diff1 * diff1).sqrt() * 100.0
}

/// Output of pixel `(x, y)` whose input color is `color`.
pub fn shade_pixel(scene: &PostprocessingScene<'_>, x: u32, y: u32, color: Vec4) -> Vec4 {
    let coords = scene.depth.pixel_center(x, y);
    let depth = scene.depth.sample(coords);
    let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
    let bias = scene.number("occlusionBias");
    let mut color = color;

    if scene.flag("ssaoEnable") && !is_background(depth) {
        let mut ring_occlusion = compute_ao(scene, coords);
        if scene.flag("ssao_negative") {
            ring_occlusion = 1.0 - ring_occlusion;
        }
        color = color.lerp(black, bias * ring_occlusion);
    }
    if scene.flag("occlusionEnable") && !is_background(depth) {
        color = color.lerp(black, bias * calc_occlusion(scene, coords, depth));
    }
    if scene.flag("hashEnable") && !is_background(depth) {
        let shaded = hash_shade(scene, coords * scene.depth.size(), depth, color);
        color = color.lerp(black, bias * (1.0 - shaded));
    }
    if scene.flag("outlineEnable") {
        let edge = calc_edge_depth(scene, coords);
        let keep = if scene.number("outlineThreshold") >= edge { 1.0 } else { 0.0 };
        color = (color.truncate() * keep).extend(color.w);
    }
    color
}

/// Shade a whole row-major image the size of the depth buffer.
pub fn shade_image(scene: &PostprocessingScene<'_>, color: &[Vec4]) -> Vec<Vec4> {
    let width = scene.depth.width();
    color
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let i = i as u32;
            shade_pixel(scene, i % width.max(1), i / width.max(1), *c)
        })
        .collect()
}
