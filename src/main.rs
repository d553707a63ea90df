use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glam::{Vec2, Vec3};
use umbra::assets::{AssetResolver, DirectoryResolver, OfflineResolver};
use umbra::camera::{CameraSnapshot, Viewport};
use umbra::error::UmbraError;
use umbra::gpu::backend::{Backend, RenderTarget};
use umbra::gpu::render_context::RenderContext;
use umbra::gpu::texture::TARGET_FORMAT;
use umbra::gpu::{TextureFilter, TextureImage, WgpuBackend};
use umbra::lighting::Light;
use umbra::options::Options;
use umbra::reference::{screen_to_view, view_to_screen};
use umbra::renderer::postprocess::post_process::{FrameInputs, PostProcessStack};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FRAMES: usize = 4;

/// Spheres of the synthetic scene as (center, radius) in view space.
const SPHERES: [(Vec3, f32); 3] = [
    (Vec3::new(0.0, 0.0, -6.0), 1.6),
    (Vec3::new(1.6, 0.9, -7.5), 1.1),
    (Vec3::new(-1.8, -0.6, -5.0), 0.7),
];

struct Scene {
    color: TextureImage,
    depth: TextureImage,
}

fn ray_sphere(dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let b = dir.dot(center);
    let c = center.length_squared() - radius * radius;
    let h = b * b - c;
    (h >= 0.0).then(|| b - h.sqrt()).filter(|t| *t > 0.0)
}

/// Ray-cast a few lit spheres from the camera origin.
fn synthetic_scene(camera: &CameraSnapshot, light_dir: Vec3) -> Scene {
    let inv_projection = camera.inverse_projection();
    let mut rgba = Vec::with_capacity((WIDTH * HEIGHT * 4) as usize);
    let mut depth = Vec::with_capacity((WIDTH * HEIGHT) as usize);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let uv = (Vec2::new(x as f32, y as f32) + 0.5) / Vec2::new(WIDTH as f32, HEIGHT as f32);
            let dir = screen_to_view(uv, 1.0, inv_projection).normalize_or_zero();
            let hit = SPHERES
                .iter()
                .filter_map(|(center, radius)| {
                    ray_sphere(dir, *center, *radius).map(|t| (t, *center))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0));
            match hit {
                Some((t, center)) => {
                    let p = dir * t;
                    let n = (p - center).normalize_or_zero();
                    let shade = 0.25 + 0.75 * n.dot(-light_dir).max(0.0);
                    let albedo = Vec3::new(0.85, 0.55, 0.35) * shade;
                    rgba.extend(albedo.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8));
                    rgba.push(255);
                    depth.push(view_to_screen(p, camera.projection).z);
                }
                None => {
                    rgba.extend_from_slice(&[30, 30, 38, 255]);
                    depth.push(1.0);
                }
            }
        }
    }
    Scene {
        color: TextureImage::rgba8(WIDTH, HEIGHT, rgba),
        depth: TextureImage::depth(WIDTH, HEIGHT, depth),
    }
}

fn resolver() -> Box<dyn AssetResolver> {
    match std::env::var_os("UMBRA_ASSET_DIR") {
        Some(dir) => Box::new(DirectoryResolver::new(dir)),
        None => Box::new(OfflineResolver),
    }
}

fn run(options: &Options, output: &Path) -> Result<(), UmbraError> {
    let context = pollster::block_on(RenderContext::headless(TARGET_FORMAT, WIDTH, HEIGHT))?;
    let mut backend = WgpuBackend::new(context)?;

    let viewport = Viewport::full(WIDTH, HEIGHT);
    let camera = CameraSnapshot::perspective(0.9, viewport, 0.5, 50.0);
    let light_dir = Vec3::new(0.5, -0.6, -0.6).normalize_or_zero();
    let light = Light::single(light_dir, Vec3::splat(0.9));
    let scene = synthetic_scene(&camera, light_dir);

    let color = backend.create_texture("scene_color", &scene.color, TextureFilter::Nearest);
    let depth = backend.create_texture("scene_depth", &scene.depth, TextureFilter::Nearest);
    let out = backend.create_render_target("output", WIDTH, HEIGHT, TextureFilter::Linear);
    backend.set_drawing_buffer(Some(out.texture().view().clone()));

    let mut stack =
        PostProcessStack::new(&mut backend, WIDTH, HEIGHT, &color, &depth, false, resolver())?;
    let frame = FrameInputs {
        camera: &camera,
        light: &light,
        ambient: Vec3::splat(0.3),
        color,
        depth,
        packed_depth: false,
    };
    for i in 0..FRAMES {
        let ran = stack.render(&mut backend, &frame, options)?;
        backend.flush();
        log::debug!("frame {i}: {ran:?}");
    }

    let pixels = backend.read_target(&out)?;
    let image = image::RgbaImage::from_raw(WIDTH, HEIGHT, pixels)
        .ok_or_else(|| UmbraError::Readback("short read-back buffer".to_owned()))?;
    image
        .save(output)
        .map_err(|e| UmbraError::Asset(format!("failed to write {}: {e}", output.display())))?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let options = match args.next() {
        Some(path) => match Options::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            log::info!("Usage: umbra [preset.toml] [output.png]; using default options");
            Options::default()
        }
    };
    let output = args.next().map_or_else(|| PathBuf::from("umbra.png"), PathBuf::from);

    match run(&options, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
