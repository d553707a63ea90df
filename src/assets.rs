//! Texture assets of the old-movie pass.
//!
//! Grain and scratch images are resolved through an [`AssetResolver`] and
//! decoded on a background thread so the render loop never blocks. Any
//! resolve or decode failure is replaced by procedural noise; the pass keeps
//! rendering with placeholders until results arrive through
//! [`AssetLoader::poll`].

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use rand::Rng;

use crate::error::UmbraError;
use crate::gpu::TextureImage;

const ASSET_BASE: &str =
    "https://raw.githubusercontent.com/NullTale/OldMovieFx/master/Runtime/OldMovie";

/// Number of scratch/dust noise images.
pub const NOISE_COUNT: usize = 33;

/// Edge length of procedural fallback and black textures.
pub const FALLBACK_SIZE: u32 = 256;

/// A resolvable asset location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// Remote URL.
    Url(String),
    /// Local file.
    File(PathBuf),
}

impl Asset {
    /// Final path component, used to look remote assets up locally.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Url(url) => url.rsplit('/').next().filter(|s| !s.is_empty()),
            Self::File(path) => path.file_name().and_then(|s| s.to_str()),
        }
    }
}

/// The grain overlay image.
pub fn grain_asset() -> Asset {
    Asset::Url(format!("{ASSET_BASE}/Grain/Grain_Large_A.png"))
}

/// The `index`-th scratch noise image (`0..NOISE_COUNT`).
pub fn noise_asset(index: usize) -> Asset {
    Asset::Url(format!("{ASSET_BASE}/Noise/A/OldMovie{index:02}.png"))
}

/// Turns an [`Asset`] into raw file bytes. Runs on the loader thread.
pub trait AssetResolver: Send {
    /// Fetch the bytes of `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::Asset`] or [`UmbraError::Io`] when the asset
    /// cannot be found or read.
    fn resolve(&self, asset: &Asset) -> Result<Vec<u8>, UmbraError>;
}

/// Resolves files directly and URLs by their file name inside `root`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    /// Resolver looking inside `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory searched for URL assets.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for DirectoryResolver {
    fn resolve(&self, asset: &Asset) -> Result<Vec<u8>, UmbraError> {
        let path = match asset {
            Asset::File(path) => path.clone(),
            Asset::Url(url) => {
                let name = asset
                    .file_name()
                    .ok_or_else(|| UmbraError::Asset(format!("no file name in '{url}'")))?;
                self.root.join(name)
            }
        };
        std::fs::read(&path).map_err(UmbraError::Io)
    }
}

/// Resolver that never finds anything; every asset becomes procedural.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineResolver;

impl AssetResolver for OfflineResolver {
    fn resolve(&self, asset: &Asset) -> Result<Vec<u8>, UmbraError> {
        Err(UmbraError::Asset(format!("offline, cannot resolve {asset:?}")))
    }
}

/// Which texture a loaded image replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    /// The grain overlay.
    Grain,
    /// Scratch noise image by index.
    Noise(usize),
}

/// A decoded (or procedurally substituted) image.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    /// Destination slot.
    pub slot: AssetSlot,
    /// Image data.
    pub image: TextureImage,
    /// Whether the image is a procedural substitute.
    pub fallback: bool,
}

/// Decode PNG (or any enabled `image` format) bytes into RGBA8.
///
/// # Errors
///
/// Returns [`UmbraError::Asset`] when decoding fails.
pub fn decode_image(bytes: &[u8]) -> Result<TextureImage, UmbraError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| UmbraError::Asset(format!("failed to decode image: {e}")))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    Ok(TextureImage::rgba8(width, height, decoded.into_raw()))
}

/// Random grey noise with matching alpha, `size` x `size`.
pub fn procedural_noise(size: u32) -> TextureImage {
    let mut rng = rand::rng();
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for _ in 0..size * size {
        let v: u8 = rng.random();
        data.extend_from_slice(&[v, v, v, v]);
    }
    TextureImage::rgba8(size, size, data)
}

fn load(resolver: &dyn AssetResolver, slot: AssetSlot, asset: &Asset) -> LoadedImage {
    match resolver.resolve(asset).and_then(|bytes| decode_image(&bytes)) {
        Ok(image) => LoadedImage {
            slot,
            image,
            fallback: false,
        },
        Err(e) => {
            log::warn!("{e}; using procedural noise for {asset:?}");
            LoadedImage {
                slot,
                image: procedural_noise(FALLBACK_SIZE),
                fallback: true,
            }
        }
    }
}

/// Background loader for the grain image and every noise image.
pub struct AssetLoader {
    receiver: mpsc::Receiver<LoadedImage>,
    thread: Option<std::thread::JoinHandle<()>>,
    pending: usize,
}

impl AssetLoader {
    /// Spawn the loader thread.
    ///
    /// # Errors
    ///
    /// Returns [`UmbraError::ThreadSpawn`] if the thread fails to spawn.
    pub fn spawn(resolver: Box<dyn AssetResolver>) -> Result<Self, UmbraError> {
        let requests: Vec<(AssetSlot, Asset)> = std::iter::once((AssetSlot::Grain, grain_asset()))
            .chain((0..NOISE_COUNT).map(|i| (AssetSlot::Noise(i), noise_asset(i))))
            .collect();
        let pending = requests.len();
        let (tx, receiver) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("umbra-assets".into())
            .spawn(move || {
                for (slot, asset) in &requests {
                    if tx.send(load(resolver.as_ref(), *slot, asset)).is_err() {
                        break;
                    }
                }
            })
            .map_err(UmbraError::ThreadSpawn)?;

        Ok(Self {
            receiver,
            thread: Some(thread),
            pending,
        })
    }

    /// Drain every image finished since the last call. Never blocks.
    pub fn poll(&mut self) -> Vec<LoadedImage> {
        let ready: Vec<_> = self.receiver.try_iter().collect();
        self.pending = self.pending.saturating_sub(ready.len());
        if self.pending == 0 {
            if let Some(handle) = self.thread.take() {
                let _ = handle.join();
                log::debug!("old movie assets loaded");
            }
        }
        ready
    }

    /// Whether every requested image has been delivered.
    pub fn is_finished(&self) -> bool {
        self.pending == 0
    }
}
