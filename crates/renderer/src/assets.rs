//! Asynchronous asset loading gated behind an all-or-nothing completion handle.
//!
//! Decoding runs on one worker thread per asset. Workers report back over a
//! channel, and the UI thread polls [`AssetLoad`] until every asset has
//! arrived or one of them fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => f.write_str("image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetDescriptor {
    pub kind: AssetKind,
    pub source: PathBuf,
}

/// Statically declared assets, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetManifest {
    entries: BTreeMap<String, AssetDescriptor>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, descriptor: AssetDescriptor) {
        self.entries.insert(key.into(), descriptor);
    }

    /// Convenience for the common single-image manifest.
    pub fn with_image(mut self, key: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        self.insert(
            key,
            AssetDescriptor {
                kind: AssetKind::Image,
                source: source.into(),
            },
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&AssetDescriptor> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetDescriptor)> {
        self.entries.iter().map(|(key, desc)| (key.as_str(), desc))
    }
}

/// Decoded RGBA8 image, rows ordered top to bottom.
#[derive(Clone)]
pub struct LoadedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl LoadedImage {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn decode(path: &Path) -> Result<Self, LoadError> {
        let image = image::open(path).map_err(|err| LoadError::Failed {
            locator: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(LoadError::Failed {
                locator: path.to_path_buf(),
                reason: "image has no pixels".into(),
            });
        }
        Ok(Self::from_rgba(width, height, rgba.into_raw()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Asset {
    pub key: String,
    pub kind: AssetKind,
    pub source: PathBuf,
    pub data: Option<Arc<LoadedImage>>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("there was an error during loading asset {}: {reason}", .locator.display())]
    Failed { locator: PathBuf, reason: String },
    #[error("asset workers stopped before {pending} asset(s) finished loading")]
    Disconnected { pending: usize },
}

impl LoadError {
    /// Source locator of the asset that failed, if known.
    pub fn locator(&self) -> Option<&Path> {
        match self {
            LoadError::Failed { locator, .. } => Some(locator),
            LoadError::Disconnected { .. } => None,
        }
    }
}

/// Message sent from a loader worker to the polling side.
#[derive(Debug)]
pub enum LoadEvent {
    Loaded { key: String, image: LoadedImage },
    Failed { locator: PathBuf, reason: String },
}

/// Visible per-asset progress marker; exists only while the batch is loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressIndicator {
    pub locator: PathBuf,
    pub percent: u8,
}

/// Every asset of a manifest, each with decoded data attached.
#[derive(Debug, Clone, Default)]
pub struct LoadedAssets {
    assets: BTreeMap<String, Asset>,
}

impl LoadedAssets {
    pub fn get(&self, key: &str) -> Option<&Asset> {
        self.assets.get(key)
    }

    pub fn image(&self, key: &str) -> Option<Arc<LoadedImage>> {
        self.assets.get(key).and_then(|asset| asset.data.clone())
    }

    /// First image asset in key order.
    pub fn first_image(&self) -> Option<(&str, Arc<LoadedImage>)> {
        self.assets.iter().find_map(|(key, asset)| match asset.kind {
            AssetKind::Image => asset.data.clone().map(|data| (key.as_str(), data)),
        })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// In-flight load of a manifest.
///
/// [`AssetLoad::poll`] yields the loaded assets exactly once. There is no
/// timeout: an asset that never reports back keeps the load pending.
pub struct AssetLoad {
    assets: BTreeMap<String, Asset>,
    indicators: BTreeMap<PathBuf, ProgressIndicator>,
    receiver: Receiver<LoadEvent>,
    remaining: usize,
    total: usize,
    finished: bool,
}

impl AssetLoad {
    /// Tracks `manifest` against events arriving on `receiver`.
    pub fn new(manifest: &AssetManifest, receiver: Receiver<LoadEvent>) -> Self {
        let mut assets = BTreeMap::new();
        let mut indicators = BTreeMap::new();
        for (key, descriptor) in manifest.iter() {
            assets.insert(
                key.to_string(),
                Asset {
                    key: key.to_string(),
                    kind: descriptor.kind,
                    source: descriptor.source.clone(),
                    data: None,
                },
            );
            indicators.insert(
                descriptor.source.clone(),
                ProgressIndicator {
                    locator: descriptor.source.clone(),
                    percent: 0,
                },
            );
        }
        let total = assets.len();
        Self {
            assets,
            indicators,
            receiver,
            remaining: total,
            total,
            finished: false,
        }
    }

    pub fn poll(&mut self) -> Result<Option<LoadedAssets>, LoadError> {
        if self.finished {
            return Ok(None);
        }

        while self.remaining > 0 {
            match self.receiver.try_recv() {
                Ok(event) => self.apply(event)?,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    return Err(LoadError::Disconnected {
                        pending: self.remaining,
                    })
                }
            }
        }

        Ok(Some(self.complete()))
    }

    /// Blocks until the batch resolves.
    pub fn wait(mut self) -> Result<LoadedAssets, LoadError> {
        while self.remaining > 0 {
            let event = self.receiver.recv().map_err(|_| LoadError::Disconnected {
                pending: self.remaining,
            })?;
            self.apply(event)?;
        }
        Ok(self.complete())
    }

    pub fn progress_indicators(&self) -> impl Iterator<Item = &ProgressIndicator> {
        self.indicators.values()
    }

    /// Fraction of assets decoded so far, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.total - self.remaining) as f32 / self.total as f32
        }
    }

    fn apply(&mut self, event: LoadEvent) -> Result<(), LoadError> {
        match event {
            LoadEvent::Loaded { key, image } => {
                let Some(asset) = self.assets.get_mut(&key) else {
                    tracing::warn!(%key, "ignoring decoded asset missing from manifest");
                    return Ok(());
                };
                if asset.data.is_some() {
                    return Ok(());
                }
                tracing::debug!(
                    %key,
                    source = %asset.source.display(),
                    width = image.width(),
                    height = image.height(),
                    "asset decoded"
                );
                if let Some(indicator) = self.indicators.get_mut(&asset.source) {
                    indicator.percent = 100;
                }
                asset.data = Some(Arc::new(image));
                self.remaining -= 1;
                Ok(())
            }
            LoadEvent::Failed { locator, reason } => {
                self.finished = true;
                Err(LoadError::Failed { locator, reason })
            }
        }
    }

    fn complete(&mut self) -> LoadedAssets {
        self.finished = true;
        self.indicators.clear();
        LoadedAssets {
            assets: std::mem::take(&mut self.assets),
        }
    }
}

/// Starts loading every asset of a manifest.
pub trait AssetLoader {
    fn load(&self, manifest: &AssetManifest) -> AssetLoad;
}

/// Decodes images from the filesystem on background threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageAssetLoader;

impl AssetLoader for ImageAssetLoader {
    fn load(&self, manifest: &AssetManifest) -> AssetLoad {
        let (sender, receiver) = unbounded();
        for (key, descriptor) in manifest.iter() {
            tracing::info!(%key, kind = %descriptor.kind, source = %descriptor.source.display(), "loading asset");
            spawn_decode(key.to_string(), descriptor.clone(), sender.clone());
        }
        AssetLoad::new(manifest, receiver)
    }
}

fn spawn_decode(key: String, descriptor: AssetDescriptor, sender: Sender<LoadEvent>) {
    let fallback = sender.clone();
    let locator = descriptor.source.clone();
    let spawned = thread::Builder::new()
        .name(format!("texwarp-asset-{key}"))
        .spawn(move || {
            let event = match descriptor.kind {
                AssetKind::Image => match LoadedImage::decode(&descriptor.source) {
                    Ok(image) => LoadEvent::Loaded { key, image },
                    Err(LoadError::Failed { locator, reason }) => {
                        LoadEvent::Failed { locator, reason }
                    }
                    Err(other) => LoadEvent::Failed {
                        locator: descriptor.source.clone(),
                        reason: other.to_string(),
                    },
                },
            };
            let _ = sender.send(event);
        });

    if let Err(err) = spawned {
        let _ = fallback.send(LoadEvent::Failed {
            locator,
            reason: format!("failed to spawn decode worker: {err}"),
        });
    }
}
