//! Renderer crate for texwarp, an interactive image plane with a custom shader.
//!
//! The crate loads an image, composes a single plane scene around it, and
//! drives a fixed-step animation loop that reacts to the pointer. The overall
//! flow is:
//!
//! ```text
//!   CLI / texwarp
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ AssetLoader ──▶ StartupGate ──▶ SceneComposer
//!                                                        │ Scene
//!                                                        ▼
//!          winit event loop ──▶ AppContext ──▶ ViewportController / PointerTracker
//!                                   │
//!                                   └─▶ AnimationLoop ──▶ GpuState::draw() ─▶ GPU UBO
//! ```
//!
//! Everything above `GpuState` is plain data and can be driven without a
//! window; the `DrawTarget` and `FrameScheduler` traits are the seams where the
//! window runtime plugs in.

mod animation;
mod app;
mod assets;
mod compile;
mod gpu;
mod pointer;
mod scene;
mod tween;
mod types;
mod uniforms;
mod viewport;
mod window;

use anyhow::{bail, Context, Result};
use tracing::info;

pub use animation::{AnimationLoop, FrameScheduler, LoopState, ManualScheduler, DEFAULT_TIME_STEP};
pub use app::{AppContext, DrawError, DrawTarget, FrameOutcome, StartupError, StartupGate};
pub use assets::{
    Asset, AssetDescriptor, AssetKind, AssetLoad, AssetLoader, AssetManifest, ImageAssetLoader,
    LoadError, LoadEvent, LoadedAssets, LoadedImage, ProgressIndicator,
};
pub use compile::{wrap_fragment, wrap_vertex, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
pub use pointer::{
    PointerSettings, PointerState, PointerTracker, TransitionDirection, DEFAULT_SPEED_SMOOTHING,
    DEFAULT_TRANSITION,
};
pub use scene::{
    CameraSettings, Mesh, OrbitControls, PerspectiveCamera, PlaneGeometry, PlaneVertex, Ray,
    Raycaster, Scene, SceneComposer, SceneError, ShaderMaterial, ShaderSources,
    DEFAULT_CLEAR_COLOR,
};
pub use tween::{Ease, TweenedValue};
pub use types::{
    AdapterProfile, AnimationSettings, Antialiasing, ColorSpaceMode, GpuPowerPreference,
    RendererConfig, ShaderPaths,
};
pub use uniforms::{ShaderUniformState, TextureHandle, UNIFORM_NAMES};
pub use viewport::{
    cover_fit, fov_for_unit_height, plane_scale, CoverFit, ViewportController, ViewportError,
    ViewportState,
};

/// Entry point used by the CLI.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and blocks until it is closed or rendering fails.
    pub fn run(&mut self) -> Result<()> {
        if self.config.assets.is_empty() {
            bail!("no assets to load; at least one image is required");
        }
        let shaders = self
            .config
            .shaders
            .load()
            .context("failed to load shader sources")?;
        info!(
            assets = self.config.assets.len(),
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            "starting renderer"
        );
        window::run_window(&self.config, shaders, &ImageAssetLoader)
    }
}
