use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::animation::DEFAULT_TIME_STEP;
use crate::assets::AssetManifest;
use crate::compile::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
use crate::pointer::{PointerSettings, DEFAULT_SPEED_SMOOTHING, DEFAULT_TRANSITION};
use crate::scene::{CameraSettings, ShaderSources, DEFAULT_CLEAR_COLOR};
use crate::tween::Ease;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Gamma-encoded swapchain; textures sampled as stored.
    Auto,
    /// Treat shader outputs/textures as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Decode textures to linear and let an sRGB swapchain re-encode on write.
    #[default]
    Linear,
}

impl fmt::Display for ColorSpaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpaceMode::Auto => f.write_str("auto"),
            ColorSpaceMode::Gamma => f.write_str("gamma"),
            ColorSpaceMode::Linear => f.write_str("linear"),
        }
    }
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Render directly into the swapchain.
    #[default]
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl fmt::Display for Antialiasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Antialiasing::Auto => f.write_str("auto"),
            Antialiasing::Off => f.write_str("off"),
            Antialiasing::Samples(count) => write!(f, "{count}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    LowPower,
    HighPerformance,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Details of the adapter picked at start-up.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Frame clock, pointer smoothing and press transition tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    pub time_step: f64,
    pub speed_smoothing: f32,
    pub transition: Duration,
    pub ease: Ease,
}

impl AnimationSettings {
    pub fn pointer_settings(&self) -> PointerSettings {
        PointerSettings {
            speed_smoothing: self.speed_smoothing,
            transition: self.transition,
            ease: self.ease,
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            speed_smoothing: DEFAULT_SPEED_SMOOTHING,
            transition: DEFAULT_TRANSITION,
            ease: Ease::Power1Out,
        }
    }
}

/// Optional shader overrides; `None` selects the built-in distortion shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

impl ShaderPaths {
    pub fn load(&self) -> Result<ShaderSources> {
        Ok(ShaderSources {
            vertex: read_or_default(self.vertex.as_deref(), DEFAULT_VERTEX_SHADER)?,
            fragment: read_or_default(self.fragment.as_deref(), DEFAULT_FRAGMENT_SHADER)?,
        })
    }
}

fn read_or_default(path: Option<&Path>, fallback: &str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read shader at {}", path.display())),
        None => Ok(fallback.to_string()),
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Assets that must load before the scene is built.
    pub assets: AssetManifest,
    /// Image asset bound to the `texture` uniform; first image when unset.
    pub texture_key: Option<String>,
    pub shaders: ShaderPaths,
    pub camera: CameraSettings,
    pub animation: AnimationSettings,
    /// RGBA, components in `[0, 1]`, sRGB encoded.
    pub clear_color: [f32; 4],
    pub antialiasing: Antialiasing,
    pub color_space: ColorSpaceMode,
    pub power_preference: GpuPowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "texwarp".to_string(),
            assets: AssetManifest::new(),
            texture_key: None,
            shaders: ShaderPaths::default(),
            camera: CameraSettings::default(),
            animation: AnimationSettings::default(),
            clear_color: DEFAULT_CLEAR_COLOR,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            power_preference: GpuPowerPreference::default(),
        }
    }
}
