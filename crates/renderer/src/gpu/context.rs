use anyhow::{anyhow, bail, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;

use crate::types::{AdapterProfile, Antialiasing, ColorSpaceMode, GpuPowerPreference};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl SurfaceColorSpace {
    pub(crate) fn from_mode(mode: ColorSpaceMode) -> Self {
        match mode {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        }
    }
}

/// Device, queue and the configured window surface.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub color_space: SurfaceColorSpace,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    pub(crate) fn new<W>(
        window: &W,
        size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
        power: GpuPowerPreference,
    ) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = create_surface(&instance, window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power.to_wgpu(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }))
        .context("no GPU adapter can present to this window")?;
        let adapter_profile = describe_adapter(&adapter);

        let limits = adapter.limits();
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let max_side = limits.max_texture_dimension_2d;
        if size.width > max_side || size.height > max_side {
            bail!(
                "window is {}x{} but the adapter renders at most {max_side} pixels per side",
                size.width,
                size.height
            );
        }

        let capabilities = surface.get_capabilities(&adapter);
        let color_space = SurfaceColorSpace::from_mode(color_space);
        let surface_format = pick_surface_format(&capabilities.formats, color_space)?;

        let features = adapter.get_texture_format_features(surface_format).flags;
        let sample_count = resolve_sample_count(
            antialiasing,
            features.supported_sample_counts(),
            features.contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
            adapter_profile.is_software(),
        );
        // 8x and 16x are adapter-specific extensions of the format's features.
        let required_features = if sample_count > 4 {
            wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("texwarp device"),
            required_features,
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        }))
        .context("adapter refused to create a device")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: if capabilities.present_modes.contains(&wgpu::PresentMode::Fifo) {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoVsync
            },
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: Vec::new(),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        tracing::debug!(
            format = ?surface_format,
            present_mode = ?surface_config.present_mode,
            sample_count,
            "window surface ready"
        );

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            surface_config,
            size,
            sample_count,
            surface_format,
            color_space,
            adapter_profile,
        })
    }

    /// Zero-sized requests (minimised windows) keep the previous configuration.
    pub(crate) fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.size = size;
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.reconfigure();
    }

    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }
}

fn create_surface<W>(instance: &wgpu::Instance, window: &W) -> Result<wgpu::Surface<'static>>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let raw_display_handle = window
        .display_handle()
        .map_err(|err| anyhow!("window has no display handle: {err}"))?
        .as_raw();
    let raw_window_handle = window
        .window_handle()
        .map_err(|err| anyhow!("window has no native handle: {err}"))?
        .as_raw();

    // SAFETY: the window outlives the surface; both are dropped when the event loop exits.
    unsafe {
        instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
            raw_display_handle,
            raw_window_handle,
        })
    }
    .context("failed to create window surface")
}

fn describe_adapter(adapter: &wgpu::Adapter) -> AdapterProfile {
    let info = adapter.get_info();
    let profile = AdapterProfile {
        name: info.name,
        backend: info.backend,
        device_type: info.device_type,
    };
    tracing::info!(
        adapter = %profile.name,
        backend = ?profile.backend,
        kind = ?profile.device_type,
        software = profile.is_software(),
        "using GPU adapter"
    );
    profile
}

/// Linear output wants an sRGB surface so the hardware re-encodes on write.
fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
    color_space: SurfaceColorSpace,
) -> Result<wgpu::TextureFormat> {
    let wants_srgb = color_space == SurfaceColorSpace::Linear;
    if let Some(format) = formats.iter().copied().find(|f| f.is_srgb() == wants_srgb) {
        return Ok(format);
    }
    let Some(&fallback) = formats.first() else {
        bail!("window surface exposes no texture formats");
    };
    tracing::warn!(?fallback, wants_srgb, "no surface format with the requested encoding");
    Ok(fallback)
}

/// Sample count for the plane pass; 1 disables MSAA.
fn resolve_sample_count(
    antialiasing: Antialiasing,
    mut supported: Vec<u32>,
    supports_resolve: bool,
    is_software: bool,
) -> u32 {
    supported.push(1);
    supported.sort_unstable();
    supported.dedup();

    let requested = match antialiasing {
        Antialiasing::Off => return 1,
        Antialiasing::Auto => supported.last().copied().unwrap_or(1),
        Antialiasing::Samples(count) => count,
    };
    let count = supported
        .iter()
        .copied()
        .filter(|&count| count <= requested)
        .max()
        .unwrap_or(1);
    if count != requested {
        tracing::warn!(requested, using = count, ?supported, "MSAA sample count unavailable");
    }

    if count > 1 && !supports_resolve {
        tracing::warn!("surface format cannot resolve multisampled targets; MSAA off");
        return 1;
    }
    if count > 1 && is_software {
        tracing::warn!(count, "MSAA off on a software adapter");
        return 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antialias_off_renders_single_sample() {
        assert_eq!(resolve_sample_count(Antialiasing::Off, vec![1, 4], true, false), 1);
    }

    #[test]
    fn auto_picks_highest_supported_count() {
        assert_eq!(resolve_sample_count(Antialiasing::Auto, vec![4, 1, 8], true, false), 8);
    }

    #[test]
    fn unsupported_request_falls_back_downwards() {
        assert_eq!(
            resolve_sample_count(Antialiasing::Samples(8), vec![1, 2, 4], true, false),
            4
        );
        assert_eq!(
            resolve_sample_count(Antialiasing::Samples(3), vec![1, 4], true, false),
            1
        );
    }

    #[test]
    fn msaa_needs_resolve_and_hardware() {
        assert_eq!(resolve_sample_count(Antialiasing::Samples(4), vec![1, 4], false, false), 1);
        assert_eq!(resolve_sample_count(Antialiasing::Auto, vec![1, 4], true, true), 1);
    }

    #[test]
    fn surface_format_follows_colour_space() {
        let formats = [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Bgra8UnormSrgb];
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Linear).unwrap(),
            wgpu::TextureFormat::Bgra8UnormSrgb
        );
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Gamma).unwrap(),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            pick_surface_format(&formats[..1], SurfaceColorSpace::Linear).unwrap(),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert!(pick_surface_format(&[], SurfaceColorSpace::Gamma).is_err());
    }

    #[test]
    fn colour_space_modes_map_to_surface_encoding() {
        assert_eq!(SurfaceColorSpace::from_mode(ColorSpaceMode::Auto), SurfaceColorSpace::Gamma);
        assert_eq!(SurfaceColorSpace::from_mode(ColorSpaceMode::Gamma), SurfaceColorSpace::Gamma);
        assert_eq!(SurfaceColorSpace::from_mode(ColorSpaceMode::Linear), SurfaceColorSpace::Linear);
    }
}
