use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use renderer::{
    AnimationSettings, Antialiasing, AssetDescriptor, AssetKind, AssetManifest, CameraSettings,
    ColorSpaceMode, Ease, GpuPowerPreference, Renderer, RendererConfig, ShaderPaths,
};
use tracing_subscriber::EnvFilter;
use warpconfig::{
    AntialiasSetting, AssetKindSetting, ColorSpaceSetting, EaseSetting, GpuPowerSetting,
    SceneConfig,
};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Asset name given to the image passed on the command line.
pub const CLI_IMAGE_ASSET: &str = "image";

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let config = resolve_config(config_path, args)?;
    config.validate().context("invalid configuration")?;
    let renderer_config = renderer_config(&config)?;

    tracing::info!(
        assets = renderer_config.assets.len(),
        antialias = %renderer_config.antialiasing,
        color_space = %renderer_config.color_space,
        "launching texwarp"
    );
    Renderer::new(renderer_config).run()
}

/// Layers built-in defaults, the config file and command-line flags, in that order.
pub fn resolve_config(config_path: Option<&Path>, args: &RunArgs) -> Result<SceneConfig> {
    let explicit = config_path.map(Path::to_path_buf);
    let file = match explicit {
        Some(path) => Some(path),
        None => {
            let paths = AppPaths::discover()?;
            let candidate = paths.default_config_file();
            tracing::debug!(config_dir = %paths.config_dir().display(), "resolved texwarp paths");
            candidate.is_file().then_some(candidate)
        }
    };

    let mut config = match &file {
        Some(path) => {
            let mut config = SceneConfig::load(path)?;
            if let Some(base) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                rebase_relative_paths(&mut config, base);
            }
            tracing::debug!(path = %path.display(), "loaded scene configuration");
            config
        }
        None => SceneConfig::default(),
    };

    apply_overrides(&mut config, args);
    Ok(config)
}

pub fn print_config(config: &SceneConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn check_config(config: &SceneConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;

    for (name, asset) in &config.assets {
        if !asset.source.is_file() {
            bail!("asset '{name}' source {} does not exist", asset.source.display());
        }
    }
    for path in [&config.shader.vertex, &config.shader.fragment].into_iter().flatten() {
        if !path.is_file() {
            bail!("shader {} does not exist", path.display());
        }
    }

    println!("configuration OK: {} asset(s)", config.assets.len());
    Ok(())
}

/// Paths inside a config file are relative to the file, not the working directory.
fn rebase_relative_paths(config: &mut SceneConfig, base: &Path) {
    let rebase = |path: &mut PathBuf| {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    };
    for asset in config.assets.values_mut() {
        rebase(&mut asset.source);
    }
    for path in [&mut config.shader.vertex, &mut config.shader.fragment]
        .into_iter()
        .flatten()
    {
        rebase(path);
    }
}

fn apply_overrides(config: &mut SceneConfig, args: &RunArgs) {
    if let Some(image) = &args.image {
        config.insert_image(CLI_IMAGE_ASSET, image.clone());
        config.shader.texture = Some(CLI_IMAGE_ASSET.to_string());
    }
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(title) = &args.title {
        config.window.title = title.clone();
    }
    if let Some(antialias) = args.antialias {
        config.render.antialias = antialias;
    }
    if let Some(color_space) = args.color_space {
        config.render.color_space = color_space;
    }
    if let Some(vertex) = &args.vertex {
        config.shader.vertex = Some(vertex.clone());
    }
    if let Some(fragment) = &args.fragment {
        config.shader.fragment = Some(fragment.clone());
    }
}

pub fn renderer_config(config: &SceneConfig) -> Result<RendererConfig> {
    let mut assets = AssetManifest::new();
    for (name, entry) in &config.assets {
        let kind = match entry.kind {
            AssetKindSetting::Image => AssetKind::Image,
        };
        assets.insert(
            name.clone(),
            AssetDescriptor {
                kind,
                source: entry.source.clone(),
            },
        );
    }

    Ok(RendererConfig {
        surface_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        assets,
        texture_key: config.shader.texture.clone(),
        shaders: ShaderPaths {
            vertex: config.shader.vertex.clone(),
            fragment: config.shader.fragment.clone(),
        },
        camera: CameraSettings {
            distance: config.camera.distance,
            near: config.camera.near,
            far: config.camera.far,
            initial_fov_degrees: config.camera.fov,
        },
        animation: AnimationSettings {
            time_step: config.animation.time_step,
            speed_smoothing: config.animation.speed_smoothing,
            transition: config.animation.transition,
            ease: map_ease(config.animation.ease),
        },
        clear_color: config.clear_color()?,
        antialiasing: map_antialias(config.render.antialias),
        color_space: map_color_space(config.render.color_space),
        power_preference: match config.render.gpu_power {
            GpuPowerSetting::Low => GpuPowerPreference::LowPower,
            GpuPowerSetting::High => GpuPowerPreference::HighPerformance,
        },
    })
}

fn map_ease(ease: EaseSetting) -> Ease {
    match ease {
        EaseSetting::Linear => Ease::Linear,
        EaseSetting::Smoothstep => Ease::Smoothstep,
        EaseSetting::EaseInOut => Ease::EaseInOut,
        EaseSetting::Power1Out => Ease::Power1Out,
    }
}

fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples(count) => Antialiasing::Samples(count),
    }
}

fn map_color_space(setting: ColorSpaceSetting) -> ColorSpaceMode {
    match setting {
        ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
        ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
        ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn cli_image_becomes_the_texture() {
        let args = RunArgs {
            image: Some(PathBuf::from("photo.jpg")),
            size: Some((640, 480)),
            ..RunArgs::default()
        };
        let mut config = SceneConfig::default();
        config.insert_image("backdrop", "backdrop.png");
        apply_overrides(&mut config, &args);

        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.shader.texture.as_deref(), Some(CLI_IMAGE_ASSET));
        assert_eq!((config.window.width, config.window.height), (640, 480));
        config.validate().unwrap();
    }

    #[test]
    fn file_paths_are_relative_to_the_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.toml");
        std::fs::write(
            &path,
            r#"
version = 1
[assets.photo]
kind = "image"
source = "photo.png"
[shader]
fragment = "/abs/wave.frag"
"#,
        )
        .unwrap();

        let config = resolve_config(Some(&path), &RunArgs::default()).unwrap();
        assert_eq!(config.assets["photo"].source, dir.path().join("photo.png"));
        assert_eq!(config.shader.fragment, Some(PathBuf::from("/abs/wave.frag")));
    }

    #[test]
    fn renderer_config_carries_every_section() {
        let mut config = SceneConfig::parse(
            r##"
version = 1
[window]
clear_color = "#000000"
[animation]
transition = "250ms"
ease = "linear"
[camera]
distance = 3.0
[render]
antialias = "auto"
color_space = "gamma"
gpu_power = "high"
"##,
        )
        .unwrap();
        config.insert_image("photo", "photo.png");

        let renderer = renderer_config(&config).unwrap();
        assert_eq!(renderer.assets.len(), 1);
        assert_eq!(renderer.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(renderer.animation.transition, Duration::from_millis(250));
        assert_eq!(renderer.animation.ease, Ease::Linear);
        assert_eq!(renderer.camera.distance, 3.0);
        assert_eq!(renderer.antialiasing, Antialiasing::Auto);
        assert_eq!(renderer.color_space, ColorSpaceMode::Gamma);
        assert_eq!(renderer.power_preference, GpuPowerPreference::HighPerformance);
    }
}
