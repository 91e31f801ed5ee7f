use std::path::PathBuf;

use clap::{Parser, Subcommand};
use warpconfig::{AntialiasSetting, ColorSpaceSetting};

#[derive(Parser, Debug)]
#[command(
    name = "texwarp",
    author,
    version,
    about = "Interactive image plane distorted by a pointer-driven shader"
)]
pub struct Cli {
    /// Scene configuration file; defaults to `texwarp.toml` in the config directory.
    #[arg(long, global = true, value_name = "FILE", env = "TEXWARP_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Image to display; becomes the `image` asset and drives the `texture` uniform.
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE")]
    pub antialias: Option<AntialiasSetting>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE")]
    pub color_space: Option<ColorSpaceSetting>,

    /// Replace the built-in vertex shader.
    #[arg(long, value_name = "FILE")]
    pub vertex: Option<PathBuf>,

    /// Replace the built-in fragment shader.
    #[arg(long, value_name = "FILE")]
    pub fragment: Option<PathBuf>,

    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the effective scene configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the merged configuration as TOML.
    Print,
    /// Validate the merged configuration and report problems.
    Check,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let (width, height) = spec
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }
    Ok((width, height))
}
