use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub assets: BTreeMap<String, AssetEntry>,
    #[serde(default)]
    pub shader: ShaderSection,
    #[serde(default)]
    pub animation: AnimationSection,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub render: RenderSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub clear_color: String,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "texwarp".into(),
            clear_color: "#eeeeee".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKindSetting {
    Image,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssetEntry {
    pub kind: AssetKindSetting,
    pub source: PathBuf,
}

impl AssetEntry {
    pub fn image(source: impl Into<PathBuf>) -> Self {
        Self {
            kind: AssetKindSetting::Image,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShaderSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<PathBuf>,
    /// Asset bound to the `texture` uniform; the first image otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EaseSetting {
    Linear,
    Smoothstep,
    EaseInOut,
    #[default]
    Power1Out,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationSection {
    pub time_step: f64,
    pub speed_smoothing: f32,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub transition: Duration,
    pub ease: EaseSetting,
}

impl Default for AnimationSection {
    fn default() -> Self {
        Self {
            time_step: 0.05,
            speed_smoothing: 0.1,
            transition: Duration::from_millis(500),
            ease: EaseSetting::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraSection {
    pub distance: f32,
    pub near: f32,
    pub far: f32,
    /// Field of view before the first resize recomputes it.
    pub fov: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            distance: 2.0,
            near: 0.001,
            far: 10_000.0,
            fov: 45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AntialiasSetting {
    Auto,
    #[default]
    Off,
    Samples(u32),
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 | 4 | 8 | 16 => Some(Self::Samples(samples)),
            _ => None,
        }
    }
}

impl FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "auto" | "max" => Ok(Self::Auto),
            "off" | "none" | "disabled" => Ok(Self::Off),
            other => other
                .parse::<u32>()
                .ok()
                .and_then(Self::from_samples)
                .ok_or_else(|| {
                    format!("invalid antialias setting '{other}'; expected auto, off, 2, 4, 8 or 16")
                }),
        }
    }
}

impl fmt::Display for AntialiasSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Off => f.write_str("off"),
            Self::Samples(count) => write!(f, "{count}"),
        }
    }
}

impl Serialize for AntialiasSetting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Samples(count) => serializer.serialize_u32(*count),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for AntialiasSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => raw.parse().map_err(de::Error::custom),
            Helper::Num(value) if value < 0 => {
                Err(de::Error::custom("antialias value must be non-negative"))
            }
            Helper::Num(value) => value.to_string().parse().map_err(de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    Auto,
    Gamma,
    #[default]
    Linear,
}

impl FromStr for ColorSpaceSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gamma" | "srgb-off" => Ok(Self::Gamma),
            "linear" => Ok(Self::Linear),
            other => Err(format!(
                "invalid color space '{other}'; expected auto, gamma or linear"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPowerSetting {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSection {
    pub antialias: AntialiasSetting,
    pub color_space: ColorSpaceSetting,
    pub gpu_power: GpuPowerSetting,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            window: WindowSection::default(),
            assets: BTreeMap::new(),
            shader: ShaderSection::default(),
            animation: AnimationSection::default(),
            camera: CameraSection::default(),
            render: RenderSection::default(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA components in `[0, 1]`.
pub fn parse_hex_color(raw: &str) -> Result<[f32; 4], String> {
    let hex = raw.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).chain("ff".chars()).collect(),
        6 => format!("{hex}ff"),
        8 => hex.to_string(),
        _ => return Err(format!("invalid color '{raw}'; expected #rgb, #rrggbb or #rrggbbaa")),
    };

    let mut rgba = [0.0; 4];
    for (index, channel) in rgba.iter_mut().enumerate() {
        let pair = expanded
            .get(index * 2..index * 2 + 2)
            .ok_or_else(|| format!("invalid color '{raw}'"))?;
        let value =
            u8::from_str_radix(pair, 16).map_err(|_| format!("invalid color '{raw}'"))?;
        *channel = f32::from(value) / 255.0;
    }
    Ok(rgba)
}

impl SceneConfig {
    /// Parses and validates a complete configuration.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses without validating, so command-line overrides can still fill gaps.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Registers an image asset, replacing any asset of the same name.
    pub fn insert_image(&mut self, name: impl Into<String>, source: impl Into<PathBuf>) {
        self.assets.insert(name.into(), AssetEntry::image(source));
    }

    pub fn clear_color(&self) -> Result<[f32; 4], ConfigError> {
        parse_hex_color(&self.window.clear_color)
            .map_err(|err| ConfigError::Invalid(format!("window.clear_color: {err}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        self.clear_color()?;

        if self.assets.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one asset".into(),
            ));
        }
        for (name, asset) in &self.assets {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("asset names may not be empty".into()));
            }
            if asset.source.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "asset '{name}' has an empty source"
                )));
            }
        }

        if let Some(texture) = &self.shader.texture {
            if !self.assets.contains_key(texture) {
                return Err(ConfigError::Invalid(format!(
                    "shader.texture references unknown asset '{texture}'"
                )));
            }
        }

        let animation = &self.animation;
        if !(animation.time_step.is_finite() && animation.time_step > 0.0) {
            return Err(ConfigError::Invalid(
                "animation.time_step must be greater than zero".into(),
            ));
        }
        if !(animation.speed_smoothing > 0.0 && animation.speed_smoothing <= 1.0) {
            return Err(ConfigError::Invalid(
                "animation.speed_smoothing must be in (0, 1]".into(),
            ));
        }

        let camera = &self.camera;
        if !(camera.distance.is_finite() && camera.distance > 0.0) {
            return Err(ConfigError::Invalid(
                "camera.distance must be greater than zero".into(),
            ));
        }
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (near {}, far {})",
                camera.near, camera.far
            )));
        }
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::Invalid(
                "camera.fov must be between 0 and 180 degrees".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[window]
width = 800
height = 600
title = "demo"
clear_color = "#102030"

[assets.photo]
kind = "image"
source = "images/photo.jpg"

[assets.mask]
kind = "image"
source = "images/mask.png"

[shader]
fragment = "shaders/wave.frag"
texture = "photo"

[animation]
time_step = 0.02
transition = "750ms"
ease = "ease-in-out"

[render]
antialias = 4
color_space = "gamma"
"##;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.assets["photo"].source, PathBuf::from("images/photo.jpg"));
        assert_eq!(config.shader.texture.as_deref(), Some("photo"));
        assert_eq!(config.animation.transition, Duration::from_millis(750));
        assert_eq!(config.animation.ease, EaseSetting::EaseInOut);
        assert_eq!(config.animation.speed_smoothing, 0.1);
        assert_eq!(config.render.antialias, AntialiasSetting::Samples(4));
        assert_eq!(config.render.color_space, ColorSpaceSetting::Gamma);
        assert_eq!(config.camera, CameraSection::default());
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = SceneConfig::from_toml_str(
            r#"
version = 1
[assets.only]
kind = "image"
source = "a.png"
"#,
        )
        .unwrap();
        assert_eq!(config.window, WindowSection::default());
        assert_eq!(config.animation, AnimationSection::default());
        assert_eq!(config.render.antialias, AntialiasSetting::Off);
        assert_eq!(config.render.color_space, ColorSpaceSetting::Linear);
        assert_eq!(config.clear_color().unwrap()[0], 0xee as f32 / 255.0);
    }

    #[test]
    fn rejects_empty_manifest() {
        let err = SceneConfig::from_toml_str("version = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("at least one asset")));
    }

    #[test]
    fn parse_allows_empty_manifest() {
        let config = SceneConfig::parse("version = 1\n").unwrap();
        assert!(config.assets.is_empty());
    }

    #[test]
    fn rejects_unknown_asset_kind() {
        let err = SceneConfig::from_toml_str(
            r#"
version = 1
[assets.clip]
kind = "video"
source = "clip.mp4"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_positive_time_step() {
        let err = SceneConfig::from_toml_str(
            r#"
version = 1
[assets.a]
kind = "image"
source = "a.png"
[animation]
time_step = 0.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("time_step")));
    }

    #[test]
    fn rejects_unknown_texture_asset() {
        let err = SceneConfig::from_toml_str(
            r#"
version = 1
[assets.a]
kind = "image"
source = "a.png"
[shader]
texture = "b"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("'b'")));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = SceneConfig::parse(
            r#"
version = 1
[animation]
transition = "soon"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn numeric_durations_are_seconds() {
        let config = SceneConfig::parse("version = 1\n[animation]\ntransition = 1.5\n").unwrap();
        assert_eq!(config.animation.transition, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut config = SceneConfig::default();
        config.insert_image("a", "a.png");
        config.version = 2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn antialias_accepts_names_and_counts() {
        let parse = |raw: &str| raw.parse::<AntialiasSetting>();
        assert_eq!(parse("auto"), Ok(AntialiasSetting::Auto));
        assert_eq!(parse("None"), Ok(AntialiasSetting::Off));
        assert_eq!(parse("8"), Ok(AntialiasSetting::Samples(8)));
        assert_eq!(parse("1"), Ok(AntialiasSetting::Off));
        assert!("3".parse::<AntialiasSetting>().is_err());
    }

    #[test]
    fn hex_colors_expand() {
        assert_eq!(parse_hex_color("#fff").unwrap(), [1.0; 4]);
        assert_eq!(parse_hex_color("000000").unwrap(), [0.0, 0.0, 0.0, 1.0]);
        let rgba = parse_hex_color("#ff000080").unwrap();
        assert_eq!(rgba[0], 1.0);
        assert!((rgba[3] - 128.0 / 255.0).abs() < 1e-6);
        assert!(parse_hex_color("#ggg").is_err());
        assert!(parse_hex_color("#12345").is_err());
    }

    #[test]
    fn printed_config_parses_back() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let printed = config.to_toml().unwrap();
        assert!(printed.contains("transition = \"750ms\""));
        assert!(printed.contains("antialias = 4"));
        assert_eq!(SceneConfig::from_toml_str(&printed).unwrap(), config);
    }
}
