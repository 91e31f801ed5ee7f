use std::fs;

use tempfile::TempDir;
use warpconfig::{ConfigError, SceneConfig};

#[test]
fn loads_config_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("texwarp.toml");
    fs::write(
        &path,
        r#"
version = 1
[assets.photo]
kind = "image"
source = "photo.png"
"#,
    )
    .unwrap();

    let config = SceneConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert!(config.assets.contains_key("photo"));
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = SceneConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
