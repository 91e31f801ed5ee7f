use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn texwarp(config_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_texwarp"));
    command
        .env("TEXWARP_CONFIG_DIR", config_dir)
        .env_remove("TEXWARP_CONFIG")
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn config_print_emits_parseable_toml() {
    let root = TempDir::new().unwrap();

    let output = texwarp(root.path())
        .args(["config", "print"])
        .output()
        .expect("failed to run texwarp config print");

    assert!(output.status.success());
    let printed = String::from_utf8(output.stdout).unwrap();
    let parsed = warpconfig::SceneConfig::parse(&printed).expect("printed config parses");
    assert_eq!(parsed, warpconfig::SceneConfig::default());
}

#[test]
fn config_check_accepts_a_complete_config() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("photo.png"), b"not decoded by check").unwrap();
    fs::write(
        root.path().join("texwarp.toml"),
        r#"
version = 1
[assets.photo]
kind = "image"
source = "photo.png"
"#,
    )
    .unwrap();

    let output = texwarp(root.path())
        .args(["config", "check"])
        .output()
        .expect("failed to run texwarp config check");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 asset(s)"));
}

#[test]
fn config_check_rejects_an_empty_manifest() {
    let root = TempDir::new().unwrap();

    let status = texwarp(root.path())
        .args(["config", "check"])
        .status()
        .expect("failed to run texwarp config check");

    assert!(!status.success());
}

#[test]
fn config_check_reports_missing_images() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("scene.toml");
    fs::write(
        &config,
        r#"
version = 1
[assets.photo]
kind = "image"
source = "missing.png"
"#,
    )
    .unwrap();

    let output = texwarp(root.path())
        .args(["config", "check", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run texwarp config check");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.png"));
}
