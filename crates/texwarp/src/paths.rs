use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

/// Overrides the platform config directory (used by tests and packaging).
pub const ENV_CONFIG_DIR: &str = "TEXWARP_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "texwarp.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let config_dir = match env::var_os(ENV_CONFIG_DIR).filter(|value| !value.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("org", "texwarp", "texwarp")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| anyhow!("no home directory to place texwarp config in"))?,
        };
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_dir_override_wins() {
        let _lock = ENV_LOCK.lock().unwrap();
        let root = TempDir::new().unwrap();
        let previous = env::var_os(ENV_CONFIG_DIR);
        env::set_var(ENV_CONFIG_DIR, root.path());

        let paths = AppPaths::discover();

        match previous {
            Some(value) => env::set_var(ENV_CONFIG_DIR, value),
            None => env::remove_var(ENV_CONFIG_DIR),
        }
        let paths = paths.unwrap();
        assert_eq!(paths.config_dir(), root.path());
        assert_eq!(paths.default_config_file(), root.path().join("texwarp.toml"));
    }
}
