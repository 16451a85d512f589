//! Resolves where wallplay looks for its wall description.
//!
//! `WALLPLAY_CONFIG_DIR` overrides the platform config directory reported by
//! `directories-next`.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "WALLPLAY_CONFIG_DIR";
pub const WALL_FILE: &str = "wall.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "wallplay";
const APPLICATION: &str = "wallplay";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn wall_file(&self) -> PathBuf {
        self.config_dir.join(WALL_FILE)
    }

    /// The explicit path when given, otherwise the default wall file.
    pub fn resolve_config(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.wall_file())
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
