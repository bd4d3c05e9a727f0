use crate::error::{FfError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_DIR: &str = ".config/ff-cli";
pub const JENKINS_CONFIG_FILE: &str = "jenkins.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Global config directory: `~/.config/ff-cli`.
pub fn default_config_dir() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(FfError::HomeNotFound)?;
    Ok(home.join(CONFIG_DIR))
}

/// Resolve the config directory, preferring an explicit override.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_dir(),
    }
}

pub fn jenkins_config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(JENKINS_CONFIG_FILE)
}
