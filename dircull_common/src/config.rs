use crate::{AppConfig, DircullError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "dircull.toml";

/// Application config together with where it was found
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

/// Load the persisted config, writing a default file on first run so there
/// is always something on disk to edit.
pub fn ensure_config(prefer_portable: bool) -> Result<LoadedConfig, DircullError> {
    let (path, portable) = config_file_path(prefer_portable)?;
    ensure_config_at(path, portable)
}

/// Load the persisted config without creating anything
pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, DircullError> {
    let (path, portable) = config_file_path(prefer_portable)?;
    load_config_at(path, portable)
}

fn ensure_config_at(path: PathBuf, portable: bool) -> Result<LoadedConfig, DircullError> {
    let mut loaded = load_config_at(path, portable)?;
    if !loaded.exists {
        save_config(&loaded.path, &loaded.config)?;
        loaded.exists = true;
    }
    Ok(loaded)
}

fn load_config_at(path: PathBuf, portable: bool) -> Result<LoadedConfig, DircullError> {
    let exists = path.exists();

    let mut config = AppConfig::default();
    if exists {
        let data = fs::read_to_string(&path)?;
        config = toml::from_str(&data).map_err(|e| DircullError::Serialization(e.to_string()))?;
    }
    config.portable_mode = portable;

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable,
    })
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), DircullError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data =
        toml::to_string_pretty(config).map_err(|e| DircullError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

pub fn default_cache_dir(portable: bool, config_path: &Path) -> Result<PathBuf, DircullError> {
    if portable {
        let base = config_path
            .parent()
            .map(|path| path.to_path_buf())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        return Ok(base.join("dircull_cache"));
    }

    Ok(project_dirs()?.cache_dir().to_path_buf())
}

/// Portable mode (a config file next to the binary, or explicitly
/// requested) wins over the platform config directory.
fn config_file_path(prefer_portable: bool) -> Result<(PathBuf, bool), DircullError> {
    let portable_path = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)));

    if let Some(portable_path) = portable_path {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    Ok((project_dirs()?.config_dir().join(CONFIG_FILE_NAME), false))
}

fn project_dirs() -> Result<ProjectDirs, DircullError> {
    ProjectDirs::from("", "dircull", "dircull")
        .ok_or_else(|| DircullError::Config("Unable to determine config directory".to_string()))
}
