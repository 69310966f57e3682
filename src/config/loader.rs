// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file at the *default* location
/// yields the built-in defaults instead of an error.
///
/// An explicitly requested path must exist.
pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !explicit && !path.exists() {
        debug!(path = ?path, "no config file found; using defaults");
        return ConfigFile::try_from(RawConfigFile::default());
    }
    load_and_validate(path)
}

/// Default config location: `Stackrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Stackrun.toml")
}
