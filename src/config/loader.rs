// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{AppConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; semantic checks happen in
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Like [`load_from_path`], but a missing file yields the default
/// (empty) configuration so CLI flags alone can drive a run.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(RawConfigFile::default());
    }
    load_from_path(path)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<AppConfig> {
    let raw_config = load_from_path(&path)?;
    let config = AppConfig::try_from(raw_config)?;
    Ok(config)
}

/// `Testwatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Testwatch.toml")
}
