// src/config/mod.rs

//! Configuration: TOML model, validation, and loading.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    AppConfig, RawConfigFile, RawWatchSection, RunnerSection, WatchConfiguration,
    DEFAULT_ALL_TARGET, DEFAULT_DEBOUNCE,
};
pub use validate::debounce_from_millis;
