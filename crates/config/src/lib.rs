//! Configuration loading, env substitution, env overrides, and validation.
//!
//! Config files: `linebot.toml`, `linebot.yaml`, `linebot.yml`, or `linebot.json`,
//! searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in the raw file before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        ApiConfig, ChannelConfig, LineBotConfig, MetricsConfig, ResponderConfig, ServerConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
