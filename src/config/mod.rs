//! Configuration module for relq.
//!
//! Handles the settings file, environment variables and the derived
//! compiler options.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, CompilerSettings, LoggingSettings, Settings, SettingsError,
};
