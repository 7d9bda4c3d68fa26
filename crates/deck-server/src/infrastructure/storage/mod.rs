//! Storage infrastructure: the TOML configuration file.

pub mod config;

pub use config::{
    config_file_path, load_config, load_or_init_config, save_config, AppConfig, ConfigError,
    ControlSection, EmulatorSection,
};
