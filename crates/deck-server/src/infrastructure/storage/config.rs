//! TOML configuration for the `deckd` daemon.
//!
//! The file lives in the platform config directory:
//! - Windows:  `%APPDATA%\DeckBridge\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/deckbridge/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/DeckBridge/config.toml`
//!
//! ```toml
//! log_level = "info"
//!
//! [emulator]
//! enabled = true
//! control_keys_enabled = false
//! bind_address = "0.0.0.0"
//! ws_port = 24803
//! model = "emulator"
//!
//! [control]
//! enabled = true
//! bind_address = "0.0.0.0"
//! port = 12321
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section or
//! a missing key all fall back to the values above.  On first run the
//! defaults are written out so the operator has something to edit.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use deck_core::{DeviceModel, KeyIndexMap, KeymapError};
use deck_emulator::domain::config::{EmulatorConfig, DEFAULT_WS_PORT, EMULATOR_DEVICE_ID};

use crate::infrastructure::network::DEFAULT_CONTROL_PORT;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A `bind_address` is not an IP address.
    #[error("invalid bind address '{value}' in [{section}]")]
    InvalidAddress {
        section: &'static str,
        value: String,
    },

    /// The custom `key_table` is not a valid permutation.
    #[error("invalid emulator key_table: {0}")]
    InvalidKeyTable(#[from] KeymapError),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub emulator: EmulatorSection,
    #[serde(default)]
    pub control: ControlSection,
}

/// `[emulator]`: the virtual device and its WebSocket server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmulatorSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Replayed to every client on startup.  Owned by the operator.
    #[serde(default)]
    pub control_keys_enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    #[serde(default)]
    pub model: DeviceModel,
    /// Optional physical → logical table replacing the model's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_table: Option<Vec<u8>>,
}

/// `[control]`: the OSC listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_control_port")]
    pub port: u16,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}
fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            emulator: EmulatorSection::default(),
            control: ControlSection::default(),
        }
    }
}

impl Default for EmulatorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            control_keys_enabled: false,
            bind_address: default_bind_address(),
            ws_port: default_ws_port(),
            model: DeviceModel::default(),
            key_table: None,
        }
    }
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            port: default_control_port(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

fn parse_ip(section: &'static str, value: &str) -> Result<IpAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        section,
        value: value.to_string(),
    })
}

impl AppConfig {
    /// Builds the emulator's runtime configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidAddress`] or [`ConfigError::InvalidKeyTable`].
    pub fn emulator_config(&self) -> Result<EmulatorConfig, ConfigError> {
        let section = &self.emulator;
        let ip = parse_ip("emulator", &section.bind_address)?;
        let key_map = match &section.key_table {
            Some(table) => KeyIndexMap::try_from_table(table)?,
            None => section.model.key_map(),
        };

        Ok(EmulatorConfig {
            ws_bind_addr: SocketAddr::new(ip, section.ws_port),
            device_id: EMULATOR_DEVICE_ID.to_string(),
            model: section.model,
            key_map,
            control_keys_enabled: section.control_keys_enabled,
        })
    }

    /// Address of the control listener.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidAddress`] if `bind_address` is not an IP.
    pub fn control_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = parse_ip("control", &self.control.bind_address)?;
        Ok(SocketAddr::new(ip, self.control.port))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path for this platform.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`] if the base directory is unknown.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the file at `path`, returning defaults if it does not exist.
///
/// # Errors
///
/// [`ConfigError::Io`] for file-system errors other than "not found", and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Like [`load_config`], but writes the defaults to `path` on first run.
///
/// # Errors
///
/// Any error from [`load_config`] or [`save_config`].
pub fn load_or_init_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config(path);
    }
    let config = AppConfig::default();
    save_config(path, &config)?;
    tracing::info!("wrote default configuration to {}", path.display());
    Ok(config)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// [`ConfigError::Io`] or [`ConfigError::Serialize`].
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DeckBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("deckbridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DeckBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("deckbridge-test-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn test_default_ports_and_flags() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.emulator.ws_port, 24803);
        assert_eq!(cfg.control.port, 12321);
        assert!(cfg.emulator.enabled);
        assert!(cfg.control.enabled);
        assert!(!cfg.emulator.control_keys_enabled);
        assert_eq!(cfg.emulator.model, DeviceModel::Emulator);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("empty TOML must parse");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
log_level = "debug"

[emulator]
control_keys_enabled = true
model = "mini"

[control]
port = 9000
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.emulator.control_keys_enabled);
        assert_eq!(cfg.emulator.model, DeviceModel::Mini);
        assert_eq!(cfg.emulator.ws_port, 24803);
        assert_eq!(cfg.control.port, 9000);
        assert_eq!(cfg.control.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_round_trip_omits_absent_key_table() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.control.port = 7000;

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert!(!toml_str.contains("key_table"));
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_emulator_config_from_defaults() {
        let emu = AppConfig::default().emulator_config().unwrap();
        assert_eq!(emu.ws_bind_addr, "0.0.0.0:24803".parse().unwrap());
        assert_eq!(emu.device_id, "emulator");
        assert_eq!(emu.key_map, DeviceModel::Emulator.key_map());
    }

    #[test]
    fn test_custom_key_table_replaces_model_map() {
        let mut cfg = AppConfig::default();
        cfg.emulator.key_table = Some(vec![1, 0, 2]);

        let emu = cfg.emulator_config().unwrap();

        assert_eq!(emu.key_map.key_count(), 3);
        assert_eq!(emu.key_map.to_logical(0), Some(1));
    }

    #[test]
    fn test_invalid_key_table_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.emulator.key_table = Some(vec![0, 0]);

        assert!(matches!(
            cfg.emulator_config(),
            Err(ConfigError::InvalidKeyTable(KeymapError::DuplicateLogical {
                logical: 0
            }))
        ));
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.control.bind_address = "not-an-ip".to_string();

        assert!(matches!(
            cfg.control_addr(),
            Err(ConfigError::InvalidAddress {
                section: "control",
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = temp_config_path("missing");
        let _ = std::fs::remove_file(&path);

        let cfg = load_config(&path).expect("missing file is not an error");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_or_init_writes_defaults_then_reads_them_back() {
        // Arrange
        let path = temp_config_path("init");
        let _ = std::fs::remove_file(&path);

        // Act
        let first = load_or_init_config(&path).expect("first run");
        let on_disk = std::fs::read_to_string(&path).expect("file must exist");
        let second = load_or_init_config(&path).expect("second run");

        // Assert
        assert!(on_disk.contains("control_keys_enabled = false"));
        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let path = temp_config_path("malformed");
        save_config(&path, &AppConfig::default()).unwrap();
        std::fs::write(&path, "log_level = [").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
