//! Emulator configuration and device identity.
//!
//! [`EmulatorConfig`] is built once at startup (by the binary, from the TOML
//! file and CLI flags, or from defaults in tests) and handed to the device and
//! the WebSocket server.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use deck_core::{DeviceModel, KeyIndexMap};

/// Identifier and serial number the emulator reports to the engine.
pub const EMULATOR_DEVICE_ID: &str = "emulator";

/// Default WebSocket port for remote clients.
pub const DEFAULT_WS_PORT: u16 = 24803;

/// All runtime configuration for the virtual device.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Address the WebSocket server binds to.
    pub ws_bind_addr: SocketAddr,

    /// Device id used in engine commands.
    pub device_id: String,

    /// Model whose layout the client presents.
    pub model: DeviceModel,

    /// Physical ↔ logical key map.  Normally `model.key_map()`; a custom
    /// table from the configuration file replaces it.
    pub key_map: KeyIndexMap,

    /// Initial value of the externally owned control-keys flag, replayed to
    /// every client on startup.
    pub control_keys_enabled: bool,
}

impl EmulatorConfig {
    /// Configuration for `model` with its built-in key map and default
    /// addresses.
    pub fn for_model(model: DeviceModel) -> Self {
        Self {
            model,
            key_map: model.key_map(),
            ..Self::default()
        }
    }

    /// Identity of the device this configuration describes.
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            id: self.device_id.clone(),
            serial: self.device_id.clone(),
            device_type: self.model.display_name().to_string(),
            keys_per_row: self.model.keys_per_row(),
            key_count: self.key_map.key_count(),
        }
    }
}

impl Default for EmulatorConfig {
    /// | Field                | Default              |
    /// |----------------------|----------------------|
    /// | ws_bind_addr         | `0.0.0.0:24803`      |
    /// | device_id            | `"emulator"`         |
    /// | model                | `emulator` (32 keys) |
    /// | control_keys_enabled | `false`              |
    fn default() -> Self {
        let model = DeviceModel::default();
        Self {
            ws_bind_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_WS_PORT,
            )),
            device_id: EMULATOR_DEVICE_ID.to_string(),
            model,
            key_map: model.key_map(),
            control_keys_enabled: false,
        }
    }
}

/// Identity and shape of a device, as the engine lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub serial: String,
    pub device_type: String,
    pub keys_per_row: usize,
    pub key_count: usize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
