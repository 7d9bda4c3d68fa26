//! Domain layer for deck-emulator.
//!
//! Plain data: the emulator's configuration and identity, and the JSON
//! messages exchanged with remote clients.  No sockets, no tasks.

pub mod config;
pub mod messages;

pub use config::{DeviceInfo, EmulatorConfig};
pub use messages::{ClientToDeviceMsg, DeviceToClientMsg};
