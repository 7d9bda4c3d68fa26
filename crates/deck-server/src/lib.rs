//! deck-server library crate.
//!
//! Hosts the two control surfaces of DeckBridge inside one process:
//!
//! ```text
//! OSC peer (UDP 12321) ──► control_listener ──► ControlService ──┐
//!                                                                 ├──► CommandBus ──► engine
//! Remote client (WS 24803) ──► deck-emulator VirtualDevice ───────┘
//! ```
//!
//! - `application/`     ControlService: routed control actions → engine commands
//! - `infrastructure/`
//!     - `network/`     UDP control listener and its outbound handle
//!     - `storage/`     TOML configuration file
//!     - `engine_sink`  stand-in engine that logs every command
//!
//! The `deckd` binary (`main.rs`) wires these together.

/// Application layer: control-message handling.
pub mod application;

/// Infrastructure layer: sockets, configuration file, engine sink.
pub mod infrastructure;

pub use application::ControlService;
pub use deck_emulator::application::DeviceHandle;
pub use infrastructure::network::ControlHandle;
