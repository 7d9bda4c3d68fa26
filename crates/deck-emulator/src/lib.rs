//! deck-emulator library crate.
//!
//! Presents remote clients as a physical multi-key input/display device.
//! Clients connect over WebSocket, report key presses in the device's own
//! physical order, and receive the key images the engine renders.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Remote client (JSON over WebSocket)
//!         ↕
//! [deck-emulator]
//!   ├── domain/           EmulatorConfig, DeviceInfo, session wire messages
//!   ├── application/
//!   │     ├── virtual_device/  image cache, button table, broadcast, remap
//!   │     └── device_service/  the device event loop and its handle
//!   └── infrastructure/
//!         └── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         ↕
//! Engine (deck_core::CommandBus)
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` depends on `domain` and `deck-core`; it only touches
//!   clients through the [`application::DeviceTransport`] capability.
//! - `infrastructure` owns sockets and spawns tasks.

/// Domain layer: configuration and wire message types.
pub mod domain;

/// Application layer: the virtual device and its event loop.
pub mod application;

/// Infrastructure layer: WebSocket server.
pub mod infrastructure;
