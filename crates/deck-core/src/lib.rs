//! # deck-core
//!
//! Shared library for DeckBridge containing the key-index translation tables,
//! the key image and button-state types, the engine command vocabulary, and
//! the control-protocol routing rules.
//!
//! This crate is used by both the virtual device (`deck-emulator`) and the
//! control listener (`deck-server`).  It opens no sockets and spawns no tasks.
//!
//! # Architecture overview (for beginners)
//!
//! DeckBridge sits between remote control surfaces and a grid-of-buttons
//! automation engine.  The engine addresses its buttons in a row-major grid
//! of [`MAX_BUTTONS`] keys, [`KEYS_PER_ROW`] wide.  Control surfaces talk
//! to it in two ways:
//!
//! - **`keymap`** – A remote client pretending to be a physical key device
//!   reports keys in the device's own scan order.  The key-index maps convert
//!   between that *physical* order and the engine's *logical* grid.
//!
//! - **`domain`** – Key images, the per-key pressed table, and the commands
//!   sent to the engine through the [`CommandBus`].
//!
//! - **`protocol`** – The path-addressed control protocol (OSC over UDP):
//!   which addresses are recognised, how their arguments are validated, and
//!   how outbound messages and time-tagged bundles are built.

pub mod domain;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `deck_core::KeyIndexMap` instead of `deck_core::keymap::KeyIndexMap`.
pub use domain::button::{ButtonState, ButtonStates, SessionId};
pub use domain::command::{CommandBus, EngineCommand, StyleChange};
pub use domain::image::{ImageError, KeyImage, KEY_IMAGE_SIZE};
pub use keymap::{DeviceModel, KeyIndexMap, KeymapError};
pub use protocol::control::{route_message, ControlAction};
pub use protocol::ControlError;

/// Total number of keys the engine can address on one device.
pub const MAX_BUTTONS: usize = 32;

/// Width of the engine's logical grid.
pub const KEYS_PER_ROW: usize = 8;
