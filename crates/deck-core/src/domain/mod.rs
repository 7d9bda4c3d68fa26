//! Domain types shared by the virtual device and the control listener.
//!
//! Nothing in here performs I/O.  The only outward-facing piece is the
//! [`command::CommandBus`] trait, which the infrastructure layers implement
//! (or feed from a channel) to reach the engine.

pub mod button;
pub mod command;
pub mod image;

pub use button::{ButtonState, ButtonStates, SessionId};
pub use command::{CommandBus, EngineCommand, StyleChange};
pub use image::{ImageError, KeyImage, KEY_IMAGE_SIZE};
