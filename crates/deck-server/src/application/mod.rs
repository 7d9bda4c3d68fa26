//! Application layer for deck-server.

pub mod control_service;

pub use control_service::{ControlService, AUTO_RELEASE_DELAY};
