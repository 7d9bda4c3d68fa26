//! Infrastructure layer for deck-emulator: the WebSocket transport.

pub mod ws_server;

pub use ws_server::{run_server, serve};
