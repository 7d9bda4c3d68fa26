//! Infrastructure layer for deck-server.
//!
//! - `network`      UDP control listener
//! - `storage`      TOML configuration file
//! - `engine_sink`  logging stand-in for the external engine

pub mod engine_sink;
pub mod network;
pub mod storage;
