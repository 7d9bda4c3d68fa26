//! Control protocol: address routing and datagram construction.

pub mod control;
pub mod packet;

use thiserror::Error;

pub use control::{pack_rgb, route_message, ControlAction};
pub use packet::{bundle_packet, decode_datagram, encode_packet, message_packet, osc_time};

// Re-exported so downstream crates build messages without naming `rosc`.
pub use rosc::{OscMessage, OscPacket, OscTime, OscType};

/// Errors from turning bytes into control messages or back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("malformed control packet: {0}")]
    Decode(String),

    #[error("failed to encode control packet: {0}")]
    Encode(String),
}
