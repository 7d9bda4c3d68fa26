//! Network infrastructure: the UDP control listener.

pub mod control_listener;

pub use control_listener::{
    bind_socket, spawn_listener, start_control_listener, ControlHandle, ListenerError,
    OutboundRequest, DEFAULT_CONTROL_PORT, MAX_DATAGRAM_SIZE,
};
