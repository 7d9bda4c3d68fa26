//! Application layer for deck-emulator.
//!
//! - [`virtual_device`] holds the device state and the rules for changing it.
//! - [`device_service`] runs that state on one task and hands out handles.

pub mod device_service;
pub mod virtual_device;

pub use device_service::{
    device_channel, run_device, spawn_device, DeviceHandle, DeviceRequest,
};
pub use virtual_device::{
    DeviceError, DeviceTransport, SessionState, TransportClosed, VirtualDevice,
};
