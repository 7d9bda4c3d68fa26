//! The device event loop and the handle used to talk to it.
//!
//! The [`VirtualDevice`] is moved into a single Tokio task.  Everything that
//! wants to touch it (WebSocket sessions, the engine) sends a
//! [`DeviceRequest`] through a [`DeviceHandle`].  Requests are handled one at
//! a time, in arrival order, which is what makes the image cache and button
//! table safe without locks.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use deck_core::{KeyImage, SessionId};

use super::virtual_device::{check_key, DeviceError, DeviceTransport, VirtualDevice};
use crate::domain::messages::ClientToDeviceMsg;

/// One unit of work for the device task.
pub enum DeviceRequest {
    Connect {
        session: SessionId,
        transport: Box<dyn DeviceTransport>,
    },
    Disconnect {
        session: SessionId,
    },
    /// A message received from a connected client.
    Client {
        session: SessionId,
        msg: ClientToDeviceMsg,
    },
    SetImage {
        key: usize,
        image: KeyImage,
    },
    ClearKey {
        key: usize,
    },
    ClearAll,
    SetBrightness(u8),
    SetControlKeysEnabled(bool),
    Quit,
}

/// Cloneable sender side of the device event loop.
///
/// Engine-facing operations validate their arguments here, synchronously, so
/// the caller gets [`DeviceError::InvalidImageSize`] or
/// [`DeviceError::InvalidKeyIndex`] straight back.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    tx: mpsc::UnboundedSender<DeviceRequest>,
}

impl DeviceHandle {
    fn request(&self, req: DeviceRequest) -> Result<(), DeviceError> {
        self.tx.send(req).map_err(|_| DeviceError::DeviceStopped)
    }

    pub fn connect_client(
        &self,
        session: SessionId,
        transport: impl DeviceTransport + 'static,
    ) -> Result<(), DeviceError> {
        self.request(DeviceRequest::Connect {
            session,
            transport: Box::new(transport),
        })
    }

    pub fn disconnect_client(&self, session: SessionId) -> Result<(), DeviceError> {
        self.request(DeviceRequest::Disconnect { session })
    }

    pub fn client_message(
        &self,
        session: SessionId,
        msg: ClientToDeviceMsg,
    ) -> Result<(), DeviceError> {
        self.request(DeviceRequest::Client { session, msg })
    }

    /// Sets the image of a logical key.
    ///
    /// # Errors
    ///
    /// [`DeviceError::InvalidKeyIndex`], [`DeviceError::InvalidImageSize`],
    /// or [`DeviceError::DeviceStopped`].
    pub fn set_image(&self, key: usize, buffer: Vec<u8>) -> Result<(), DeviceError> {
        check_key(key)?;
        let image = KeyImage::new(buffer)?;
        self.request(DeviceRequest::SetImage { key, image })
    }

    pub fn clear_key(&self, key: usize) -> Result<(), DeviceError> {
        check_key(key)?;
        self.request(DeviceRequest::ClearKey { key })
    }

    pub fn clear_all(&self) -> Result<(), DeviceError> {
        self.request(DeviceRequest::ClearAll)
    }

    pub fn set_brightness(&self, value: u8) -> Result<(), DeviceError> {
        self.request(DeviceRequest::SetBrightness(value))
    }

    pub fn set_control_keys_enabled(&self, enabled: bool) -> Result<(), DeviceError> {
        self.request(DeviceRequest::SetControlKeysEnabled(enabled))
    }

    /// Stops the event loop.  Connected clients are dropped.
    pub fn quit(&self) -> Result<(), DeviceError> {
        self.request(DeviceRequest::Quit)
    }

    /// `false` once the event loop has exited.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Creates a handle and the receiver [`run_device`] consumes.
pub fn device_channel() -> (DeviceHandle, mpsc::UnboundedReceiver<DeviceRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DeviceHandle { tx }, rx)
}

/// Runs the device until [`DeviceRequest::Quit`] arrives or every handle is
/// dropped.
///
/// Emits the device-ready command before handling the first request.
pub async fn run_device(mut device: VirtualDevice, mut rx: mpsc::UnboundedReceiver<DeviceRequest>) {
    device.ready();

    while let Some(req) = rx.recv().await {
        match req {
            DeviceRequest::Connect { session, transport } => {
                device.connect_client(session, transport);
            }
            DeviceRequest::Disconnect { session } => device.disconnect_client(session),
            DeviceRequest::Client { session, msg } => match msg {
                ClientToDeviceMsg::Startup => device.on_client_startup(session),
                ClientToDeviceMsg::Down { key } => device.on_client_press(session, key, true),
                ClientToDeviceMsg::Up { key } => device.on_client_press(session, key, false),
            },
            DeviceRequest::SetImage { key, image } => {
                if let Err(e) = device.store_image(key, image) {
                    warn!("set image failed: {e}");
                }
            }
            DeviceRequest::ClearKey { key } => {
                if let Err(e) = device.clear_key(key) {
                    warn!("clear key failed: {e}");
                }
            }
            DeviceRequest::ClearAll => device.clear_all(),
            DeviceRequest::SetBrightness(value) => device.set_brightness(value),
            DeviceRequest::SetControlKeysEnabled(enabled) => {
                device.set_control_keys_enabled(enabled);
            }
            DeviceRequest::Quit => {
                debug!("quit requested");
                break;
            }
        }
    }

    info!("virtual device '{}' stopped", device.info().id);
}

/// Spawns [`run_device`] on the current runtime.
pub fn spawn_device(device: VirtualDevice) -> (DeviceHandle, JoinHandle<()>) {
    let (handle, rx) = device_channel();
    let task = tokio::spawn(run_device(device, rx));
    (handle, task)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::config::EmulatorConfig;
    use crate::domain::messages::DeviceToClientMsg;
    use deck_core::{EngineCommand, KEY_IMAGE_SIZE, MAX_BUTTONS};
    use uuid::Uuid;

    fn start() -> (
        DeviceHandle,
        JoinHandle<()>,
        mpsc::UnboundedReceiver<EngineCommand>,
    ) {
        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        let device = VirtualDevice::new(&EmulatorConfig::default(), Arc::new(bus_tx));
        let (handle, task) = spawn_device(device);
        (handle, task, bus_rx)
    }

    #[tokio::test]
    async fn test_device_ready_is_first_command() {
        let (_handle, _task, mut bus) = start();

        let first = bus.recv().await.unwrap();

        assert_eq!(
            first,
            EngineCommand::DeviceReady {
                device_id: "emulator".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_handle_rejects_bad_image_synchronously() {
        let (handle, _task, _bus) = start();

        assert_eq!(
            handle.set_image(0, vec![1, 2, 3]),
            Err(DeviceError::InvalidImageSize {
                expected: KEY_IMAGE_SIZE,
                actual: 3
            })
        );
        assert_eq!(
            handle.clear_key(MAX_BUTTONS),
            Err(DeviceError::InvalidKeyIndex {
                key: MAX_BUTTONS,
                max: MAX_BUTTONS
            })
        );
    }

    #[tokio::test]
    async fn test_requests_are_applied_in_order() {
        // Arrange
        let (handle, _task, _bus) = start();
        let (tx, mut rx) = mpsc::unbounded_channel::<DeviceToClientMsg>();
        let session = Uuid::new_v4();
        handle.connect_client(session, tx).unwrap();

        // Act
        handle.set_image(0, vec![7; KEY_IMAGE_SIZE]).unwrap();
        handle.clear_key(0).unwrap();

        // Assert
        assert_eq!(rx.recv().await.unwrap().type_name(), "fillImage");
        assert_eq!(
            rx.recv().await.unwrap(),
            DeviceToClientMsg::ClearKey { key: 7 }
        );
    }

    #[tokio::test]
    async fn test_client_press_reaches_engine() {
        let (handle, _task, mut bus) = start();
        let session = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel::<DeviceToClientMsg>();
        handle.connect_client(session, tx).unwrap();

        handle
            .client_message(session, ClientToDeviceMsg::Down { key: 8 })
            .unwrap();

        let _ready = bus.recv().await.unwrap();
        let EngineCommand::DeviceKey { key, pressed, .. } = bus.recv().await.unwrap() else {
            panic!("expected DeviceKey");
        };
        assert_eq!(key, 15);
        assert!(pressed);
    }

    #[tokio::test]
    async fn test_quit_stops_loop_and_drops_clients() {
        // Arrange
        let (handle, task, _bus) = start();
        let (tx, mut rx) = mpsc::unbounded_channel::<DeviceToClientMsg>();
        handle.connect_client(Uuid::new_v4(), tx).unwrap();

        // Act
        handle.quit().unwrap();
        task.await.unwrap();

        // Assert
        assert!(!handle.is_running());
        assert!(rx.recv().await.is_none(), "client transport must be dropped");
        assert_eq!(handle.clear_all(), Err(DeviceError::DeviceStopped));
    }
}
