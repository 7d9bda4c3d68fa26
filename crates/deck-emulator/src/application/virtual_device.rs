//! The virtual device: shared image cache, button table and client sessions.
//!
//! # One device, many clients (for beginners)
//!
//! Several remote clients may present the same virtual device at once.  They
//! must all show the same thing, so the device (not the client session) owns
//! the state:
//!
//! - one image cache, indexed by **logical** key,
//! - one [`ButtonStates`] table, indexed by **logical** key,
//! - the control-keys flag.
//!
//! A session is little more than a [`DeviceTransport`] to push messages
//! through.  Every state change is broadcast to all sessions; a client that
//! (re)starts asks for a replay of the cache.
//!
//! All methods take `&mut self` and run to completion.  The device is owned by
//! a single task (see [`super::device_service`]), so no locking is needed.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use deck_core::{
    ButtonStates, CommandBus, EngineCommand, ImageError, KeyImage, KeyIndexMap, SessionId,
    MAX_BUTTONS,
};

use crate::domain::config::{DeviceInfo, EmulatorConfig};
use crate::domain::messages::DeviceToClientMsg;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors reported to the engine by device operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The image buffer has the wrong length.  Nothing was stored or sent.
    #[error("invalid image size: expected {expected} bytes, got {actual}")]
    InvalidImageSize { expected: usize, actual: usize },

    /// The logical key is outside the engine's grid.
    #[error("logical key {key} is out of range (0..{max})")]
    InvalidKeyIndex { key: usize, max: usize },

    /// The device event loop is no longer running.
    #[error("virtual device has stopped")]
    DeviceStopped,
}

impl From<ImageError> for DeviceError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidImageSize { expected, actual } => {
                DeviceError::InvalidImageSize { expected, actual }
            }
        }
    }
}

/// Checks that `key` addresses the logical grid.
pub(crate) fn check_key(key: usize) -> Result<(), DeviceError> {
    if key < MAX_BUTTONS {
        Ok(())
    } else {
        Err(DeviceError::InvalidKeyIndex {
            key,
            max: MAX_BUTTONS,
        })
    }
}

// ── Transport capability ──────────────────────────────────────────────────────

/// The client end of a session has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("client transport closed")]
pub struct TransportClosed;

/// Narrow capability for pushing messages to one connected client.
///
/// `deliver` must not block.  An error means the client is gone and the
/// session will be dropped.
pub trait DeviceTransport: Send {
    fn deliver(&self, msg: DeviceToClientMsg) -> Result<(), TransportClosed>;
}

/// The production transport: a channel drained by the session's writer task.
impl DeviceTransport for mpsc::UnboundedSender<DeviceToClientMsg> {
    fn deliver(&self, msg: DeviceToClientMsg) -> Result<(), TransportClosed> {
        self.send(msg).map_err(|_| TransportClosed)
    }
}

/// Lifecycle of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

/// What the cache holds for one logical key.
///
/// A cleared key is recorded as such rather than as black pixels, so an image
/// the engine rendered all black still replays as an image.
#[derive(Debug, Clone)]
enum CachedKey {
    Image(KeyImage),
    Cleared,
}

// ── VirtualDevice ─────────────────────────────────────────────────────────────

pub struct VirtualDevice {
    info: DeviceInfo,
    key_map: KeyIndexMap,
    control_keys_enabled: bool,
    images: Vec<Option<CachedKey>>,
    blank: KeyImage,
    buttons: ButtonStates,
    clients: HashMap<SessionId, Box<dyn DeviceTransport>>,
    bus: Arc<dyn CommandBus>,
}

impl VirtualDevice {
    pub fn new(config: &EmulatorConfig, bus: Arc<dyn CommandBus>) -> Self {
        Self {
            info: config.device_info(),
            key_map: config.key_map,
            control_keys_enabled: config.control_keys_enabled,
            images: vec![None; MAX_BUTTONS],
            blank: KeyImage::blank(),
            buttons: ButtonStates::new(),
            clients: HashMap::new(),
            bus,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Announces the device to the engine.
    pub fn ready(&self) {
        info!(
            "virtual device '{}' ready ({} keys)",
            self.info.id, self.info.key_count
        );
        self.bus.emit(EngineCommand::DeviceReady {
            device_id: self.info.id.clone(),
        });
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    /// Registers a client.  It receives every broadcast from now on.
    pub fn connect_client(&mut self, session: SessionId, transport: Box<dyn DeviceTransport>) {
        self.clients.insert(session, transport);
        info!(
            "client {session} connected ({} connected)",
            self.clients.len()
        );
    }

    pub fn disconnect_client(&mut self, session: SessionId) {
        if self.clients.remove(&session).is_some() {
            info!(
                "client {session} disconnected ({} connected)",
                self.clients.len()
            );
        }
    }

    pub fn session_state(&self, session: SessionId) -> SessionState {
        if self.clients.contains_key(&session) {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Replays the control-keys flag and every cached image to one client.
    ///
    /// Runs as a single handler, so the client has the complete cache before
    /// any later update reaches it.
    pub fn on_client_startup(&mut self, session: SessionId) {
        let Some(transport) = self.clients.get(&session) else {
            debug!("startup from unknown session {session} ignored");
            return;
        };

        let mut replay = vec![DeviceToClientMsg::ControlKeysEnabled {
            enabled: self.control_keys_enabled,
        }];
        for (logical, cached) in self.images.iter().enumerate() {
            let (Some(cached), Some(physical)) = (cached, self.key_map.to_physical(logical))
            else {
                continue;
            };
            replay.push(match cached {
                CachedKey::Image(image) => DeviceToClientMsg::fill_image(physical, image),
                CachedKey::Cleared => DeviceToClientMsg::ClearKey { key: physical },
            });
        }

        debug!("replaying {} messages to client {session}", replay.len());
        let delivered = replay.into_iter().try_for_each(|msg| transport.deliver(msg));
        if delivered.is_err() {
            self.drop_client(session);
        }
    }

    /// Handles a press or release reported by a client, by physical key.
    ///
    /// Keys the model cannot map are dropped silently.
    pub fn on_client_press(&mut self, session: SessionId, physical: usize, pressed: bool) {
        if self.session_state(session) == SessionState::Disconnected {
            debug!("key event from disconnected session {session} ignored");
            return;
        }
        let Some(logical) = self.key_map.to_logical(physical) else {
            debug!("physical key {physical} has no logical key; ignored");
            return;
        };

        self.buttons.set(logical, pressed, session);
        self.bus.emit(EngineCommand::DeviceKey {
            device_id: self.info.id.clone(),
            key: logical,
            pressed,
            states: self.buttons.clone(),
        });
    }

    pub fn button_states(&self) -> &ButtonStates {
        &self.buttons
    }

    // ── Engine-facing operations ──────────────────────────────────────────────

    /// Validates and stores a raw buffer for `logical`, then broadcasts it.
    ///
    /// # Errors
    ///
    /// [`DeviceError::InvalidKeyIndex`] or [`DeviceError::InvalidImageSize`];
    /// in both cases nothing is stored or sent.
    pub fn set_image(&mut self, logical: usize, buffer: Vec<u8>) -> Result<(), DeviceError> {
        check_key(logical)?;
        let image = KeyImage::new(buffer)?;
        self.store_image(logical, image)
    }

    /// Stores an already validated image and broadcasts it.
    ///
    /// Keys the model cannot display are cached but not sent.
    ///
    /// # Errors
    ///
    /// [`DeviceError::InvalidKeyIndex`] if `logical` is outside the grid.
    pub fn store_image(&mut self, logical: usize, image: KeyImage) -> Result<(), DeviceError> {
        check_key(logical)?;
        let msg = self
            .key_map
            .to_physical(logical)
            .map(|physical| DeviceToClientMsg::fill_image(physical, &image));
        self.images[logical] = Some(CachedKey::Image(image));

        if let Some(msg) = msg {
            self.broadcast(&msg);
        }
        Ok(())
    }

    /// Blanks one key.
    ///
    /// # Errors
    ///
    /// [`DeviceError::InvalidKeyIndex`] if `logical` is outside the grid.
    pub fn clear_key(&mut self, logical: usize) -> Result<(), DeviceError> {
        check_key(logical)?;
        self.blank_key(logical);
        Ok(())
    }

    /// Blanks every logical key.
    pub fn clear_all(&mut self) {
        for logical in 0..MAX_BUTTONS {
            self.blank_key(logical);
        }
    }

    /// Accepted for parity with physical devices; has no effect here.
    pub fn set_brightness(&mut self, value: u8) {
        debug!("brightness {value} ignored by virtual device");
    }

    /// Updates the control-keys flag and tells every client.
    pub fn set_control_keys_enabled(&mut self, enabled: bool) {
        self.control_keys_enabled = enabled;
        self.broadcast(&DeviceToClientMsg::ControlKeysEnabled { enabled });
    }

    pub fn control_keys_enabled(&self) -> bool {
        self.control_keys_enabled
    }

    /// Image currently shown on `logical`; a cleared key reads as blank.
    pub fn cached_image(&self, logical: usize) -> Option<&KeyImage> {
        match self.images.get(logical)? {
            Some(CachedKey::Image(image)) => Some(image),
            Some(CachedKey::Cleared) => Some(&self.blank),
            None => None,
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// `logical` must be below `MAX_BUTTONS`.
    fn blank_key(&mut self, logical: usize) {
        self.images[logical] = Some(CachedKey::Cleared);
        if let Some(physical) = self.key_map.to_physical(logical) {
            self.broadcast(&DeviceToClientMsg::ClearKey { key: physical });
        }
    }

    fn broadcast(&mut self, msg: &DeviceToClientMsg) {
        let closed: Vec<SessionId> = self
            .clients
            .iter()
            .filter(|(_, transport)| transport.deliver(msg.clone()).is_err())
            .map(|(session, _)| *session)
            .collect();

        for session in closed {
            self.drop_client(session);
        }
    }

    fn drop_client(&mut self, session: SessionId) {
        debug!("client {session} transport closed");
        self.disconnect_client(session);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
