//! JSON messages for the remote-client session protocol.
//!
//! Every frame is a JSON text frame with a `"type"` discriminant:
//!
//! ```text
//! client → device:  {"type":"startup"}
//!                   {"type":"down","key":7}
//!                   {"type":"up","key":7}
//! device → client:  {"type":"controlKeysEnabled","enabled":true}
//!                   {"type":"fillImage","key":7,"data":"<base64 RGB>"}
//!                   {"type":"clearKey","key":7}
//! ```
//!
//! Key indices on this wire are always **physical** indices, in the device's
//! own scan order.  Remapping to the engine's logical grid happens in the
//! application layer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use deck_core::KeyImage;

// ── Client → Device ───────────────────────────────────────────────────────────

/// Messages a remote client sends to the virtual device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientToDeviceMsg {
    /// The client is ready to display; the device replays its full state.
    Startup,
    /// Physical key pressed.
    Down { key: usize },
    /// Physical key released.
    Up { key: usize },
}

// ── Device → Client ───────────────────────────────────────────────────────────

/// Messages the virtual device sends to a remote client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeviceToClientMsg {
    /// Whether the client should show its own control keys.
    ControlKeysEnabled { enabled: bool },
    /// Raw RGB image for a physical key, base64-encoded.
    FillImage { key: usize, data: String },
    /// Blank a physical key.
    ClearKey { key: usize },
}

impl DeviceToClientMsg {
    /// Builds a `fillImage` message for physical key `key`.
    pub fn fill_image(key: usize, image: &KeyImage) -> Self {
        DeviceToClientMsg::FillImage {
            key,
            data: STANDARD.encode(image.as_bytes()),
        }
    }

    /// Short name for log lines; never includes image data.
    pub fn type_name(&self) -> &'static str {
        match self {
            DeviceToClientMsg::ControlKeysEnabled { .. } => "controlKeysEnabled",
            DeviceToClientMsg::FillImage { .. } => "fillImage",
            DeviceToClientMsg::ClearKey { .. } => "clearKey",
        }
    }

    /// Physical key the message addresses, if any.
    pub fn key(&self) -> Option<usize> {
        match self {
            DeviceToClientMsg::ControlKeysEnabled { .. } => None,
            DeviceToClientMsg::FillImage { key, .. } | DeviceToClientMsg::ClearKey { key } => {
                Some(*key)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
