//! Commands sent to the automation engine, and the bus that carries them.
//!
//! Both subsystems speak the same vocabulary: the virtual device reports key
//! presses by logical index, the control listener reports presses and style
//! changes by bank and button.  Neither knows what the engine does with them.

use tokio::sync::mpsc;

use super::button::ButtonStates;

/// A style field change requested by a control peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleChange {
    /// Background colour packed as `0xRRGGBB`.
    BgColor(u32),
    /// Text colour packed as `0xRRGGBB`.
    Color(u32),
    Text(String),
}

impl StyleChange {
    /// Name of the style field, as the engine knows it.
    pub fn field(&self) -> &'static str {
        match self {
            StyleChange::BgColor(_) => "bgcolor",
            StyleChange::Color(_) => "color",
            StyleChange::Text(_) => "text",
        }
    }
}

/// Everything this crate's consumers can ask of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Press or release of a bank button (control protocol).
    BankPress {
        bank: u32,
        button: u32,
        pressed: bool,
    },
    /// Press or release of a key on a device, with the device's full table.
    DeviceKey {
        device_id: String,
        key: usize,
        pressed: bool,
        states: ButtonStates,
    },
    /// Change one style field of a bank button.
    SetStyle {
        bank: u32,
        button: u32,
        style: StyleChange,
    },
    /// Ask the engine to re-render a bank button.
    Invalidate { bank: u32, button: u32 },
    /// A device finished starting and can receive images.
    DeviceReady { device_id: String },
}

/// Narrow capability for handing commands to the engine.
///
/// Implementations must not block: emitting happens inside event handlers
/// that run to completion.
pub trait CommandBus: Send + Sync {
    fn emit(&self, command: EngineCommand);
}

/// The production bus: an unbounded channel drained by the engine side.
///
/// A closed channel means the engine is gone; the command is dropped.
impl CommandBus for mpsc::UnboundedSender<EngineCommand> {
    fn emit(&self, command: EngineCommand) {
        if self.send(command).is_err() {
            tracing::debug!("engine command bus closed; command dropped");
        }
    }
}
