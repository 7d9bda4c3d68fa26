//! Turns routed control actions into engine commands.
//!
//! Routing and argument validation live in `deck_core::protocol::control`;
//! this service decides what each action means for the engine:
//!
//! | Action     | Commands emitted                                           |
//! |------------|------------------------------------------------------------|
//! | `Trigger`  | press(true) now, press(false) after [`AUTO_RELEASE_DELAY`] |
//! | `Press`    | press(pressed)                                             |
//! | `SetStyle` | style-set, then invalidate                                 |

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use deck_core::protocol::{route_message, ControlAction, OscMessage};
use deck_core::{CommandBus, EngineCommand};

/// Delay between the press and the automatic release of a trigger.
pub const AUTO_RELEASE_DELAY: Duration = Duration::from_millis(20);

#[derive(Clone)]
pub struct ControlService {
    bus: Arc<dyn CommandBus>,
}

impl ControlService {
    pub fn new(bus: Arc<dyn CommandBus>) -> Self {
        Self { bus }
    }

    /// Routes and applies one inbound message.
    ///
    /// Returns `false` if the message was dropped as unrecognised or
    /// malformed.
    pub fn handle_message(&self, msg: &OscMessage) -> bool {
        match route_message(msg) {
            Some(action) => {
                debug!("control {} → {action:?}", msg.addr);
                self.apply(action);
                true
            }
            None => {
                debug!(
                    "control message {} ({} args) dropped",
                    msg.addr,
                    msg.args.len()
                );
                false
            }
        }
    }

    /// Emits the engine commands for `action`.
    ///
    /// A trigger schedules its release on the current Tokio runtime; the
    /// release cannot be cancelled once scheduled.
    pub fn apply(&self, action: ControlAction) {
        match action {
            ControlAction::Trigger { bank, button } => {
                self.press(bank, button, true);
                let bus = Arc::clone(&self.bus);
                tokio::spawn(async move {
                    tokio::time::sleep(AUTO_RELEASE_DELAY).await;
                    bus.emit(EngineCommand::BankPress {
                        bank,
                        button,
                        pressed: false,
                    });
                });
            }
            ControlAction::Press {
                bank,
                button,
                pressed,
            } => self.press(bank, button, pressed),
            ControlAction::SetStyle {
                bank,
                button,
                style,
            } => {
                self.bus.emit(EngineCommand::SetStyle {
                    bank,
                    button,
                    style,
                });
                self.bus.emit(EngineCommand::Invalidate { bank, button });
            }
        }
    }

    fn press(&self, bank: u32, button: u32, pressed: bool) {
        self.bus.emit(EngineCommand::BankPress {
            bank,
            button,
            pressed,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
