//! Per-key pressed state for one device.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MAX_BUTTONS;

/// Identifier of one connected remote client session.
pub type SessionId = Uuid;

/// State of a single logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonState {
    pub pressed: bool,
    /// Session whose event last changed this key, if any.
    pub session: Option<SessionId>,
}

/// Fixed-size table of [`ButtonState`], one entry per logical key.
///
/// Built once when the device starts and never resized.  Concurrent presses
/// of the same key from different sessions are last-writer-wins in arrival
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonStates {
    keys: [ButtonState; MAX_BUTTONS],
}

impl ButtonStates {
    /// All keys released, no owning session.
    pub fn new() -> Self {
        Self {
            keys: [ButtonState::default(); MAX_BUTTONS],
        }
    }

    /// Records a press or release of `logical` by `session`.
    ///
    /// Returns `false` (and changes nothing) if `logical` is out of range.
    pub fn set(&mut self, logical: usize, pressed: bool, session: SessionId) -> bool {
        match self.keys.get_mut(logical) {
            Some(state) => {
                state.pressed = pressed;
                state.session = Some(session);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, logical: usize) -> Option<&ButtonState> {
        self.keys.get(logical)
    }

    pub fn is_pressed(&self, logical: usize) -> bool {
        self.get(logical).is_some_and(|s| s.pressed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ButtonState> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for ButtonStates {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_has_all_keys_released() {
        let states = ButtonStates::new();
        assert_eq!(states.len(), MAX_BUTTONS);
        assert!(states.iter().all(|s| !s.pressed && s.session.is_none()));
    }

    #[test]
    fn test_set_records_pressed_and_session() {
        let mut states = ButtonStates::new();
        let session = Uuid::new_v4();

        assert!(states.set(3, true, session));

        assert!(states.is_pressed(3));
        assert_eq!(states.get(3).unwrap().session, Some(session));
        assert!(!states.is_pressed(4));
    }

    #[test]
    fn test_set_out_of_range_is_rejected() {
        let mut states = ButtonStates::new();
        assert!(!states.set(MAX_BUTTONS, true, Uuid::new_v4()));
        assert!(states.iter().all(|s| !s.pressed));
    }

    #[test]
    fn test_later_writer_wins() {
        let mut states = ButtonStates::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        states.set(9, true, a);
        states.set(9, false, b);

        assert!(!states.is_pressed(9));
        assert_eq!(states.get(9).unwrap().session, Some(b));
    }
}
