use serde::{Deserialize, Serialize};

/// Event type for key presses/releases
pub const EV_KEY: u16 = 0x01;
/// `value` of a key-down event (0 = release, 2 = autorepeat)
pub const KEY_PRESS: i32 = 1;

/// One raw (type, code, value) triple from a keyboard-style input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    /// Shorthand for a key-down event
    pub fn key_press(code: u16) -> Self {
        Self::new(EV_KEY, code, KEY_PRESS)
    }

    pub fn is_key_press(&self) -> bool {
        self.event_type == EV_KEY && self.value == KEY_PRESS
    }
}
