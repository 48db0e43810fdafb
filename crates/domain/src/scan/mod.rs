use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod input_event;
mod scancode;

pub use input_event::{EV_KEY, InputEvent, KEY_PRESS};
pub use scancode::{Key, KEY_ENTER, lookup_key};

/// One complete badge read: two-digit groups joined by the scan separator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    code: String,
    pub received_at: DateTime<Utc>,
}

impl Scan {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            received_at: Utc::now(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl std::fmt::Display for Scan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}
