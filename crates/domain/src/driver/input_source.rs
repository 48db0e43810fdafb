use async_trait::async_trait;

use crate::device::Endpoint;
use crate::error::DomainError;
use crate::scan::InputEvent;

/// Keyboard-style event stream (the badge reader presents itself as a keyboard)
#[async_trait]
pub trait InputEventSource: Send {
    /// Suspend until at least one event is available.
    /// An error means the device is gone; the handle is dead afterwards.
    async fn read_events(&mut self) -> Result<Vec<InputEvent>, DomainError>;

    fn endpoint(&self) -> &Endpoint;
}
