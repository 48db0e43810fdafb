use async_trait::async_trait;

use super::{InputEventSource, SerialLink};
use crate::device::Endpoint;
use crate::error::DomainError;

/// Opens transport handles on endpoints.
#[async_trait]
pub trait TransportOpener: Send + Sync {
    /// Open a serial link with the configured baud rate and read timeout
    async fn open_serial(&self, endpoint: &Endpoint) -> Result<Box<dyn SerialLink>, DomainError>;

    /// Open an input event device
    async fn open_input(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn InputEventSource>, DomainError>;
}
