use async_trait::async_trait;

use crate::device::Endpoint;
use crate::error::DomainError;

/// Line-oriented request/response link to a serial peripheral.
///
/// Infrastructure provides the real tokio-serial implementation and an
/// in-memory one for the simulator.
#[async_trait]
pub trait SerialLink: Send {
    /// Discard stale bytes buffered in either direction
    async fn clear_buffers(&mut self) -> Result<(), DomainError>;

    /// Send one request token
    async fn send(&mut self, token: &str) -> Result<(), DomainError>;

    /// Read one trimmed line.
    /// Returns `None` if nothing arrived within the link's read timeout.
    async fn read_line(&mut self) -> Result<Option<String>, DomainError>;

    /// Path this link was opened on
    fn endpoint(&self) -> &Endpoint;
}
