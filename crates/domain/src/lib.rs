//! Domain layer - station devices, scans and collaborator contracts
//!
//! This crate contains:
//! - Entities (LogicalDevice) and value objects (Endpoint, RoleKey, Scan)
//! - The device lifecycle (DeviceStatus) and fault classes
//! - Transport traits implemented by infrastructure (SerialLink, InputEventSource, PortScanner)
//! - Collaborator contracts (Playback, ContentCatalog, Notifier)
//!
//! No I/O happens here.

pub mod content;
pub mod device;
pub mod driver;
pub mod error;
pub mod notification;
pub mod playback;
pub mod protocol;
pub mod scan;

// Re-export commonly used types
pub use device::{BindingMode, DeviceStatus, Endpoint, FaultClass, LogicalDevice, RoleKey};
pub use error::DomainError;
pub use notification::{Notification, Notifier, Severity};
pub use scan::{InputEvent, Scan};
