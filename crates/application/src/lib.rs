//! Application layer - device discovery, liveness, scan decoding and dispatch

pub mod discovery;
pub mod dispatch;
pub mod registry;
pub mod scan;
pub mod supervisor;

pub use discovery::{AssignmentEngine, HandshakeProber, LivenessMonitor};
pub use dispatch::ActionDispatcher;
pub use registry::{DeviceHandle, DeviceRegistry};
pub use scan::{ScanDecoder, ScanReader};
pub use supervisor::{StationIo, Supervisor, SupervisorSettings};
