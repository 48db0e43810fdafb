//! Infrastructure layer - hardware, simulator, playback and configuration

pub mod config;
pub mod drivers;
pub mod messaging;
pub mod playback;
pub mod repositories;

pub use drivers::{DevicePathScanner, HardwareTransport, SimulatedBus};
pub use messaging::{MemoryNotifier, TracingNotifier};
pub use playback::{LoggingPlayback, ProcessPlayback};
pub use repositories::ConfigContentCatalog;
