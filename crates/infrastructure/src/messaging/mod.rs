pub mod memory_notifier;
pub mod tracing_notifier;

pub use memory_notifier::MemoryNotifier;
pub use tracing_notifier::TracingNotifier;
