mod assignment;
mod liveness;
mod prober;

pub use assignment::{AssignmentEngine, AssignmentReport, RetryBackoff};
pub use liveness::{LivenessMonitor, all_critical_live};
pub use prober::{HandshakeProber, ProbeOutcome};
