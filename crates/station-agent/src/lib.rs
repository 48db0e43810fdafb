//! Station agent: turns an `AgentConfig` into a running supervisor

pub mod bench;
pub mod wiring;
