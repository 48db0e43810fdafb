use serde::{Deserialize, Serialize};

use crate::notification::Severity;

/// How loudly the absence of a role is reported.
///
/// A critical role also gates every action dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultClass {
    Critical,
    Warn,
    Silent,
}

impl FaultClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warn => "warn",
            Self::Silent => "silent",
        }
    }

    /// Severity of the "disconnected" notification, `None` for silent roles
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Critical => Some(Severity::Critical),
            Self::Warn => Some(Severity::Warning),
            Self::Silent => None,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }
}
