use serde::{Deserialize, Serialize};

/// Lifecycle state of a logical device role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Never bound since startup
    Init,
    /// Bound to an endpoint that existed at the last check
    Live,
    /// Was bound, endpoint vanished
    Missing,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Live => "live",
            Self::Missing => "missing",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Transition to live state
    pub fn to_live(&self) -> Result<Self, &'static str> {
        match self {
            Self::Init | Self::Missing => Ok(Self::Live),
            Self::Live => Err("Device is already live"),
        }
    }

    /// Transition to missing state
    pub fn to_missing(&self) -> Self {
        Self::Missing
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Init
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_init() {
        let state = DeviceStatus::default();
        assert_eq!(state, DeviceStatus::Init);
        assert!(!state.is_live());
    }

    #[test]
    fn test_transition_init_to_live() {
        let next = DeviceStatus::Init.to_live().unwrap();
        assert_eq!(next, DeviceStatus::Live);
        assert!(next.is_live());
    }

    #[test]
    fn test_transition_missing_to_live() {
        assert_eq!(DeviceStatus::Missing.to_live().unwrap(), DeviceStatus::Live);
    }

    #[test]
    fn test_cannot_bind_live_device() {
        assert!(DeviceStatus::Live.to_live().is_err());
    }

    #[test]
    fn test_to_missing_from_any_state() {
        assert_eq!(DeviceStatus::Live.to_missing(), DeviceStatus::Missing);
        assert_eq!(DeviceStatus::Init.to_missing(), DeviceStatus::Missing);
        assert_eq!(DeviceStatus::Missing.to_missing(), DeviceStatus::Missing);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(DeviceStatus::Init.as_str(), "init");
        assert_eq!(DeviceStatus::Live.as_str(), "live");
        assert_eq!(DeviceStatus::Missing.as_str(), "missing");
    }
}
