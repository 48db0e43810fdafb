use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Value object for a physical transport path (serial device file, input
/// device file) as exposed by the host.
///
/// Rules:
/// - Must be non-empty
/// - Must not contain whitespace or NUL bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidEndpoint(
                "Endpoint path cannot be empty".to_string(),
            ));
        }

        if path.chars().any(|c| c.is_whitespace() || c == '\0') {
            return Err(DomainError::InvalidEndpoint(format!(
                "Endpoint path {path:?} must not contain whitespace"
            )));
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Endpoint {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Endpoint> for String {
    fn from(value: Endpoint) -> Self {
        value.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a logical device role ("rfid", "chart1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleKey(String);

impl RoleKey {
    /// Create a new RoleKey with validation
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();

        if key.is_empty() {
            return Err(DomainError::InvalidRoleKey(
                "Role key cannot be empty".to_string(),
            ));
        }

        if key.len() > 64 {
            return Err(DomainError::InvalidRoleKey(format!(
                "Role key too long: {} chars (max 64)",
                key.len()
            )));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DomainError::InvalidRoleKey(format!(
                "Role key {key} must contain only alphanumeric, underscore and hyphen"
            )));
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for chart recorder roles (`chart`, `chart1`, `chart2`, ...)
    pub fn is_chart(&self) -> bool {
        self.0.starts_with(crate::protocol::CHART_ROLE_PREFIX)
    }
}

impl TryFrom<String> for RoleKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RoleKey> for String {
    fn from(value: RoleKey) -> Self {
        value.0
    }
}

impl std::fmt::Display for RoleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
