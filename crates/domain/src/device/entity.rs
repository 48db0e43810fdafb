use serde::{Deserialize, Serialize};

use super::{DeviceStatus, Endpoint, FaultClass, RoleKey};
use crate::error::{DomainError, Result};

/// How a role finds its endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BindingMode {
    /// Dedicated device path known in advance, bound without a handshake
    Fixed { path: Endpoint },
    /// Discovered among the enumerated serial ports via the identity handshake
    Variable,
}

impl BindingMode {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    pub fn fixed_path(&self) -> Option<&Endpoint> {
        match self {
            Self::Fixed { path } => Some(path),
            Self::Variable => None,
        }
    }
}

/// One role the station depends on ("the RFID reader", "chart recorder 1").
///
/// # Invariants
/// - `endpoint` is `Some` exactly when `status` is `Live`
/// - a fixed role's configured path never changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalDevice {
    role_key: RoleKey,
    display_name: String,
    identity_tag: String,
    fault_class: FaultClass,
    binding_mode: BindingMode,
    endpoint: Option<Endpoint>,
    status: DeviceStatus,
    priority: u32,
}

impl LogicalDevice {
    pub fn new(
        role_key: RoleKey,
        display_name: impl Into<String>,
        identity_tag: impl Into<String>,
        fault_class: FaultClass,
        binding_mode: BindingMode,
        priority: u32,
    ) -> Result<Self> {
        let identity_tag = identity_tag.into();

        if !binding_mode.is_fixed() && identity_tag.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(format!(
                "Variable-port role {role_key} needs an identity tag"
            )));
        }

        Ok(Self {
            role_key,
            display_name: display_name.into(),
            identity_tag,
            fault_class,
            binding_mode,
            endpoint: None,
            status: DeviceStatus::Init,
            priority,
        })
    }

    pub fn role_key(&self) -> &RoleKey {
        &self.role_key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn identity_tag(&self) -> &str {
        &self.identity_tag
    }

    pub fn fault_class(&self) -> FaultClass {
        self.fault_class
    }

    pub fn binding_mode(&self) -> &BindingMode {
        &self.binding_mode
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Does a handshake response identify this role?
    pub fn matches_identity(&self, response: &str) -> bool {
        !self.identity_tag.is_empty() && response.contains(&self.identity_tag)
    }

    /// Bind to an endpoint and go live.
    ///
    /// A fixed role only ever binds to its configured path.
    pub fn bind(&mut self, endpoint: Endpoint) -> Result<()> {
        if let Some(path) = self.binding_mode.fixed_path() {
            if *path != endpoint {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Fixed role {} cannot bind to {} (path is {})",
                    self.role_key, endpoint, path
                )));
            }
        }

        self.status = self
            .status
            .to_live()
            .map_err(|e| DomainError::InvalidConfiguration(format!("{}: {}", self.role_key, e)))?;
        self.endpoint = Some(endpoint);
        Ok(())
    }

    /// Demote to missing and drop the binding. Returns the released endpoint.
    pub fn mark_missing(&mut self) -> Option<Endpoint> {
        self.status = self.status.to_missing();
        self.endpoint.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> LogicalDevice {
        LogicalDevice::new(
            RoleKey::new("chart1").unwrap(),
            "Chart Recorder 1",
            "id:chart",
            FaultClass::Warn,
            BindingMode::Variable,
            2,
        )
        .unwrap()
    }

    fn rfid() -> LogicalDevice {
        LogicalDevice::new(
            RoleKey::new("rfid").unwrap(),
            "RFID Reader",
            "",
            FaultClass::Critical,
            BindingMode::Fixed {
                path: Endpoint::new("/dev/input/event0").unwrap(),
            },
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_new_device_is_unbound() {
        let device = chart();
        assert_eq!(device.status(), DeviceStatus::Init);
        assert!(device.endpoint().is_none());
        assert!(device.binding_mode().fixed_path().is_none());
    }

    #[test]
    fn test_variable_role_requires_identity_tag() {
        let result = LogicalDevice::new(
            RoleKey::new("chart9").unwrap(),
            "Chart",
            " ",
            FaultClass::Silent,
            BindingMode::Variable,
            9,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_then_missing_keeps_consistency() {
        let mut device = chart();
        device.bind(Endpoint::new("/dev/ttyUSB1").unwrap()).unwrap();
        assert!(device.is_live());
        assert_eq!(device.endpoint().unwrap().as_str(), "/dev/ttyUSB1");

        let released = device.mark_missing();
        assert_eq!(released.unwrap().as_str(), "/dev/ttyUSB1");
        assert_eq!(device.status(), DeviceStatus::Missing);
        assert!(device.endpoint().is_none());
    }

    #[test]
    fn test_cannot_bind_twice() {
        let mut device = chart();
        device.bind(Endpoint::new("/dev/ttyUSB1").unwrap()).unwrap();
        assert!(device.bind(Endpoint::new("/dev/ttyUSB2").unwrap()).is_err());
        assert_eq!(device.endpoint().unwrap().as_str(), "/dev/ttyUSB1");
    }

    #[test]
    fn test_fixed_role_only_binds_its_path() {
        let mut device = rfid();
        assert!(device.bind(Endpoint::new("/dev/ttyUSB0").unwrap()).is_err());
        device
            .bind(Endpoint::new("/dev/input/event0").unwrap())
            .unwrap();
        device.mark_missing();
        // configured path survives the outage
        assert_eq!(
            device.binding_mode().fixed_path().unwrap().as_str(),
            "/dev/input/event0"
        );
        assert!(device.endpoint().is_none());
    }

    #[test]
    fn test_matches_identity() {
        let device = chart();
        assert!(device.matches_identity("id:chart"));
        assert!(device.matches_identity("  id:chart v2"));
        assert!(!device.matches_identity("id:rfid"));
        assert!(!rfid().matches_identity("id:rfid"));
    }
}
