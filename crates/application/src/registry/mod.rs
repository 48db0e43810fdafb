use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use domain::DomainError;
use domain::device::{Endpoint, LogicalDevice, RoleKey};
use domain::driver::{InputEventSource, SerialLink};
use tokio::sync::Mutex;

/// Input handle shared between the registry entry and the scan reader task
pub type SharedInput = Arc<Mutex<Box<dyn InputEventSource>>>;

/// Open transport owned by a live role
pub enum DeviceHandle {
    Serial(Box<dyn SerialLink>),
    Input(SharedInput),
}

impl DeviceHandle {
    pub fn input(source: Box<dyn InputEventSource>) -> Self {
        Self::Input(Arc::new(Mutex::new(source)))
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial(link) => write!(f, "Serial({})", link.endpoint()),
            Self::Input(_) => f.write_str("Input"),
        }
    }
}

/// A role together with the handle it holds while live
#[derive(Debug)]
pub struct RegisteredDevice {
    device: LogicalDevice,
    handle: Option<DeviceHandle>,
}

impl RegisteredDevice {
    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    pub fn serial_link(&mut self) -> Option<&mut Box<dyn SerialLink>> {
        match self.handle.as_mut() {
            Some(DeviceHandle::Serial(link)) => Some(link),
            _ => None,
        }
    }

    pub fn input_source(&self) -> Option<SharedInput> {
        match self.handle.as_ref() {
            Some(DeviceHandle::Input(source)) => Some(source.clone()),
            _ => None,
        }
    }
}

/// Binding precedence: fixed roles first, then priority, then role key
fn priority_order(a: &LogicalDevice, b: &LogicalDevice) -> Ordering {
    b.binding_mode()
        .is_fixed()
        .cmp(&a.binding_mode().is_fixed())
        .then(a.priority().cmp(&b.priority()))
        .then_with(|| a.role_key().cmp(b.role_key()))
}

/// Authoritative role → binding table.
///
/// Owned by the supervisor and passed by `&mut`; entries are kept in
/// binding-precedence order.
#[derive(Debug)]
pub struct DeviceRegistry {
    entries: Vec<RegisteredDevice>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<LogicalDevice>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        for device in &devices {
            if !seen.insert(device.role_key().clone()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate role key: {}",
                    device.role_key()
                )));
            }
        }

        let mut devices = devices;
        devices.sort_by(priority_order);

        Ok(Self {
            entries: devices
                .into_iter()
                .map(|device| RegisteredDevice {
                    device,
                    handle: None,
                })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn devices_sorted_by_priority(&self) -> impl Iterator<Item = &LogicalDevice> {
        self.entries.iter().map(|e| &e.device)
    }

    pub fn get(&self, role: &str) -> Option<&LogicalDevice> {
        self.entries
            .iter()
            .find(|e| e.device.role_key().as_str() == role)
            .map(|e| &e.device)
    }

    pub fn entry_mut(&mut self, role: &str) -> Option<&mut RegisteredDevice> {
        self.entries
            .iter_mut()
            .find(|e| e.device.role_key().as_str() == role)
    }

    /// Endpoints held by live roles
    pub fn endpoint_set(&self) -> HashSet<Endpoint> {
        self.entries
            .iter()
            .filter(|e| e.device.is_live())
            .filter_map(|e| e.device.endpoint().cloned())
            .collect()
    }

    /// Configured paths of fixed roles, never offered to the handshake
    pub fn reserved_paths(&self) -> HashSet<Endpoint> {
        self.entries
            .iter()
            .filter_map(|e| e.device.binding_mode().fixed_path().cloned())
            .collect()
    }

    pub fn all_live(&self) -> bool {
        self.entries.iter().all(|e| e.device.is_live())
    }

    pub fn all_critical_live(&self) -> bool {
        self.entries
            .iter()
            .filter(|e| e.device.fault_class().is_critical())
            .all(|e| e.device.is_live())
    }

    /// First live role holding an input handle, with that handle
    pub fn input_source(&self) -> Option<(RoleKey, SharedInput)> {
        self.entries.iter().find_map(|e| {
            e.input_source()
                .filter(|_| e.device.is_live())
                .map(|source| (e.device.role_key().clone(), source))
        })
    }

    pub fn chart_roles(&self) -> Vec<RoleKey> {
        self.entries
            .iter()
            .map(|e| e.device.role_key())
            .filter(|key| key.is_chart())
            .cloned()
            .collect()
    }

    /// Bind `role` to `endpoint`, taking ownership of its open handle
    pub fn bind(
        &mut self,
        role: &str,
        endpoint: Endpoint,
        handle: DeviceHandle,
    ) -> Result<(), DomainError> {
        let owner = self
            .entries
            .iter()
            .find(|e| e.device.endpoint() == Some(&endpoint))
            .map(|e| e.device.role_key().clone());
        if let Some(owner) = owner {
            return Err(DomainError::EndpointInUse(format!(
                "{endpoint} is bound to {owner}"
            )));
        }

        let entry = self
            .entry_mut(role)
            .ok_or_else(|| DomainError::UnknownRole(role.to_string()))?;
        entry.device.bind(endpoint)?;
        entry.handle = Some(handle);
        Ok(())
    }

    /// Demote `role` to missing, closing its handle. Returns the released endpoint.
    pub fn mark_missing(&mut self, role: &str) -> Option<Endpoint> {
        let entry = self.entry_mut(role)?;
        entry.handle = None;
        entry.device.mark_missing()
    }

    /// Close every handle. Returns how many roles were live.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for entry in &mut self.entries {
            entry.handle = None;
            if entry.device.mark_missing().is_some() {
                released += 1;
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::device::{BindingMode, FaultClass};
    use domain::driver::TransportOpener;
    use infrastructure::SimulatedBus;

    fn variable(key: &str, fault: FaultClass, priority: u32) -> LogicalDevice {
        LogicalDevice::new(
            RoleKey::new(key).unwrap(),
            key,
            "id:chart",
            fault,
            BindingMode::Variable,
            priority,
        )
        .unwrap()
    }

    fn fixed(key: &str, path: &str, priority: u32) -> LogicalDevice {
        LogicalDevice::new(
            RoleKey::new(key).unwrap(),
            key,
            "",
            FaultClass::Critical,
            BindingMode::Fixed {
                path: Endpoint::new(path).unwrap(),
            },
            priority,
        )
        .unwrap()
    }

    fn station() -> DeviceRegistry {
        DeviceRegistry::new(vec![
            variable("chart2", FaultClass::Silent, 3),
            variable("chart1", FaultClass::Warn, 2),
            fixed("rfid", "/dev/input/event0", 9),
        ])
        .unwrap()
    }

    async fn serial_handle(bus: &SimulatedBus, path: &str) -> (Endpoint, DeviceHandle) {
        let ep = bus.attach_serial(path, "id:chart").unwrap();
        let link = bus.open_serial(&ep).await.unwrap();
        (ep, DeviceHandle::Serial(link))
    }

    #[test]
    fn test_fixed_roles_sort_first() {
        let registry = station();
        let order: Vec<&str> = registry
            .devices_sorted_by_priority()
            .map(|d| d.role_key().as_str())
            .collect();
        assert_eq!(order, vec!["rfid", "chart1", "chart2"]);
    }

    #[test]
    fn test_ties_break_by_role_key() {
        let registry = DeviceRegistry::new(vec![
            variable("chart_b", FaultClass::Warn, 2),
            variable("chart_a", FaultClass::Warn, 2),
        ])
        .unwrap();
        let first = registry.devices_sorted_by_priority().next().unwrap();
        assert_eq!(first.role_key().as_str(), "chart_a");
    }

    #[test]
    fn test_duplicate_roles_rejected() {
        let result = DeviceRegistry::new(vec![
            variable("chart1", FaultClass::Warn, 2),
            variable("chart1", FaultClass::Silent, 3),
        ]);
        assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_bind_and_mark_missing() {
        let bus = SimulatedBus::default();
        let mut registry = station();
        let (ep, handle) = serial_handle(&bus, "/dev/ttyUSB0").await;

        registry.bind("chart1", ep.clone(), handle).unwrap();
        assert!(registry.get("chart1").unwrap().is_live());
        assert!(registry.endpoint_set().contains(&ep));
        assert!(registry.entry_mut("chart1").unwrap().serial_link().is_some());

        assert_eq!(registry.mark_missing("chart1"), Some(ep.clone()));
        assert!(!registry.endpoint_set().contains(&ep));
        assert!(registry.entry_mut("chart1").unwrap().serial_link().is_none());
    }

    #[tokio::test]
    async fn test_endpoint_binds_one_role() {
        let bus = SimulatedBus::default();
        let mut registry = station();
        let (ep, first) = serial_handle(&bus, "/dev/ttyUSB0").await;
        let second = DeviceHandle::Serial(bus.open_serial(&ep).await.unwrap());

        registry.bind("chart1", ep.clone(), first).unwrap();
        let result = registry.bind("chart2", ep, second);
        assert!(matches!(result, Err(DomainError::EndpointInUse(_))));
        assert!(!registry.get("chart2").unwrap().is_live());
    }

    #[tokio::test]
    async fn test_unknown_role() {
        let bus = SimulatedBus::default();
        let mut registry = station();
        let (ep, handle) = serial_handle(&bus, "/dev/ttyUSB0").await;
        assert!(matches!(
            registry.bind("chart9", ep, handle),
            Err(DomainError::UnknownRole(_))
        ));
    }

    #[tokio::test]
    async fn test_critical_liveness_ignores_other_roles() {
        let bus = SimulatedBus::default();
        let mut registry = station();
        assert!(!registry.all_critical_live());

        let input = bus.attach_input("/dev/input/event0").unwrap();
        let source = bus.open_input(&input).await.unwrap();
        registry
            .bind("rfid", input, DeviceHandle::input(source))
            .unwrap();

        assert!(registry.all_critical_live());
        assert!(!registry.all_live());
        assert!(registry.entry_mut("rfid").unwrap().input_source().is_some());
        let (role, _) = registry.input_source().unwrap();
        assert_eq!(role.as_str(), "rfid");
    }

    #[tokio::test]
    async fn test_release_all() {
        let bus = SimulatedBus::default();
        let mut registry = station();
        let (ep, handle) = serial_handle(&bus, "/dev/ttyUSB0").await;
        registry.bind("chart1", ep, handle).unwrap();

        assert_eq!(registry.release_all(), 1);
        assert!(registry.endpoint_set().is_empty());
        assert!(registry.devices_sorted_by_priority().all(|d| d.endpoint().is_none()));
    }

    #[test]
    fn test_chart_roles_and_reserved_paths() {
        let registry = station();
        let charts: Vec<String> = registry
            .chart_roles()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(charts, vec!["chart1", "chart2"]);

        let reserved = registry.reserved_paths();
        assert_eq!(reserved.len(), 1);
        assert!(reserved.contains(&Endpoint::new("/dev/input/event0").unwrap()));
    }
}
