use std::sync::Arc;

use domain::device::{FaultClass, RoleKey};
use domain::driver::PortScanner;
use domain::notification::{Notification, Notifier};
use tracing::{debug, warn};

use crate::registry::DeviceRegistry;

/// Re-checks bound endpoints and demotes roles whose device went away
pub struct LivenessMonitor {
    scanner: Arc<dyn PortScanner>,
    notifier: Arc<dyn Notifier>,
}

impl LivenessMonitor {
    pub fn new(scanner: Arc<dyn PortScanner>, notifier: Arc<dyn Notifier>) -> Self {
        Self { scanner, notifier }
    }

    /// Returns true if every role is live afterwards.
    ///
    /// Each role without a present endpoint (never-bound ones included) is
    /// marked missing and reported once per sweep by its fault class.
    pub fn sweep(&self, registry: &mut DeviceRegistry) -> bool {
        let gone: Vec<(RoleKey, String, FaultClass)> = registry
            .devices_sorted_by_priority()
            .filter(|d| !self.scanner.exists(d.endpoint()))
            .map(|d| {
                (
                    d.role_key().clone(),
                    d.display_name().to_string(),
                    d.fault_class(),
                )
            })
            .collect();

        for (role, name, fault) in &gone {
            match registry.mark_missing(role.as_str()) {
                Some(endpoint) => {
                    warn!(role = %role, endpoint = %endpoint, "Device vanished, binding released")
                }
                None => debug!(role = %role, "Device still missing"),
            }

            if let Some(severity) = fault.severity() {
                self.notifier
                    .notify(Notification::device_disconnected(severity, name));
            }
        }

        gone.is_empty()
    }
}

/// Dispatch gate: state left by the last sweep, no hardware access
pub fn all_critical_live(registry: &DeviceRegistry) -> bool {
    registry.all_critical_live()
}
