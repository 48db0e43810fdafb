use std::sync::Arc;
use std::time::Duration;

use domain::DomainError;
use domain::device::{Endpoint, RoleKey};
use domain::driver::{PortScanner, TransportOpener};
use tracing::{debug, info, warn};

use super::prober::{HandshakeProber, ProbeOutcome};
use crate::registry::{DeviceHandle, DeviceRegistry};

/// What one assignment pass changed
#[derive(Debug, Default)]
pub struct AssignmentReport {
    pub bound: Vec<(RoleKey, Endpoint)>,
    pub probed: Vec<Endpoint>,
    /// Transport faults met during the pass; the pass carried on past them
    pub faults: Vec<(RoleKey, DomainError)>,
}

impl AssignmentReport {
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn is_faulted(&self) -> bool {
        !self.faults.is_empty()
    }
}

/// Exponential backoff between faulted passes
#[derive(Debug, Clone, Copy)]
pub struct RetryBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl RetryBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Binds unassigned roles to the endpoints currently on the bus.
///
/// A pass is three steps: [`bind_fixed_roles`](Self::bind_fixed_roles),
/// one handshake per endpoint from [`unclaimed_endpoints`](Self::unclaimed_endpoints),
/// and [`accept_identity`](Self::accept_identity) for each answer. The supervisor
/// runs the handshakes as tasks so its loop stays responsive;
/// [`run_assignment_pass`](Self::run_assignment_pass) runs them in line.
pub struct AssignmentEngine {
    scanner: Arc<dyn PortScanner>,
    opener: Arc<dyn TransportOpener>,
    prober: HandshakeProber,
}

impl AssignmentEngine {
    pub fn new(
        scanner: Arc<dyn PortScanner>,
        opener: Arc<dyn TransportOpener>,
        prober: HandshakeProber,
    ) -> Self {
        Self {
            scanner,
            opener,
            prober,
        }
    }

    pub fn handshake(&self) -> &HandshakeProber {
        &self.prober
    }

    /// Open every present, unbound fixed role. No handshake.
    ///
    /// A role whose device refuses to open is recorded as a fault and
    /// skipped for this pass.
    pub async fn bind_fixed_roles(
        &self,
        registry: &mut DeviceRegistry,
        report: &mut AssignmentReport,
    ) {
        let fixed: Vec<(RoleKey, Endpoint)> = registry
            .devices_sorted_by_priority()
            .filter(|d| !d.is_live())
            .filter_map(|d| {
                d.binding_mode()
                    .fixed_path()
                    .map(|path| (d.role_key().clone(), path.clone()))
            })
            .collect();

        for (role, path) in fixed {
            if !self.scanner.exists(Some(&path)) {
                debug!(role = %role, endpoint = %path, "Fixed device not present");
                continue;
            }

            let bound = match self.opener.open_input(&path).await {
                Ok(source) => registry.bind(role.as_str(), path.clone(), DeviceHandle::input(source)),
                Err(e) => Err(e),
            };

            match bound {
                Ok(()) => {
                    info!(role = %role, endpoint = %path, "🔌 Fixed device bound");
                    report.bound.push((role, path));
                }
                Err(e) => {
                    warn!(role = %role, endpoint = %path, error = %e, "Fixed device could not be opened, will retry");
                    report.faults.push((role, e));
                }
            }
        }
    }

    /// Discovered endpoints that nobody holds, in enumeration order.
    /// Empty when no variable role is waiting.
    pub fn unclaimed_endpoints(&self, registry: &DeviceRegistry) -> Vec<Endpoint> {
        if !has_waiting_variable_role(registry) {
            return Vec::new();
        }

        let reserved = registry.reserved_paths();
        let held = registry.endpoint_set();
        self.scanner
            .list_candidate_endpoints()
            .into_iter()
            .filter(|ep| !reserved.contains(ep) && !held.contains(ep))
            .collect()
    }

    /// Whether asking `endpoint` could still bind anything
    pub fn worth_asking(&self, registry: &DeviceRegistry, endpoint: &Endpoint) -> bool {
        has_waiting_variable_role(registry) && !registry.endpoint_set().contains(endpoint)
    }

    /// Bind an identified endpoint to the first waiting variable role whose
    /// identity tag its answer contains. The open link becomes the handle.
    pub fn accept_identity(
        &self,
        registry: &mut DeviceRegistry,
        endpoint: Endpoint,
        outcome: ProbeOutcome,
        report: &mut AssignmentReport,
    ) -> Option<RoleKey> {
        report.probed.push(endpoint.clone());

        if outcome.is_empty() {
            debug!(endpoint = %endpoint, "No identity from endpoint");
            return None;
        }

        let role = registry
            .devices_sorted_by_priority()
            .filter(|d| !d.is_live() && !d.binding_mode().is_fixed())
            .find(|d| d.matches_identity(&outcome.identity))
            .map(|d| d.role_key().clone());

        let (Some(role), Some(link)) = (role, outcome.link) else {
            debug!(endpoint = %endpoint, identity = %outcome.identity, "No waiting role matches identity");
            return None;
        };

        match registry.bind(role.as_str(), endpoint.clone(), DeviceHandle::Serial(link)) {
            Ok(()) => {
                info!(role = %role, endpoint = %endpoint, identity = %outcome.identity, "🔌 Serial device bound");
                report.bound.push((role.clone(), endpoint));
                Some(role)
            }
            Err(e) => {
                warn!(role = %role, endpoint = %endpoint, error = %e, "Could not bind identified endpoint");
                report.faults.push((role, e));
                None
            }
        }
    }

    /// One complete, idempotent pass with the handshakes run in line
    pub async fn run_assignment_pass(&self, registry: &mut DeviceRegistry) -> AssignmentReport {
        let mut report = AssignmentReport::default();
        self.bind_fixed_roles(registry, &mut report).await;

        for endpoint in self.unclaimed_endpoints(registry) {
            if !self.worth_asking(registry, &endpoint) {
                break;
            }
            let outcome = self.prober.probe(&endpoint).await;
            self.accept_identity(registry, endpoint, outcome, &mut report);
        }

        report
    }
}

fn has_waiting_variable_role(registry: &DeviceRegistry) -> bool {
    registry
        .devices_sorted_by_priority()
        .any(|d| !d.is_live() && !d.binding_mode().is_fixed())
}
