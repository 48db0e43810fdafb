use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use domain::content::ContentCatalog;
use domain::device::Endpoint;
use domain::driver::{PortScanner, TransportOpener};
use domain::notification::Notifier;
use domain::playback::Playback;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::{
    AssignmentEngine, AssignmentReport, HandshakeProber, LivenessMonitor, ProbeOutcome,
    RetryBackoff, all_critical_live,
};
use crate::dispatch::{ActionDispatcher, DeferredCommand};
use crate::registry::DeviceRegistry;
use crate::scan::ScanReader;

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub sweep_interval: Duration,
    pub backoff: RetryBackoff,
    pub scan_length: usize,
    pub max_retries: u32,
    /// Delay between probe attempts, also the settle time after a command
    pub retry_delay: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
            backoff: RetryBackoff::default(),
            scan_length: domain::protocol::DEFAULT_SCAN_LENGTH,
            max_retries: 20,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Everything the station talks to
#[derive(Clone)]
pub struct StationIo {
    pub scanner: Arc<dyn PortScanner>,
    pub opener: Arc<dyn TransportOpener>,
    pub notifier: Arc<dyn Notifier>,
    pub playback: Arc<dyn Playback>,
    pub catalog: Arc<dyn ContentCatalog>,
}

type HandshakeResult = (Endpoint, ProbeOutcome);

/// An assignment pass in progress. At most one handshake runs at a time.
struct Pass {
    report: AssignmentReport,
    queue: VecDeque<Endpoint>,
    in_flight: Option<JoinHandle<()>>,
}

/// Owns the registry and runs discovery, liveness and dispatch on one task.
///
/// Handshakes run on spawned tasks and report back through a channel, so
/// scans and deferred stops are served while an endpoint is being asked.
pub struct Supervisor {
    registry: DeviceRegistry,
    assignment: AssignmentEngine,
    liveness: LivenessMonitor,
    dispatcher: ActionDispatcher,
    deferred_rx: mpsc::UnboundedReceiver<DeferredCommand>,
    handshake_tx: mpsc::UnboundedSender<HandshakeResult>,
    handshake_rx: mpsc::UnboundedReceiver<HandshakeResult>,
    pass: Option<Pass>,
    /// Delay before the pass after a faulted one
    backoff_delay: Duration,
    not_before: Option<Instant>,
    reader: Option<ScanReader>,
    settings: SupervisorSettings,
}

impl Supervisor {
    pub fn new(registry: DeviceRegistry, io: StationIo, settings: SupervisorSettings) -> Self {
        let (deferred_tx, deferred_rx) = mpsc::unbounded_channel();
        let (handshake_tx, handshake_rx) = mpsc::unbounded_channel();

        let prober = HandshakeProber::new(
            io.opener.clone(),
            settings.max_retries,
            settings.retry_delay,
        );

        Self {
            registry,
            assignment: AssignmentEngine::new(io.scanner.clone(), io.opener, prober),
            liveness: LivenessMonitor::new(io.scanner.clone(), io.notifier),
            dispatcher: ActionDispatcher::new(
                io.scanner,
                io.playback,
                io.catalog,
                settings.retry_delay,
                deferred_tx,
            ),
            deferred_rx,
            handshake_tx,
            handshake_rx,
            pass: None,
            backoff_delay: settings.backoff.initial,
            not_before: None,
            reader: None,
            settings,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Run until `cancel` fires. Returns the registry with every handle released.
    pub async fn run(mut self, cancel: CancellationToken) -> DeviceRegistry {
        info!(roles = self.registry.len(), "🛰️ Supervisor starting");
        let (scan_tx, mut scan_rx) = mpsc::channel(16);

        self.begin_pass().await;
        self.ensure_reader(&scan_tx, &cancel);

        let mut ticker = tokio::time::interval(self.settings.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.liveness.sweep(&mut self.registry) {
                        self.begin_pass().await;
                    }
                    self.ensure_reader(&scan_tx, &cancel);
                }
                Some((endpoint, outcome)) = self.handshake_rx.recv() => {
                    self.accept_identity(endpoint, outcome);
                }
                Some(scan) = scan_rx.recv() => {
                    if all_critical_live(&self.registry) {
                        self.dispatcher.handle_scan(&mut self.registry, &scan).await;
                    } else {
                        warn!(scan = %scan, "Critical device missing, scan ignored");
                    }
                }
                Some(command) = self.deferred_rx.recv() => {
                    self.dispatcher.handle_deferred(&mut self.registry, command).await;
                }
            }
        }

        self.shutdown()
    }

    /// Bind fixed roles and queue the unclaimed endpoints for a handshake.
    /// No-op while a pass is running or a faulted pass is backing off.
    async fn begin_pass(&mut self) {
        if self.pass.is_some() || self.not_before.is_some_and(|at| Instant::now() < at) {
            return;
        }

        let mut report = AssignmentReport::default();
        self.assignment
            .bind_fixed_roles(&mut self.registry, &mut report)
            .await;
        let queue = self.assignment.unclaimed_endpoints(&self.registry).into();

        self.pass = Some(Pass {
            report,
            queue,
            in_flight: None,
        });
        self.ask_next();
    }

    /// Spawn the handshake for the next endpoint still worth asking,
    /// or close the pass when none is left
    fn ask_next(&mut self) {
        let Some(pass) = self.pass.as_mut() else {
            return;
        };

        while let Some(endpoint) = pass.queue.pop_front() {
            if !self.assignment.worth_asking(&self.registry, &endpoint) {
                continue;
            }

            let prober = self.assignment.handshake().clone();
            let results = self.handshake_tx.clone();
            pass.in_flight = Some(tokio::spawn(async move {
                let outcome = prober.probe(&endpoint).await;
                let _ = results.send((endpoint, outcome));
            }));
            return;
        }

        self.finish_pass();
    }

    fn accept_identity(&mut self, endpoint: Endpoint, outcome: ProbeOutcome) {
        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        pass.in_flight = None;
        self.assignment
            .accept_identity(&mut self.registry, endpoint, outcome, &mut pass.report);
        self.ask_next();
    }

    fn finish_pass(&mut self) {
        let Some(pass) = self.pass.take() else {
            return;
        };
        let report = pass.report;

        if !report.is_empty() {
            info!(
                bound = report.bound.len(),
                probed = report.probed.len(),
                all_live = self.registry.all_live(),
                "✅ Assignment pass complete"
            );
        }

        if report.is_faulted() {
            let delay = self.backoff_delay;
            warn!(faults = report.faults.len(), retry_in = ?delay, "Assignment pass faulted, backing off");
            self.not_before = Some(Instant::now() + delay);
            self.backoff_delay = self.settings.backoff.next(delay);
        } else {
            self.not_before = None;
            self.backoff_delay = self.settings.backoff.initial;
        }
    }

    /// Keep exactly one reader running on the live input device
    fn ensure_reader(&mut self, scan_tx: &mpsc::Sender<domain::Scan>, cancel: &CancellationToken) {
        let Some((role, source)) = self.registry.input_source() else {
            if self.reader.take().is_some() {
                debug!("Input device gone, reader stopped");
            }
            return;
        };

        match self.reader.as_ref().map(ScanReader::is_finished) {
            Some(false) => return,
            Some(true) => {
                // The handle failed while its path still exists: reopen it
                self.reader = None;
                self.registry.mark_missing(role.as_str());
                warn!(role = %role, "Input handle failed, will reopen");
                return;
            }
            None => {}
        }

        self.reader = Some(ScanReader::spawn(
            source,
            self.settings.scan_length,
            scan_tx.clone(),
            cancel.child_token(),
        ));
    }

    fn shutdown(mut self) -> DeviceRegistry {
        if let Some(task) = self.pass.take().and_then(|p| p.in_flight) {
            task.abort();
        }
        self.reader = None;
        self.dispatcher.cancel_pending();
        let released = self.registry.release_all();
        info!(released, "🛑 Supervisor stopped, handles released");
        self.registry
    }
}
