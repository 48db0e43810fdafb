use std::sync::Arc;
use std::time::Duration;

use domain::Scan;
use domain::content::ContentCatalog;
use domain::driver::PortScanner;
use domain::playback::Playback;
use domain::protocol;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DeferredAction, DeferredCommand};
use crate::registry::DeviceRegistry;

/// Turns completed scans into playback and chart-recorder commands
pub struct ActionDispatcher {
    scanner: Arc<dyn PortScanner>,
    playback: Arc<dyn Playback>,
    catalog: Arc<dyn ContentCatalog>,
    settle: Duration,
    chart_stop: DeferredAction,
}

impl ActionDispatcher {
    pub fn new(
        scanner: Arc<dyn PortScanner>,
        playback: Arc<dyn Playback>,
        catalog: Arc<dyn ContentCatalog>,
        settle: Duration,
        deferred: mpsc::UnboundedSender<DeferredCommand>,
    ) -> Self {
        Self {
            scanner,
            playback,
            catalog,
            settle,
            chart_stop: DeferredAction::new(deferred),
        }
    }

    /// Send one command to a live serial role and read its reply.
    ///
    /// No retry; any fault or silence yields `None`.
    pub async fn tell_device(
        &self,
        registry: &mut DeviceRegistry,
        role: &str,
        command: &str,
    ) -> Option<String> {
        let Some(link) = registry.entry_mut(role).and_then(|e| e.serial_link()) else {
            debug!(role, command, "No open link for role");
            return None;
        };

        if let Err(e) = link.clear_buffers().await {
            warn!(role, error = %e, "Failed to clear buffers");
            return None;
        }
        if let Err(e) = link.send(command).await {
            warn!(role, command, error = %e, "Failed to send command");
            return None;
        }

        tokio::time::sleep(self.settle).await;

        match link.read_line().await {
            Ok(response) => response,
            Err(e) => {
                warn!(role, command, error = %e, "Failed to read reply");
                None
            }
        }
    }

    /// Start every present chart recorder and schedule the stop after `duration`.
    /// Returns how many recorders answered.
    pub async fn start_chart(&mut self, registry: &mut DeviceRegistry, duration: Duration) -> usize {
        if self.chart_stop.cancel() {
            debug!("Cancelled previous chart stop");
        }

        let mut answered = 0;
        for role in registry.chart_roles() {
            let endpoint = registry.get(role.as_str()).and_then(|d| d.endpoint().cloned());
            if !self.scanner.exists(endpoint.as_ref()) {
                continue;
            }

            match self.tell_device(registry, role.as_str(), protocol::REQ_START).await {
                Some(response) => {
                    info!(role = %role, response = %response, ack = protocol::is_ack(&response), "📈 Chart recorder started");
                    answered += 1;
                }
                None => warn!(role = %role, "Chart recorder did not answer start"),
            }
        }

        self.chart_stop.schedule(duration);
        debug!(secs = duration.as_secs_f64(), "Chart stop scheduled");
        answered
    }

    /// Stop every live chart recorder. A failing recorder does not affect the others.
    pub async fn stop_chart(&mut self, registry: &mut DeviceRegistry) -> usize {
        let mut answered = 0;
        for role in registry.chart_roles() {
            if !registry.get(role.as_str()).is_some_and(|d| d.is_live()) {
                continue;
            }

            match self.tell_device(registry, role.as_str(), protocol::REQ_STOP).await {
                Some(response) => {
                    info!(role = %role, response = %response, ack = protocol::is_ack(&response), "📉 Chart recorder stopped");
                    answered += 1;
                }
                None => warn!(role = %role, "Chart recorder did not answer stop"),
            }
        }
        answered
    }

    /// Run a command posted by a fired timer. Stale commands are dropped.
    pub async fn handle_deferred(
        &mut self,
        registry: &mut DeviceRegistry,
        command: DeferredCommand,
    ) -> bool {
        match command {
            DeferredCommand::StopChart { generation } => {
                if !self.chart_stop.complete(generation) {
                    debug!(generation, "Ignoring stale chart stop");
                    return false;
                }
                self.stop_chart(registry).await;
                true
            }
        }
    }

    /// Play the badge's content and run the chart recorders for as long.
    /// Returns false if the catalog had nothing to show.
    pub async fn handle_scan(&mut self, registry: &mut DeviceRegistry, scan: &Scan) -> bool {
        let Some(entry) = self.catalog.resolve(scan) else {
            warn!(scan = %scan, "No content for scan and no default entry");
            return false;
        };

        info!(scan = %scan, title = %entry.title, asset = %entry.asset, "🪪 Badge recognised");

        if let Err(e) = self
            .playback
            .play(&entry.asset, entry.start_offset(), entry.duration(), entry.layer)
            .await
        {
            warn!(asset = %entry.asset, error = %e, "Playback failed");
        }

        self.start_chart(registry, entry.duration()).await;
        true
    }

    pub fn chart_stop_pending(&self) -> bool {
        self.chart_stop.is_pending()
    }

    /// Drop the pending stop timer without running it
    pub fn cancel_pending(&mut self) {
        self.chart_stop.cancel();
    }
}
