use std::sync::Arc;
use std::time::Duration;

use application::discovery::RetryBackoff;
use application::{StationIo, SupervisorSettings};
use domain::playback::Playback;
use infrastructure::config::{AgentConfig, PlaybackBackend, PlaybackConfig};
use infrastructure::{
    ConfigContentCatalog, DevicePathScanner, HardwareTransport, LoggingPlayback, ProcessPlayback,
    SimulatedBus, TracingNotifier,
};
use tracing::info;

/// Where the station's devices live
pub enum Transport {
    Hardware,
    Simulated(SimulatedBus),
}

pub fn supervisor_settings(config: &AgentConfig) -> SupervisorSettings {
    SupervisorSettings {
        sweep_interval: Duration::from_millis(config.supervisor.sweep_interval_ms),
        backoff: RetryBackoff::new(
            Duration::from_millis(config.supervisor.setup_backoff_initial_ms),
            Duration::from_millis(config.supervisor.setup_backoff_max_ms),
        ),
        scan_length: config.protocol.scan_length,
        max_retries: config.probe.max_retries,
        retry_delay: config.probe.retry_delay(),
    }
}

pub fn playback(config: &PlaybackConfig) -> Arc<dyn Playback> {
    match config.backend {
        PlaybackBackend::Logging => Arc::new(LoggingPlayback),
        PlaybackBackend::Process => {
            info!(player = %config.player, "🎞️ Using external player");
            Arc::new(ProcessPlayback::new(config.player.clone(), config.args.clone()))
        }
    }
}

pub fn station_io(config: &AgentConfig, transport: Transport) -> StationIo {
    let catalog = Arc::new(ConfigContentCatalog::new(config.content.clone()));
    let notifier = Arc::new(TracingNotifier);
    let playback = playback(&config.playback);

    match transport {
        Transport::Hardware => StationIo {
            scanner: Arc::new(DevicePathScanner::new(
                config.ports.prefix.clone(),
                config.ports.max_ports,
            )),
            opener: Arc::new(HardwareTransport::new(config.probe.rs232())),
            notifier,
            playback,
            catalog,
        },
        Transport::Simulated(bus) => StationIo {
            scanner: Arc::new(bus.clone()),
            opener: Arc::new(bus),
            notifier,
            playback,
            catalog,
        },
    }
}
