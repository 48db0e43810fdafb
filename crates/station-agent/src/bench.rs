//! Bench mode: a simulated exhibit wired from the same configuration

use std::time::Duration;

use domain::DomainError;
use domain::content::DEFAULT_CONTENT_KEY;
use domain::device::Endpoint;
use domain::protocol::SCAN_SEPARATOR;
use infrastructure::SimulatedBus;
use infrastructure::config::{AgentConfig, PortMode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Plug a simulated device in for every configured role.
///
/// Fixed roles appear as input devices on their path, the rest as serial
/// peripherals on consecutive numbered ports. Returns the badge reader path.
pub fn attach_devices(
    bus: &SimulatedBus,
    config: &AgentConfig,
) -> Result<Option<Endpoint>, DomainError> {
    let mut reader = None;
    let mut port = 0;

    for device in &config.devices {
        match (device.port_mode, device.port.as_deref()) {
            (PortMode::Fixed, Some(path)) => {
                let endpoint = bus.attach_input(path)?;
                reader.get_or_insert(endpoint);
            }
            _ => {
                let path = format!("{}{}", config.ports.prefix, port);
                bus.attach_serial(&path, &device.id)?;
                port += 1;
            }
        }
    }

    info!(serial = port, "🧪 Bench devices attached");
    Ok(reader)
}

/// Key presses that decode to `code`, if it is a badge code
pub fn badge_digits(code: &str) -> Option<Vec<u8>> {
    code.split(SCAN_SEPARATOR)
        .map(|group| match group.as_bytes() {
            [b'0', d @ b'0'..=b'9'] => Some(d - b'0'),
            _ => None,
        })
        .collect()
}

/// Badges worth presenting: every catalog code of the right length, or a
/// made-up one that falls through to the default entry.
pub fn demo_badges(config: &AgentConfig) -> Vec<Vec<u8>> {
    let scan_length = config.protocol.scan_length;
    let mut badges: Vec<Vec<u8>> = config
        .content
        .keys()
        .filter(|key| key.as_str() != DEFAULT_CONTENT_KEY && key.len() == scan_length)
        .filter_map(|key| badge_digits(key))
        .collect();
    badges.sort();

    if badges.is_empty() {
        let digits = (scan_length + 1) / 3;
        badges.push((0..digits).map(|i| (i % 10) as u8).collect());
    }
    badges
}

/// Present the demo badges in turn until cancelled
pub async fn present_badges(
    bus: SimulatedBus,
    reader: Endpoint,
    badges: Vec<Vec<u8>>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    for badge in badges.iter().cycle() {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if bus.type_badge(reader.as_str(), badge) {
            debug!(digits = badge.len(), "Badge presented");
        } else {
            debug!(reader = %reader, "Badge reader not open yet");
        }
    }
}
