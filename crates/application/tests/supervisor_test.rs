use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use application::registry::DeviceRegistry;
use application::{StationIo, Supervisor, SupervisorSettings};
use domain::content::ContentEntry;
use domain::device::{BindingMode, Endpoint, FaultClass, LogicalDevice, RoleKey};
use domain::notification::Severity;
use infrastructure::{ConfigContentCatalog, LoggingPlayback, MemoryNotifier, SimulatedBus};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const RFID_PATH: &str = "/dev/input/by-id/usb-rfid-event-kbd";
const BADGE: &[u8] = &[1, 2];

fn rfid() -> LogicalDevice {
    LogicalDevice::new(
        RoleKey::new("rfid").unwrap(),
        "RFID Reader",
        "id:rfid",
        FaultClass::Critical,
        BindingMode::Fixed {
            path: Endpoint::new(RFID_PATH).unwrap(),
        },
        1,
    )
    .unwrap()
}

fn chart(key: &str, name: &str, fault: FaultClass, priority: u32) -> LogicalDevice {
    LogicalDevice::new(
        RoleKey::new(key).unwrap(),
        name,
        "id:chart",
        fault,
        BindingMode::Variable,
        priority,
    )
    .unwrap()
}

fn catalog() -> Arc<ConfigContentCatalog> {
    let mut entries = HashMap::new();
    entries.insert(
        "01:02".to_string(),
        ContentEntry {
            title: "Remote".to_string(),
            asset: "media/content-remote1.mp4".to_string(),
            start_offset_secs: 0.0,
            duration_secs: 3.0,
            layer: 5,
        },
    );
    Arc::new(ConfigContentCatalog::new(entries))
}

fn settings() -> SupervisorSettings {
    SupervisorSettings {
        sweep_interval: Duration::from_secs(1),
        scan_length: 5,
        max_retries: 3,
        retry_delay: Duration::from_millis(100),
        ..SupervisorSettings::default()
    }
}

fn start(
    bus: &SimulatedBus,
    notifier: &MemoryNotifier,
    devices: Vec<LogicalDevice>,
) -> (CancellationToken, JoinHandle<DeviceRegistry>) {
    start_with(bus, notifier, devices, settings())
}

fn start_with(
    bus: &SimulatedBus,
    notifier: &MemoryNotifier,
    devices: Vec<LogicalDevice>,
    settings: SupervisorSettings,
) -> (CancellationToken, JoinHandle<DeviceRegistry>) {
    let io = StationIo {
        scanner: Arc::new(bus.clone()),
        opener: Arc::new(bus.clone()),
        notifier: Arc::new(notifier.clone()),
        playback: Arc::new(LoggingPlayback),
        catalog: catalog(),
    };
    let supervisor = Supervisor::new(DeviceRegistry::new(devices).unwrap(), io, settings);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(supervisor.run(cancel.clone()));
    (cancel, handle)
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..600 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached");
}

fn count(bus: &SimulatedBus, path: &str, request: &str) -> usize {
    bus.requests(path).iter().filter(|r| r.as_str() == request).count()
}

#[tokio::test(start_paused = true)]
async fn badge_runs_charts_then_stops_them() {
    let bus = SimulatedBus::default();
    let notifier = MemoryNotifier::new();
    bus.attach_input(RFID_PATH).unwrap();
    bus.attach_serial("/dev/ttyUSB0", "id:chart").unwrap();
    bus.attach_serial("/dev/ttyUSB1", "id:chart").unwrap();

    let (cancel, handle) = start(
        &bus,
        &notifier,
        vec![
            rfid(),
            chart("chart1", "Chart Recorder 1", FaultClass::Warn, 2),
            chart("chart2", "Chart Recorder 2", FaultClass::Silent, 3),
        ],
    );

    wait_for(|| bus.type_badge(RFID_PATH, BADGE)).await;
    wait_for(|| count(&bus, "/dev/ttyUSB0", "start") == 1).await;
    wait_for(|| count(&bus, "/dev/ttyUSB1", "start") == 1).await;
    assert_eq!(count(&bus, "/dev/ttyUSB0", "stop"), 0);

    wait_for(|| count(&bus, "/dev/ttyUSB1", "stop") == 1).await;
    assert_eq!(count(&bus, "/dev/ttyUSB0", "stop"), 1);
    assert!(notifier.take().is_empty());

    cancel.cancel();
    let registry = handle.await.unwrap();
    assert!(registry.endpoint_set().is_empty());
    assert!(registry.devices_sorted_by_priority().all(|d| !d.is_live()));
}

#[tokio::test(start_paused = true)]
async fn scans_wait_for_critical_devices() {
    let bus = SimulatedBus::default();
    let notifier = MemoryNotifier::new();
    bus.attach_input(RFID_PATH).unwrap();
    bus.attach_serial("/dev/ttyUSB1", "id:chart").unwrap();

    let (cancel, handle) = start(
        &bus,
        &notifier,
        vec![
            rfid(),
            chart("chart1", "Chart Recorder 1", FaultClass::Critical, 2),
            chart("chart2", "Chart Recorder 2", FaultClass::Warn, 3),
        ],
    );

    // chart1 takes the only recorder; chart2 stays missing but is not critical
    wait_for(|| bus.type_badge(RFID_PATH, BADGE)).await;
    wait_for(|| count(&bus, "/dev/ttyUSB1", "start") == 1).await;

    // losing a critical recorder closes the gate
    bus.detach("/dev/ttyUSB1");
    wait_for(|| notifier.count(Severity::Critical) > 0).await;
    assert!(bus.type_badge(RFID_PATH, BADGE));
    tokio::time::sleep(Duration::from_secs(2)).await;

    let messages: Vec<String> = notifier.take().into_iter().map(|n| n.message).collect();
    assert!(messages.contains(&"CRITICAL: Chart Recorder 1 disconnected.".to_string()));

    // back on another port: rediscovered, gate opens again
    bus.attach_serial("/dev/ttyUSB3", "id:chart").unwrap();
    wait_for(|| count(&bus, "/dev/ttyUSB3", "id") > 0).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(count(&bus, "/dev/ttyUSB3", "start"), 0);

    assert!(bus.type_badge(RFID_PATH, BADGE));
    wait_for(|| count(&bus, "/dev/ttyUSB3", "start") == 1).await;

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn badge_reader_is_reopened_after_replug() {
    let bus = SimulatedBus::default();
    let notifier = MemoryNotifier::new();
    bus.attach_input(RFID_PATH).unwrap();
    bus.attach_serial("/dev/ttyUSB0", "id:chart").unwrap();

    let (cancel, handle) = start(
        &bus,
        &notifier,
        vec![rfid(), chart("chart1", "Chart Recorder 1", FaultClass::Warn, 2)],
    );

    wait_for(|| bus.input_opens(RFID_PATH) == 1).await;

    bus.detach(RFID_PATH);
    wait_for(|| notifier.count(Severity::Critical) > 0).await;
    assert!(!bus.type_badge(RFID_PATH, BADGE));

    bus.attach_input(RFID_PATH).unwrap();
    wait_for(|| bus.input_opens(RFID_PATH) == 2).await;
    wait_for(|| bus.type_badge(RFID_PATH, BADGE)).await;
    wait_for(|| count(&bus, "/dev/ttyUSB0", "start") == 1).await;

    // the badge reader path is never probed
    assert!(bus.requests(RFID_PATH).is_empty());

    cancel.cancel();
    let registry = handle.await.unwrap();
    assert!(!registry.all_critical_live());
}

#[tokio::test(start_paused = true)]
async fn stop_is_on_time_while_a_silent_port_is_asked() {
    let bus = SimulatedBus::default();
    let notifier = MemoryNotifier::new();
    bus.attach_input(RFID_PATH).unwrap();
    bus.attach_serial("/dev/ttyUSB0", "id:chart").unwrap();
    // never identifies: every pass spends the whole retry budget on it
    bus.attach_serial_with_delay("/dev/ttyUSB1", "id:other", usize::MAX)
        .unwrap();

    let (cancel, handle) = start_with(
        &bus,
        &notifier,
        vec![
            rfid(),
            chart("chart1", "Chart Recorder 1", FaultClass::Warn, 2),
            chart("chart2", "Chart Recorder 2", FaultClass::Silent, 3),
        ],
        SupervisorSettings {
            scan_length: 5,
            ..SupervisorSettings::default()
        },
    );

    wait_for(|| count(&bus, "/dev/ttyUSB0", "id") == 1).await;
    wait_for(|| count(&bus, "/dev/ttyUSB1", "id") > 0).await;

    let scanned = Instant::now();
    wait_for(|| bus.type_badge(RFID_PATH, BADGE)).await;
    wait_for(|| count(&bus, "/dev/ttyUSB0", "start") == 1).await;
    let started = Instant::now();
    assert!(started - scanned < Duration::from_secs(2));

    wait_for(|| count(&bus, "/dev/ttyUSB0", "stop") == 1).await;
    let stopped = started.elapsed();
    assert!(stopped >= Duration::from_secs(3), "stopped after {stopped:?}");
    assert!(stopped < Duration::from_secs(4), "stopped after {stopped:?}");

    // the silent port is still being asked in the background
    assert!(bus.requests("/dev/ttyUSB1").len() > 1);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reader_open_failure_backs_off_without_blocking_recorders() {
    let bus = SimulatedBus::default();
    let notifier = MemoryNotifier::new();
    bus.attach_input(RFID_PATH).unwrap();
    bus.attach_serial("/dev/ttyUSB0", "id:chart").unwrap();
    bus.fail_next_opens(RFID_PATH, 3);

    let begun = Instant::now();
    let (cancel, handle) = start(
        &bus,
        &notifier,
        vec![rfid(), chart("chart1", "Chart Recorder 1", FaultClass::Warn, 2)],
    );

    // recorders are found while the badge reader is still failing
    wait_for(|| count(&bus, "/dev/ttyUSB0", "id") == 1).await;
    assert_eq!(bus.input_opens(RFID_PATH), 1);

    // three failures, retried after 1s, 2s and 4s of backoff
    wait_for(|| bus.input_opens(RFID_PATH) == 4).await;
    assert!(begun.elapsed() >= Duration::from_secs(7));

    wait_for(|| bus.type_badge(RFID_PATH, BADGE)).await;
    wait_for(|| count(&bus, "/dev/ttyUSB0", "start") == 1).await;
    assert_eq!(count(&bus, "/dev/ttyUSB0", "id"), 1);

    cancel.cancel();
    handle.await.unwrap();
}
