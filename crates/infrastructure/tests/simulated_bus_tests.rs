use std::sync::Arc;

use domain::device::Endpoint;
use domain::driver::{PortScanner, TransportOpener};
use domain::scan::InputEvent;
use infrastructure::SimulatedBus;
use tokio_test::{assert_ok, block_on};

fn as_paths(endpoints: Vec<Endpoint>) -> Vec<String> {
    endpoints.into_iter().map(String::from).collect()
}

#[test] // hot_plug_is_visible_to_scanner
fn hot_plug_is_visible_to_scanner() {
    let bus = SimulatedBus::new("/dev/ttyUSB", 12);
    let scanner: Arc<dyn PortScanner> = Arc::new(bus.clone());
    assert!(scanner.list_candidate_endpoints().is_empty());

    bus.attach_serial("/dev/ttyUSB3", "id:chart").unwrap();
    assert_eq!(as_paths(scanner.list_candidate_endpoints()), vec!["/dev/ttyUSB3"]);

    bus.detach("/dev/ttyUSB3");
    assert!(scanner.list_candidate_endpoints().is_empty());
}

#[test] // opener_works_through_trait_object
fn opener_works_through_trait_object() {
    let bus = SimulatedBus::default();
    let opener: Arc<dyn TransportOpener> = Arc::new(bus.clone());
    let ep = bus.attach_serial("/dev/ttyUSB0", "id:chart").unwrap();

    block_on(async {
        let mut link = assert_ok!(opener.open_serial(&ep).await);
        assert_ok!(link.clear_buffers().await);
        assert_ok!(link.send("stop").await);
        assert_eq!(assert_ok!(link.read_line().await).as_deref(), Some("stop:OK"));

        assert_ok!(link.send("bogus").await);
        assert_eq!(
            assert_ok!(link.read_line().await).as_deref(),
            Some("Unknown-request:bogus")
        );
    });
}

#[test] // opening_wrong_kind_fails
fn opening_wrong_kind_fails() {
    let bus = SimulatedBus::default();
    let serial = bus.attach_serial("/dev/ttyUSB0", "id:chart").unwrap();
    let input = bus.attach_input("/dev/input/event0").unwrap();
    let absent = Endpoint::new("/dev/ttyUSB9").unwrap();

    block_on(async {
        assert!(bus.open_input(&serial).await.is_err());
        assert!(bus.open_serial(&input).await.is_err());
        assert!(bus.open_serial(&absent).await.is_err());
    });
}

#[test] // input_events_arrive_in_batches
fn input_events_arrive_in_batches() {
    let bus = SimulatedBus::default();
    let ep = bus.attach_input("/dev/input/event0").unwrap();

    block_on(async {
        let mut source = assert_ok!(bus.open_input(&ep).await);
        assert!(bus.push_events("/dev/input/event0", vec![InputEvent::key_press(2)]));
        assert!(bus.push_events("/dev/input/event0", vec![InputEvent::new(1, 2, 0)]));

        assert_eq!(assert_ok!(source.read_events().await), vec![InputEvent::key_press(2)]);
        assert_eq!(assert_ok!(source.read_events().await), vec![InputEvent::new(1, 2, 0)]);
    });
}
