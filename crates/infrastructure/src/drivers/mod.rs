mod input_device;
mod port_scanner;
mod rs232;
mod simulator;

pub use input_device::{EvdevInputSource, INPUT_EVENT_SIZE, decode_records};
pub use port_scanner::DevicePathScanner;
pub use rs232::{RS232Config, RS232Link};
pub use simulator::{SimulatedBus, SimulatedInputSource, SimulatedSerialLink};

use async_trait::async_trait;
use domain::DomainError;
use domain::device::Endpoint;
use domain::driver::{InputEventSource, SerialLink, TransportOpener};

/// Opens real hardware: tokio-serial for chart recorders, evdev for the badge reader
#[derive(Debug, Clone, Default)]
pub struct HardwareTransport {
    serial: RS232Config,
}

impl HardwareTransport {
    pub fn new(serial: RS232Config) -> Self {
        Self { serial }
    }

    pub fn serial_config(&self) -> &RS232Config {
        &self.serial
    }
}

#[async_trait]
impl TransportOpener for HardwareTransport {
    async fn open_serial(&self, endpoint: &Endpoint) -> Result<Box<dyn SerialLink>, DomainError> {
        let link = RS232Link::open(endpoint, &self.serial)?;
        Ok(Box::new(link) as Box<dyn SerialLink>)
    }

    async fn open_input(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn InputEventSource>, DomainError> {
        let source = EvdevInputSource::open(endpoint).await?;
        Ok(Box::new(source) as Box<dyn InputEventSource>)
    }
}
