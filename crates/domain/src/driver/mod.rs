mod input_source;
mod port_scanner;
mod serial_link;
mod transport_opener;

pub use input_source::InputEventSource;
pub use port_scanner::PortScanner;
pub use serial_link::SerialLink;
pub use transport_opener::TransportOpener;
