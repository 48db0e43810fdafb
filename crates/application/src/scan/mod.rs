mod decoder;
mod reader;

pub use decoder::ScanDecoder;
pub use reader::ScanReader;
