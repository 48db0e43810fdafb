use domain::DomainError;
use domain::driver::InputEventSource;
use domain::protocol::SCAN_SEPARATOR;
use domain::scan::{InputEvent, Key, Scan, lookup_key};
use tracing::{debug, info, warn};

/// Turns badge-reader key presses into completed scans.
///
/// Each digit is appended as a two-digit group followed by the separator;
/// Enter closes the read. Reads whose length differs from `scan_length`
/// are discarded.
#[derive(Debug)]
pub struct ScanDecoder {
    buffer: String,
    scan_length: usize,
}

impl ScanDecoder {
    pub fn new(scan_length: usize) -> Self {
        Self {
            buffer: String::with_capacity(scan_length + 1),
            scan_length,
        }
    }

    pub fn scan_length(&self) -> usize {
        self.scan_length
    }

    /// Feed a batch of raw events. Returns the last good scan completed in it.
    pub fn feed(&mut self, events: &[InputEvent]) -> Option<Scan> {
        let mut good = None;

        for event in events.iter().filter(|e| e.is_key_press()) {
            match lookup_key(event.code) {
                Some(Key::Digit(d)) => {
                    self.buffer.push_str(&format!("{:02}{}", d, SCAN_SEPARATOR));
                }
                Some(Key::Terminator) => {
                    if let Some(scan) = self.complete() {
                        good = Some(scan);
                    }
                }
                Some(Key::Other(_)) | None => {}
            }
        }

        good
    }

    fn complete(&mut self) -> Option<Scan> {
        let code = self.buffer.trim_end_matches(SCAN_SEPARATOR).to_string();
        self.buffer.clear();

        if code.len() == self.scan_length {
            info!(scan = %code, "Received good scan");
            Some(Scan::new(code))
        } else {
            warn!(scan = %code, len = code.len(), expected = self.scan_length, "Received bad scan");
            None
        }
    }

    /// One blocking read from the badge reader.
    ///
    /// Returns the last good scan completed by the read, if any. A read
    /// failure is logged, drops any partial scan and is handed back so the
    /// caller can give the device up.
    pub async fn read_scan(
        &mut self,
        source: &mut dyn InputEventSource,
    ) -> Result<Option<Scan>, DomainError> {
        match source.read_events().await {
            Ok(events) => Ok(self.feed(&events)),
            Err(e) => {
                warn!(device = %source.endpoint(), error = %e, "Badge reader read failed");
                self.reset();
                Err(e)
            }
        }
    }

    /// Drop any half-finished read
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            debug!(partial = %self.buffer, "Discarding partial scan");
        }
        self.buffer.clear();
    }
}
