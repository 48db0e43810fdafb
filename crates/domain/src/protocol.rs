//! Line protocol spoken by the station peripherals.
//!
//! Requests are short ASCII tokens; devices answer with one line.

/// Ask a device for its identity string
pub const REQ_ID: &str = "id";
/// Start the chart recorder pens
pub const REQ_START: &str = "start";
/// Return the chart recorder to its idle sweep
pub const REQ_STOP: &str = "stop";
/// Dump chart recorder status
pub const REQ_STATUS: &str = "status";
pub const REQ_DEBUG: &str = "debug";
pub const REQ_NODEBUG: &str = "nodebug";
/// Acknowledgement token contained in replies to start/stop
pub const RSP_ACK: &str = "OK";
pub const REQ_HANDSHAKE: &str = "hello?";
pub const RSP_HANDSHAKE: &str = "hello!";

/// Identity announced by the RFID bridge
pub const ID_RFID: &str = "id:rfid";
/// Identity announced by every chart recorder
pub const ID_CHART: &str = "id:chart";

/// Roles whose key starts with this prefix are chart recorders
pub const CHART_ROLE_PREFIX: &str = "chart";

/// Role key of the badge reader that feeds the scan decoder
pub const RFID_ROLE: &str = "rfid";

/// Separator between the two-digit groups of a scan
pub const SCAN_SEPARATOR: char = ':';

/// Default decoded scan length (ten digits: `dd:` x 10 minus the trailing separator)
pub const DEFAULT_SCAN_LENGTH: usize = 29;

/// Is this reply an acknowledgement?
pub fn is_ack(response: &str) -> bool {
    response.contains(RSP_ACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_detection() {
        assert!(is_ack("start:OK"));
        assert!(is_ack("OK"));
        assert!(!is_ack("Unknown-request:strat"));
    }

    #[test]
    fn test_default_scan_length_is_ten_groups() {
        let groups = 10;
        assert_eq!(groups * 3 - 1, DEFAULT_SCAN_LENGTH);
    }
}
