use std::collections::{HashMap, HashSet};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use domain::DomainError;
use domain::content::{ContentEntry, DEFAULT_CONTENT_KEY};
use domain::device::{BindingMode, Endpoint, FaultClass, LogicalDevice, RoleKey};
use domain::protocol;
use serde::{Deserialize, Serialize};

use crate::drivers::RS232Config;

pub const RFID_READER_PATH: &str =
    "/dev/input/by-id/usb-Sycreader_RFID_Technology_Co.__Ltd_SYC_ID_IC_USB_Reader_08FF20140315-event-kbd";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PortsConfig {
    #[serde(default = "default_port_prefix")]
    pub prefix: String,
    #[serde(default = "default_max_ports")]
    pub max_ports: usize,
}

fn default_port_prefix() -> String {
    "/dev/ttyUSB".to_string()
}
fn default_max_ports() -> usize {
    12
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            prefix: default_port_prefix(),
            max_ports: default_max_ports(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_serial_timeout_ms")]
    pub serial_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_serial_timeout_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    20
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            serial_timeout_ms: default_serial_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rs232(&self) -> RS232Config {
        RS232Config::with_timeout(self.baud_rate, self.serial_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    #[serde(default = "default_scan_length")]
    pub scan_length: usize,
}

fn default_scan_length() -> usize {
    protocol::DEFAULT_SCAN_LENGTH
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            scan_length: default_scan_length(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupervisorConfig {
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_backoff_initial_ms")]
    pub setup_backoff_initial_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub setup_backoff_max_ms: u64,
}

fn default_sweep_interval_ms() -> u64 {
    1000
}
fn default_backoff_initial_ms() -> u64 {
    1000
}
fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            setup_backoff_initial_ms: default_backoff_initial_ms(),
            setup_backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    Fixed,
    Variable,
}

/// One row of the role table
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub id: String,
    pub fault: FaultClass,
    pub port_mode: PortMode,
    #[serde(default)]
    pub port: Option<String>,
    pub sort: u32,
}

impl DeviceConfig {
    pub fn to_logical_device(&self) -> Result<LogicalDevice, DomainError> {
        let role_key = RoleKey::new(&self.key)?;
        let binding_mode = match self.port_mode {
            PortMode::Fixed => {
                let path = self.port.as_deref().ok_or_else(|| {
                    DomainError::InvalidConfiguration(format!(
                        "Fixed-port role {} has no port",
                        self.key
                    ))
                })?;
                BindingMode::Fixed {
                    path: Endpoint::new(path)?,
                }
            }
            PortMode::Variable => BindingMode::Variable,
        };

        LogicalDevice::new(
            role_key,
            &self.name,
            &self.id,
            self.fault,
            binding_mode,
            self.sort,
        )
    }
}

fn default_devices() -> Vec<DeviceConfig> {
    vec![
        DeviceConfig {
            key: protocol::RFID_ROLE.to_string(),
            name: "RFID Reader".to_string(),
            id: protocol::ID_RFID.to_string(),
            fault: FaultClass::Critical,
            port_mode: PortMode::Fixed,
            port: Some(RFID_READER_PATH.to_string()),
            sort: 1,
        },
        DeviceConfig {
            key: "chart1".to_string(),
            name: "Chart Recorder 1".to_string(),
            id: protocol::ID_CHART.to_string(),
            fault: FaultClass::Warn,
            port_mode: PortMode::Variable,
            port: None,
            sort: 2,
        },
        DeviceConfig {
            key: "chart2".to_string(),
            name: "Chart Recorder 2".to_string(),
            id: protocol::ID_CHART.to_string(),
            fault: FaultClass::Silent,
            port_mode: PortMode::Variable,
            port: None,
            sort: 3,
        },
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackBackend {
    #[default]
    Logging,
    Process,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub backend: PlaybackBackend,
    #[serde(default = "default_player")]
    pub player: String,
    /// Supports `{asset}`, `{offset}` and `{layer}` placeholders
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

fn default_player() -> String {
    "omxplayer".to_string()
}
fn default_player_args() -> Vec<String> {
    [
        "--no-osd",
        "--no-keys",
        "--aspect-mode",
        "fill",
        "--layer",
        "{layer}",
        "--pos",
        "{offset}",
        "{asset}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backend: PlaybackBackend::default(),
            player: default_player(),
            args: default_player_args(),
        }
    }
}

fn default_content() -> HashMap<String, ContentEntry> {
    let mut content = HashMap::new();
    content.insert(
        DEFAULT_CONTENT_KEY.to_string(),
        ContentEntry {
            title: "1960s Cuba family".to_string(),
            asset: "media/1960s-cuba-family.mp4".to_string(),
            start_offset_secs: 0.0,
            duration_secs: 20.0,
            layer: 5,
        },
    );
    content
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_station_id")]
    pub station_id: String,
    #[serde(default)]
    pub ports: PortsConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default = "default_content")]
    pub content: HashMap<String, ContentEntry>,
}

fn default_station_id() -> String {
    "auratic-station".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            station_id: default_station_id(),
            ports: PortsConfig::default(),
            probe: ProbeConfig::default(),
            protocol: ProtocolConfig::default(),
            supervisor: SupervisorConfig::default(),
            devices: default_devices(),
            playback: PlaybackConfig::default(),
            content: default_content(),
        }
    }
}

impl AgentConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("station_id", default_station_id())?
            // Installation file, optional: the built-in role table matches the exhibit
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Bench / test overrides, e.g. config/development.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. AURATIC__PORTS__PREFIX=/dev/ttyACM)
            .add_source(Environment::with_prefix("AURATIC").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Reject role tables and protocol settings the station cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.key.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate role key: {}",
                    device.key
                )));
            }
        }

        if self.devices.is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "No devices configured".to_string(),
            ));
        }
        if self.probe.max_retries == 0 {
            return Err(DomainError::InvalidConfiguration(
                "probe.max_retries must be at least 1".to_string(),
            ));
        }
        if self.protocol.scan_length == 0 {
            return Err(DomainError::InvalidConfiguration(
                "protocol.scan_length must be positive".to_string(),
            ));
        }
        if self.ports.max_ports == 0 {
            return Err(DomainError::InvalidConfiguration(
                "ports.max_ports must be positive".to_string(),
            ));
        }

        // Building every role checks fixed paths and identity tags
        self.logical_devices().map(|_| ())
    }

    pub fn logical_devices(&self) -> Result<Vec<LogicalDevice>, DomainError> {
        self.devices
            .iter()
            .map(DeviceConfig::to_logical_device)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_installation() {
        let config = AgentConfig::default();
        assert_eq!(config.ports.prefix, "/dev/ttyUSB");
        assert_eq!(config.ports.max_ports, 12);
        assert_eq!(config.probe.baud_rate, 9600);
        assert_eq!(config.probe.max_retries, 20);
        assert_eq!(config.probe.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.protocol.scan_length, 29);
        assert!(config.content.contains_key(DEFAULT_CONTENT_KEY));
        assert!(config.validate().is_ok());

        let devices = config.logical_devices().unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(
            devices[0].binding_mode().fixed_path().map(|p| p.as_str()),
            Some(RFID_READER_PATH)
        );
        assert_eq!(devices[1].identity_tag(), "id:chart");
        assert_eq!(devices[2].fault_class(), FaultClass::Silent);
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let mut config = AgentConfig::default();
        config.devices[2].key = "chart1".to_string();
        assert!(matches!(
            config.validate(),
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_fixed_role_without_port() {
        let mut config = AgentConfig::default();
        config.devices[0].port = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_variable_role_without_identity() {
        let mut config = AgentConfig::default();
        config.devices[1].id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = AgentConfig::default();
        config.protocol.scan_length = 0;
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.probe.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_device_config_deserializes() {
        let device: DeviceConfig = serde_json::from_value(serde_json::json!({
            "key": "chart3",
            "name": "Chart Recorder 3",
            "id": "id:chart",
            "fault": "warn",
            "port_mode": "variable",
            "sort": 4
        }))
        .unwrap();
        let logical = device.to_logical_device().unwrap();
        assert!(logical.role_key().is_chart());
        assert!(!logical.binding_mode().is_fixed());
    }

    #[test]
    fn test_load_from_missing_dir_uses_builtin_defaults() {
        let config = AgentConfig::load("/nonexistent/auratic-config").unwrap();
        assert_eq!(config.station_id, "auratic-station");
        assert_eq!(config.devices.len(), 3);
        assert_eq!(config.supervisor.setup_backoff_max_ms, 30_000);
    }

    #[test]
    fn test_load_file_overrides() {
        let dir = std::env::temp_dir().join(format!("auratic_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            r#"
station_id = "bench"

[ports]
prefix = "/dev/ttyACM"

[protocol]
scan_length = 11
"#,
        )
        .unwrap();

        let config = AgentConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.station_id, "bench");
        assert_eq!(config.ports.prefix, "/dev/ttyACM");
        assert_eq!(config.ports.max_ports, 12);
        assert_eq!(config.protocol.scan_length, 11);

        std::fs::remove_dir_all(&dir).ok();
    }
}
