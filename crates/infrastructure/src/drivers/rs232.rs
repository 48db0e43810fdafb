use std::time::Duration;

use async_trait::async_trait;
use domain::DomainError;
use domain::device::Endpoint;
use domain::driver::SerialLink;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

/// Serial line settings shared by every peripheral on the station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RS232Config {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "None", "Even", "Odd"
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_data_bits() -> u8 {
    8
}
fn default_parity() -> String {
    "None".to_string()
}
fn default_stop_bits() -> u8 {
    1
}
fn default_timeout_ms() -> u64 {
    500
}

impl Default for RS232Config {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RS232Config {
    pub fn with_timeout(baud_rate: u32, timeout_ms: u64) -> Self {
        Self {
            baud_rate,
            timeout_ms,
            ..Self::default()
        }
    }

    fn to_parity(&self) -> Result<tokio_serial::Parity, DomainError> {
        match self.parity.as_str() {
            "None" => Ok(tokio_serial::Parity::None),
            "Even" => Ok(tokio_serial::Parity::Even),
            "Odd" => Ok(tokio_serial::Parity::Odd),
            _ => Err(DomainError::InvalidConfiguration(format!(
                "Invalid parity: {}",
                self.parity
            ))),
        }
    }

    fn to_stop_bits(&self) -> Result<tokio_serial::StopBits, DomainError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            _ => Err(DomainError::InvalidConfiguration(format!(
                "Invalid stop bits: {}",
                self.stop_bits
            ))),
        }
    }

    fn to_data_bits(&self) -> Result<tokio_serial::DataBits, DomainError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            _ => Err(DomainError::InvalidConfiguration(format!(
                "Invalid data bits: {}",
                self.data_bits
            ))),
        }
    }
}

/// Line-oriented link over a tokio-serial port.
///
/// Dropping the link closes the port.
pub struct RS232Link {
    endpoint: Endpoint,
    port: SerialStream,
    pending: Vec<u8>,
    read_timeout: Duration,
}

impl RS232Link {
    pub fn open(endpoint: &Endpoint, config: &RS232Config) -> Result<Self, DomainError> {
        tracing::debug!(
            port = %endpoint,
            baud_rate = config.baud_rate,
            "Opening serial port"
        );

        let port = tokio_serial::new(endpoint.as_str(), config.baud_rate)
            .data_bits(config.to_data_bits()?)
            .parity(config.to_parity()?)
            .stop_bits(config.to_stop_bits()?)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open_native_async()
            .map_err(|e| {
                // WARN, not ERROR: unplugged ports are routine during discovery
                tracing::warn!(port = %endpoint, error = %e, "Failed to open serial port");
                DomainError::Transport(format!("Failed to open serial port {}: {}", endpoint, e))
            })?;

        Ok(Self {
            endpoint: endpoint.clone(),
            port,
            pending: Vec::new(),
            read_timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn take_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

#[async_trait]
impl SerialLink for RS232Link {
    async fn clear_buffers(&mut self) -> Result<(), DomainError> {
        self.pending.clear();
        self.port
            .clear(ClearBuffer::All)
            .map_err(|e| DomainError::Transport(format!("Clear error on {}: {}", self.endpoint, e)))
    }

    async fn send(&mut self, token: &str) -> Result<(), DomainError> {
        let data = format!("{token}\n");

        self.port
            .write_all(data.as_bytes())
            .await
            .map_err(|e| DomainError::Transport(format!("Write error: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| DomainError::Transport(format!("Flush error: {}", e)))?;

        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, DomainError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = [0u8; 256];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            match tokio::time::timeout_at(deadline, self.port.read(&mut buffer)).await {
                Ok(Ok(0)) => return Ok(None),
                Ok(Ok(n)) => self.pending.extend_from_slice(&buffer[..n]),
                Ok(Err(e)) => {
                    return Err(DomainError::Transport(format!(
                        "Read error on {}: {}",
                        self.endpoint, e
                    )));
                }
                Err(_) => {
                    // Timeout: hand back an unterminated line if there is one
                    let partial = String::from_utf8_lossy(&self.pending).trim().to_string();
                    self.pending.clear();
                    return Ok((!partial.is_empty()).then_some(partial));
                }
            }
        }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
