use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use domain::DomainError;
use domain::device::Endpoint;
use domain::driver::InputEventSource;
use domain::scan::InputEvent;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Size of `struct timeval` at the head of every `struct input_event`
#[cfg(target_pointer_width = "64")]
const TIMEVAL_SIZE: usize = 16;
#[cfg(not(target_pointer_width = "64"))]
const TIMEVAL_SIZE: usize = 8;

/// timeval + type (u16) + code (u16) + value (i32)
pub const INPUT_EVENT_SIZE: usize = TIMEVAL_SIZE + 8;

const READ_BATCH: usize = 64;

/// Reads raw `struct input_event` records from a Linux evdev node
/// (`/dev/input/eventN` or one of its `/dev/input/by-id` aliases).
pub struct EvdevInputSource {
    endpoint: Endpoint,
    file: File,
    pending: BytesMut,
}

impl EvdevInputSource {
    pub async fn open(endpoint: &Endpoint) -> Result<Self, DomainError> {
        let file = File::open(endpoint.as_str()).await.map_err(|e| {
            DomainError::Transport(format!("Failed to open input device {}: {}", endpoint, e))
        })?;

        tracing::debug!(device = %endpoint, "Opened input device");

        Ok(Self {
            endpoint: endpoint.clone(),
            file,
            pending: BytesMut::with_capacity(INPUT_EVENT_SIZE * READ_BATCH),
        })
    }
}

/// Split every complete record off the front of `buffer`
pub fn decode_records(buffer: &mut BytesMut) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(buffer.len() / INPUT_EVENT_SIZE);
    while buffer.len() >= INPUT_EVENT_SIZE {
        let mut record = buffer.split_to(INPUT_EVENT_SIZE);
        record.advance(TIMEVAL_SIZE);
        let event_type = record.get_u16_ne();
        let code = record.get_u16_ne();
        let value = record.get_i32_ne();
        events.push(InputEvent::new(event_type, code, value));
    }
    events
}

#[async_trait]
impl InputEventSource for EvdevInputSource {
    async fn read_events(&mut self) -> Result<Vec<InputEvent>, DomainError> {
        loop {
            let events = decode_records(&mut self.pending);
            if !events.is_empty() {
                return Ok(events);
            }

            self.pending.reserve(INPUT_EVENT_SIZE * READ_BATCH);
            let n = self.file.read_buf(&mut self.pending).await.map_err(|e| {
                DomainError::Transport(format!("Read error on {}: {}", self.endpoint, e))
            })?;

            if n == 0 {
                return Err(DomainError::EndpointUnavailable(format!(
                    "Input device {} closed",
                    self.endpoint
                )));
            }
        }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
