use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use domain::DomainError;
use domain::device::Endpoint;
use domain::driver::{InputEventSource, PortScanner, SerialLink, TransportOpener};
use domain::protocol;
use domain::scan::{InputEvent, KEY_ENTER};
use tokio::sync::mpsc;

/// In-memory USB bus: serial peripherals that answer the station protocol
/// and keyboard-style input devices, all hot-pluggable.
///
/// Implements both [`PortScanner`] and [`TransportOpener`], so the whole
/// discovery stack can run against it without hardware.
#[derive(Clone)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
    prefix: String,
    max_ports: usize,
}

#[derive(Default)]
struct BusState {
    ports: HashMap<String, SimulatedPort>,
    /// Requests received per path, kept across unplug/replug
    history: HashMap<String, Vec<String>>,
    serial_opens: HashMap<String, usize>,
    input_opens: HashMap<String, usize>,
    failing_opens: HashMap<String, usize>,
    next_generation: u64,
}

struct SimulatedPort {
    generation: u64,
    kind: PortKind,
}

enum PortKind {
    Serial {
        identity: String,
        /// Identity requests left unanswered before the device replies
        silent_polls: usize,
        outbox: VecDeque<String>,
    },
    Input {
        feed: Option<mpsc::UnboundedSender<Vec<InputEvent>>>,
    },
}

impl SimulatedBus {
    pub fn new(prefix: impl Into<String>, max_ports: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            prefix: prefix.into(),
            max_ports,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Plug in a serial peripheral announcing `identity`
    pub fn attach_serial(&self, path: &str, identity: &str) -> Result<Endpoint, DomainError> {
        self.attach_serial_with_delay(path, identity, 0)
    }

    /// Plug in a serial peripheral that ignores its first `silent_polls` identity requests
    pub fn attach_serial_with_delay(
        &self,
        path: &str,
        identity: &str,
        silent_polls: usize,
    ) -> Result<Endpoint, DomainError> {
        let endpoint = Endpoint::new(path)?;
        let mut state = self.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        state.ports.insert(
            path.to_string(),
            SimulatedPort {
                generation,
                kind: PortKind::Serial {
                    identity: identity.to_string(),
                    silent_polls,
                    outbox: VecDeque::new(),
                },
            },
        );
        tracing::debug!(port = %endpoint, identity, "Simulated serial device attached");
        Ok(endpoint)
    }

    /// Plug in a keyboard-style input device
    pub fn attach_input(&self, path: &str) -> Result<Endpoint, DomainError> {
        let endpoint = Endpoint::new(path)?;
        let mut state = self.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        state.ports.insert(
            path.to_string(),
            SimulatedPort {
                generation,
                kind: PortKind::Input { feed: None },
            },
        );
        tracing::debug!(device = %endpoint, "Simulated input device attached");
        Ok(endpoint)
    }

    /// Unplug whatever is on `path`. Open handles fail from now on.
    pub fn detach(&self, path: &str) {
        if self.lock().ports.remove(path).is_some() {
            tracing::debug!(port = %path, "Simulated device detached");
        }
    }

    /// Make the next `count` open attempts on `path` fail with an I/O error
    pub fn fail_next_opens(&self, path: &str, count: usize) {
        self.lock().failing_opens.insert(path.to_string(), count);
    }

    /// Deliver raw events to the input device on `path`.
    /// Returns false if nothing has the device open.
    pub fn push_events(&self, path: &str, events: Vec<InputEvent>) -> bool {
        let state = self.lock();
        match state.ports.get(path).map(|p| &p.kind) {
            Some(PortKind::Input { feed: Some(tx) }) => tx.send(events).is_ok(),
            _ => false,
        }
    }

    /// Type a badge: one key press per digit followed by Enter
    pub fn type_badge(&self, path: &str, digits: &[u8]) -> bool {
        let mut events: Vec<InputEvent> = digits
            .iter()
            .map(|d| InputEvent::key_press(digit_scancode(*d)))
            .collect();
        events.push(InputEvent::key_press(KEY_ENTER));
        self.push_events(path, events)
    }

    /// Every request a serial device on `path` has received
    pub fn requests(&self, path: &str) -> Vec<String> {
        self.lock()
            .history
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// How many serial links were opened on `path` (each probe opens one)
    pub fn serial_opens(&self, path: &str) -> usize {
        self.lock()
            .serial_opens
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn input_opens(&self, path: &str) -> usize {
        self.lock()
            .input_opens
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    fn check_open(state: &mut BusState, endpoint: &Endpoint) -> Result<u64, DomainError> {
        if let Some(left) = state.failing_opens.get_mut(endpoint.as_str()) {
            if *left > 0 {
                *left -= 1;
                return Err(DomainError::Transport(format!(
                    "Simulated open failure on {endpoint}"
                )));
            }
        }
        state
            .ports
            .get(endpoint.as_str())
            .map(|p| p.generation)
            .ok_or_else(|| DomainError::EndpointUnavailable(endpoint.to_string()))
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new("/dev/ttyUSB", 12)
    }
}

/// Keyboard scancode of a decimal digit (1-9 on codes 2-10, 0 on 11)
fn digit_scancode(digit: u8) -> u16 {
    match digit % 10 {
        0 => 11,
        d => d as u16 + 1,
    }
}

fn reply_to(request: &str, identity: &str, silent_polls: &mut usize) -> Option<String> {
    match request {
        protocol::REQ_ID => {
            if *silent_polls > 0 {
                *silent_polls -= 1;
                None
            } else {
                Some(identity.to_string())
            }
        }
        protocol::REQ_START | protocol::REQ_STOP | protocol::REQ_DEBUG | protocol::REQ_NODEBUG => {
            Some(format!("{}:{}", request, protocol::RSP_ACK))
        }
        protocol::REQ_HANDSHAKE => Some(protocol::RSP_HANDSHAKE.to_string()),
        protocol::REQ_STATUS => Some(format!("status: {identity}")),
        other => Some(format!("Unknown-request:{other}")),
    }
}

impl PortScanner for SimulatedBus {
    fn list_candidate_endpoints(&self) -> Vec<Endpoint> {
        let state = self.lock();
        (0..self.max_ports)
            .filter_map(|n| Endpoint::new(format!("{}{}", self.prefix, n)).ok())
            .filter(|ep| state.ports.contains_key(ep.as_str()))
            .collect()
    }

    fn exists(&self, endpoint: Option<&Endpoint>) -> bool {
        endpoint.is_some_and(|ep| self.lock().ports.contains_key(ep.as_str()))
    }
}

#[async_trait]
impl TransportOpener for SimulatedBus {
    async fn open_serial(&self, endpoint: &Endpoint) -> Result<Box<dyn SerialLink>, DomainError> {
        let mut state = self.lock();
        *state.serial_opens.entry(endpoint.to_string()).or_default() += 1;
        let generation = Self::check_open(&mut state, endpoint)?;

        match state.ports.get(endpoint.as_str()).map(|p| &p.kind) {
            Some(PortKind::Serial { .. }) => Ok(Box::new(SimulatedSerialLink {
                bus: self.clone(),
                endpoint: endpoint.clone(),
                generation,
            })),
            _ => Err(DomainError::Transport(format!(
                "{endpoint} is not a serial device"
            ))),
        }
    }

    async fn open_input(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn InputEventSource>, DomainError> {
        let mut state = self.lock();
        *state.input_opens.entry(endpoint.to_string()).or_default() += 1;
        Self::check_open(&mut state, endpoint)?;

        match state.ports.get_mut(endpoint.as_str()).map(|p| &mut p.kind) {
            Some(PortKind::Input { feed }) => {
                let (tx, rx) = mpsc::unbounded_channel();
                // A newer open steals the feed, like a re-opened evdev node
                *feed = Some(tx);
                Ok(Box::new(SimulatedInputSource {
                    endpoint: endpoint.clone(),
                    rx,
                }))
            }
            _ => Err(DomainError::Transport(format!(
                "{endpoint} is not an input device"
            ))),
        }
    }
}

/// Serial link into a [`SimulatedBus`] device
pub struct SimulatedSerialLink {
    bus: SimulatedBus,
    endpoint: Endpoint,
    generation: u64,
}

impl SimulatedSerialLink {
    fn with_port<T>(
        &self,
        f: impl FnOnce(&mut PortKind, &mut Vec<String>) -> T,
    ) -> Result<T, DomainError> {
        let mut state = self.bus.lock();
        let BusState { ports, history, .. } = &mut *state;
        match ports.get_mut(self.endpoint.as_str()) {
            Some(port) if port.generation == self.generation => {
                let log = history.entry(self.endpoint.to_string()).or_default();
                Ok(f(&mut port.kind, log))
            }
            _ => Err(DomainError::Transport(format!(
                "{} disconnected",
                self.endpoint
            ))),
        }
    }
}

#[async_trait]
impl SerialLink for SimulatedSerialLink {
    async fn clear_buffers(&mut self) -> Result<(), DomainError> {
        self.with_port(|kind, _| {
            if let PortKind::Serial { outbox, .. } = kind {
                outbox.clear();
            }
        })
    }

    async fn send(&mut self, token: &str) -> Result<(), DomainError> {
        self.with_port(|kind, log| {
            log.push(token.to_string());
            if let PortKind::Serial {
                identity,
                silent_polls,
                outbox,
            } = kind
            {
                if let Some(reply) = reply_to(token, identity, silent_polls) {
                    outbox.push_back(reply);
                }
            }
        })
    }

    async fn read_line(&mut self) -> Result<Option<String>, DomainError> {
        self.with_port(|kind, _| match kind {
            PortKind::Serial { outbox, .. } => outbox.pop_front(),
            PortKind::Input { .. } => None,
        })
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Input handle into a [`SimulatedBus`] device
pub struct SimulatedInputSource {
    endpoint: Endpoint,
    rx: mpsc::UnboundedReceiver<Vec<InputEvent>>,
}

#[async_trait]
impl InputEventSource for SimulatedInputSource {
    async fn read_events(&mut self) -> Result<Vec<InputEvent>, DomainError> {
        self.rx.recv().await.ok_or_else(|| {
            DomainError::EndpointUnavailable(format!("{} disconnected", self.endpoint))
        })
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
