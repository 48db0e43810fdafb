use std::sync::Arc;
use std::time::Duration;

use domain::device::Endpoint;
use domain::driver::{SerialLink, TransportOpener};
use domain::protocol;
use tracing::{debug, warn};

/// Result of one identity handshake
pub struct ProbeOutcome {
    /// Trimmed identity response, empty if the endpoint never answered
    pub identity: String,
    /// The still-open link, kept so the endpoint can be bound without reopening
    pub link: Option<Box<dyn SerialLink>>,
}

impl ProbeOutcome {
    fn silent(link: Option<Box<dyn SerialLink>>) -> Self {
        Self {
            identity: String::new(),
            link,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
    }
}

/// Asks serial endpoints who they are
#[derive(Clone)]
pub struct HandshakeProber {
    opener: Arc<dyn TransportOpener>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HandshakeProber {
    pub fn new(opener: Arc<dyn TransportOpener>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            opener,
            max_retries,
            retry_delay,
        }
    }

    /// Send `id` until the endpoint answers or the retries run out.
    ///
    /// Never fails: any transport fault reads as "no identity".
    pub async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        let mut link = match self.opener.open_serial(endpoint).await {
            Ok(link) => link,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Probe could not open endpoint");
                return ProbeOutcome::silent(None);
            }
        };

        if let Err(e) = link.clear_buffers().await {
            warn!(endpoint = %endpoint, error = %e, "Probe could not clear buffers");
            return ProbeOutcome::silent(None);
        }

        for attempt in 1..=self.max_retries {
            if let Err(e) = link.send(protocol::REQ_ID).await {
                warn!(endpoint = %endpoint, error = %e, "Probe write failed");
                return ProbeOutcome::silent(None);
            }

            tokio::time::sleep(self.retry_delay).await;

            match link.read_line().await {
                Ok(Some(response)) if !response.trim().is_empty() => {
                    let identity = response.trim().to_string();
                    debug!(endpoint = %endpoint, attempt, identity = %identity, "Endpoint identified");
                    return ProbeOutcome {
                        identity,
                        link: Some(link),
                    };
                }
                Ok(_) => {
                    debug!(endpoint = %endpoint, attempt, "No identity yet");
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Probe read failed");
                    return ProbeOutcome::silent(None);
                }
            }
        }

        debug!(endpoint = %endpoint, retries = self.max_retries, "Endpoint never identified");
        ProbeOutcome::silent(Some(link))
    }
}
