use domain::Scan;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::ScanDecoder;
use crate::registry::SharedInput;

/// Background task decoding the badge reader into scans.
///
/// Exits when the input handle fails, so the supervisor can rediscover
/// the device. Dropping the reader aborts the task.
pub struct ScanReader {
    handle: JoinHandle<()>,
}

impl ScanReader {
    pub fn spawn(
        source: SharedInput,
        scan_length: usize,
        scans: mpsc::Sender<Scan>,
        cancel: CancellationToken,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut decoder = ScanDecoder::new(scan_length);
            info!("📡 Listening for badges");

            loop {
                let mut input = source.lock().await;
                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = decoder.read_scan(input.as_mut()) => result,
                };

                match result {
                    Ok(Some(scan)) => {
                        if scans.send(scan).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(_) => {
                        info!(device = %input.endpoint(), "Badge reader stopped");
                        break;
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScanReader {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
