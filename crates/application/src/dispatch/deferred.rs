use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Work posted back to the supervisor loop by a fired timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredCommand {
    StopChart { generation: u64 },
}

/// Single pending chart-stop timer.
///
/// Scheduling replaces the previous timer. Every schedule or cancel bumps
/// the generation, so a command already posted by a replaced timer is
/// recognised as stale.
pub struct DeferredAction {
    tx: mpsc::UnboundedSender<DeferredCommand>,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

impl DeferredAction {
    pub fn new(tx: mpsc::UnboundedSender<DeferredCommand>) -> Self {
        Self {
            tx,
            pending: None,
            generation: 0,
        }
    }

    /// Post a chart stop after `after`, replacing any pending one
    pub fn schedule(&mut self, after: Duration) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(DeferredCommand::StopChart { generation });
        }));
        generation
    }

    /// Returns true if a timer was pending
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Accept a fired command if it belongs to the current timer
    pub fn complete(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DeferredAction {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
