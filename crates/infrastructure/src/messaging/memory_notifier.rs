use std::sync::{Arc, Mutex};

use domain::notification::{Notification, Notifier, Severity};

/// Keeps every notification in memory. Clones share the same log.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    pub received: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.received
            .lock()
            .map(|log| log.iter().filter(|n| n.severity == severity).count())
            .unwrap_or(0)
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut log) = self.received.lock() {
            log.push(notification);
        }
    }
}
