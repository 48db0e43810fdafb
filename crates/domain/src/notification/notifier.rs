use super::{Notification, Severity};

/// Sink for severity-tagged notifications (console, operator display, ...)
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn notify_message(&self, severity: Severity, message: &str) {
        self.notify(Notification::new(severity, message));
    }
}
