use domain::notification::{Notification, Notifier, Severity};
use tracing::{error, info, warn};

/// Routes notifications into the log, at a level matching their severity
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let at = notification.timestamp.to_rfc3339();
        match notification.severity {
            Severity::Critical => error!(at = %at, "🚨 {}", notification.message),
            Severity::Warning => warn!(at = %at, "⚠️ {}", notification.message),
            Severity::Info => info!(at = %at, "{}", notification.message),
        }
    }
}
