//! User facing notifications. Displaying them is up to the host, so only the
//! capability is defined here along with implementations that log.

/// Shows a short message to the user. Delivery is best-effort.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::info!("{message}");
    }
}

/// Used when notifications are turned off in the config
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, message: &str) {
        log::debug!("Notification suppressed: {message}");
    }
}
