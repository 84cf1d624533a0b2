//! User-facing notifications from sync runs

use log::info;

/// Delivers short messages to the user
///
/// The host decides how (toast, status bar, terminal). Sync emits at most a
/// progress line per page and one summary per run, and nothing in silent
/// mode except credential exhaustion.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}
