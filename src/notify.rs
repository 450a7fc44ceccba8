//! Transient user-facing notifications.

use tracing::{info, warn};

/// Fire-and-forget sink for toasts. The controller never reads it back.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Prints notifications to stderr so they never interleave with a reply
/// being revealed on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn error(&self, message: &str) {
        warn!(%message, "notify error");
        eprintln!("❌ {}", message);
    }

    fn info(&self, message: &str) {
        info!(%message, "notify info");
        eprintln!("ℹ️  {}", message);
    }
}
