use async_trait::async_trait;
use log::Level;

use crate::events::{AuthEvent, Listener};

/// Listener that writes every event to the [`log`] facade.
///
/// Events are logged under the `umbra_auth::events` target so hosts can
/// filter them independently of the rest of the crate's output.
pub struct LoggingListener {
    level: Level,
}

impl LoggingListener {
    /// Create a listener that logs at [`Level::Info`].
    #[must_use]
    pub fn new() -> Self {
        Self { level: Level::Info }
    }

    /// Create a listener that logs at the given level.
    #[must_use]
    pub fn with_level(level: Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &AuthEvent) {
        log::log!(
            target: "umbra_auth::events",
            self.level,
            "msg=\"auth event\" event={} payload={:?}",
            event.name(),
            event
        );
    }
}
