use async_trait::async_trait;

use crate::events::{AuthEvent, Listener};

/// Listener that emits a [`tracing`] event for every auth event.
///
/// Only available with the `tracing` feature enabled.
pub struct TracingListener;

impl TracingListener {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &AuthEvent) {
        tracing::info!(
            target: "umbra_auth::events",
            event = event.name(),
            payload = ?event,
            "auth event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_handle_does_not_panic() {
        let listener = TracingListener::new();
        listener
            .handle(&AuthEvent::PasswordResetCompleted {
                user_id: 7,
                at: Utc::now(),
            })
            .await;
    }
}
