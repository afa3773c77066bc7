use async_trait::async_trait;

use super::AuthEvent;

/// An observer of authentication events.
///
/// Implementations receive every dispatched [`AuthEvent`] and match on the
/// variants they care about; a listener that ignores an event just returns.
/// Typical uses are audit trails and notification hooks.
///
/// ```rust,ignore
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use async_trait::async_trait;
/// use umbra_auth::events::{AuthEvent, Listener};
///
/// #[derive(Default)]
/// struct FailureCounter(AtomicU64);
///
/// #[async_trait]
/// impl Listener for FailureCounter {
///     async fn handle(&self, event: &AuthEvent) {
///         if matches!(event, AuthEvent::LoginFailed { .. }) {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Receives one dispatched event.
    ///
    /// Runs on the task that performed the operation, so keep it quick or
    /// spawn the slow part.
    async fn handle(&self, event: &AuthEvent);
}
