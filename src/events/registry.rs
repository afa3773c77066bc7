use std::sync::OnceLock;

use super::{AuthEvent, Listener};

static LISTENERS: OnceLock<EventRegistry> = OnceLock::new();

/// The set of listeners that observe authentication events.
///
/// Built inside the closure passed to [`register_event_listeners`]; once
/// installed it is immutable for the life of the process.
#[derive(Default)]
pub struct EventRegistry {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventRegistry {
    /// Adds a listener. Dispatch order follows registration order.
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }
}

/// Installs the process-wide listener set.
///
/// Call once during startup, before traffic. Embedding applications that
/// do not care about events can skip this entirely; dispatch is then a
/// no-op. A second call is ignored with a warning, since swapping
/// listeners under live traffic is not supported.
///
/// ```rust,ignore
/// umbra_auth::register_event_listeners(|registry| {
///     registry
///         .listen(LoggingListener::new())
///         .listen(AuditTrailListener::new(audit_store));
/// });
/// ```
pub fn register_event_listeners<F>(configure: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::default();
    configure(&mut registry);
    if LISTENERS.set(registry).is_err() {
        log::warn!(
            target: "umbra_auth",
            "msg=\"event listener registration ignored\" reason=\"registry already installed\""
        );
    }
}

/// Hands `event` to every registered listener, in registration order.
///
/// Listeners run sequentially on the caller's task; a listener that wants
/// to do slow work should spawn it rather than hold the flow up.
pub async fn dispatch(event: AuthEvent) {
    let Some(registry) = LISTENERS.get() else {
        return;
    };
    for listener in &registry.listeners {
        listener.handle(&event).await;
    }
}
