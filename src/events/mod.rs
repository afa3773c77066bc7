//! Account and session activity events.
//!
//! Every action dispatches an [`AuthEvent`] describing what happened.
//! Dispatch is awaited inline, so by the time an action returns, its
//! listeners have already run; with nothing registered it is a no-op.
//!
//! Install listeners once at startup:
//!
//! ```rust,ignore
//! umbra_auth::register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```
//!
//! Anything implementing [`Listener`] can be registered. The bundled
//! [`listeners::LoggingListener`] writes each event to the `log` facade;
//! `TracingListener` (behind the `tracing` feature) emits tracing events
//! instead.

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::AuthEvent;
pub use listener::Listener;
pub use registry::{dispatch, register_event_listeners, EventRegistry};
