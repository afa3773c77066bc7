//! Built-in event listeners.

mod logging;

pub use logging::LoggingListener;

#[cfg(feature = "tracing")]
mod tracing;

#[cfg(feature = "tracing")]
pub use tracing::TracingListener;
