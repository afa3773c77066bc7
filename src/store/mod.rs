//! User persistence boundary.
//!
//! The crate never talks to a database directly; everything goes through
//! [`UserStore`]. Sessions and codes are embedded in the user record, so the
//! trait is deliberately shaped like targeted updates on a single document
//! rather than a relational schema.

mod user;

#[cfg(any(test, feature = "mocks"))]
mod memory;

pub use user::{AuthUser, LogoutScope, NewUser, UserStore, UserVariant};

#[cfg(any(test, feature = "mocks"))]
pub use memory::MemoryUserStore;
