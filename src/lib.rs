//! Session and identity core for the Shadow Archive backend.
//!
//! This crate owns the stateful half of authentication: cookie-encoded
//! session tokens, the per-user embedded session list, CSRF token derivation,
//! the password-reset and email-verification code envelopes, and the
//! per-request context everything downstream reads its identity from.
//!
//! Persistence, transport, and mail delivery stay outside: bring a
//! [`store::UserStore`], a [`mail::Mailer`], and (optionally) your own
//! [`session::agent::AgentParser`], wire the actions into your resolvers,
//! and flush [`context::RequestContext::take_cookies`] into the response.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use umbra_auth::actions::LoginAction;
//! use umbra_auth::{AuthConfig, RequestContext};
//!
//! let config = Arc::new(AuthConfig::default());
//! let store = Arc::new(MongoUserStore::new(db));
//! let login = LoginAction::new(Arc::clone(&store), Arc::clone(&config));
//!
//! // per request:
//! let ctx = RequestContext::new().with_session_cookie(cookie_value);
//! let user = login.execute(&ctx, email, password, user_agent).await?;
//! for cookie in ctx.take_cookies() {
//!     response.append_header("set-cookie", cookie.header());
//! }
//! ```

pub mod actions;
pub mod boundary;
pub mod codes;
pub mod config;
pub mod context;
pub mod crypto;
pub mod csrf;
pub mod events;
pub mod mail;
pub mod session;
pub mod store;
pub mod validators;

pub use boundary::ClientError;
pub use config::{AuthConfig, Environment};
pub use context::RequestContext;
pub use crypto::{Argon2Hasher, LegacyCtrHasher, PasswordHasher, SecretString};
pub use csrf::{CsrfDigest, CsrfPolicy, CsrfService, OperationKind, CSRF_HEADER};
pub use events::register_event_listeners;
pub use mail::{MailRequest, MailTemplate, Mailer, RetryingMailer};
pub use session::resolver::{Authenticated, SessionResolver};
pub use session::Session;
pub use store::{AuthUser, LogoutScope, NewUser, UserStore, UserVariant};
pub use validators::ValidationError;

#[cfg(any(test, feature = "mocks"))]
pub use mail::MockMailer;
#[cfg(any(test, feature = "mocks"))]
pub use store::MemoryUserStore;

use std::fmt;

/// Error taxonomy for every operation in this crate.
///
/// The first seven variants are expected runtime outcomes a client can
/// branch on; [`AuthError::Server`] is the only unexpected one. Transport
/// edges hand any of these to [`boundary::report`], which maps them onto
/// the stable wire codes and logs at the right severity.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No valid session where one is required.
    Unauthenticated,
    /// Valid session, but the account's email address is not verified.
    Unverified,
    /// Wrong email/password pair. Also returned for an unknown email so the
    /// response never reveals which half was wrong.
    InvalidCredentials,
    /// Missing, expired, or mismatched CSRF token.
    CsrfInvalid,
    /// Malformed, expired, or non-matching reset/verification code.
    InvalidCode,
    /// Entity lookup came up empty outside the credential paths.
    NotFound,
    /// Input rejected before any side effect; carries field-level detail.
    Validation(ValidationError),
    /// Unexpected failure (persistence, programmer error). The detail is for
    /// server-side logs only and never reaches a client.
    Server(String),
}

impl AuthError {
    /// Stable machine-readable code, part of the client wire contract.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unverified => "UNVERIFIED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::CsrfInvalid => "CSRF_INVALID",
            Self::InvalidCode => "INVALID_CODE",
            Self::NotFound => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Server(_) => "SERVER_ERROR",
        }
    }

    /// True for errors that are normal runtime outcomes rather than bugs.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Server(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Authentication required"),
            Self::Unverified => write!(f, "Email address not verified"),
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
            Self::CsrfInvalid => write!(f, "Invalid or expired CSRF token"),
            Self::InvalidCode => write!(f, "Invalid or expired code"),
            Self::NotFound => write!(f, "Resource not found"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Server(detail) => write!(f, "Server error: {detail}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(AuthError::Unauthenticated.code(), "UNAUTHENTICATED");
        assert_eq!(AuthError::Unverified.code(), "UNVERIFIED");
        assert_eq!(AuthError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
        assert_eq!(AuthError::CsrfInvalid.code(), "CSRF_INVALID");
        assert_eq!(AuthError::InvalidCode.code(), "INVALID_CODE");
        assert_eq!(AuthError::NotFound.code(), "NOT_FOUND");
        assert_eq!(
            AuthError::Validation(ValidationError::EmailEmpty).code(),
            "VALIDATION_FAILED"
        );
        assert_eq!(AuthError::Server("boom".to_owned()).code(), "SERVER_ERROR");
    }

    #[test]
    fn test_expected_classification() {
        assert!(AuthError::Unauthenticated.is_expected());
        assert!(AuthError::InvalidCode.is_expected());
        assert!(!AuthError::Server("db down".to_owned()).is_expected());
    }

    #[test]
    fn test_validation_display_passes_through() {
        let err = AuthError::from(ValidationError::PasswordTooShort(8));
        assert_eq!(
            err.to_string(),
            ValidationError::PasswordTooShort(8).to_string()
        );
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_server_detail_stays_out_of_credential_errors() {
        // InvalidCredentials must read the same regardless of cause.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
