use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::SecretString;
use crate::session::Session;
use crate::AuthError;

/// How an account authenticates.
///
/// Native accounts carry a password hash; OAuth accounts are keyed by the
/// provider's subject and have no local credential. The serialized form is
/// tagged so store adapters can persist it as a single embedded document.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum UserVariant {
    #[serde(rename = "native")]
    Native { password_hash: String },
    #[serde(rename = "oauth")]
    OAuth { provider: String, subject: String },
}

impl UserVariant {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }

    /// The stored password hash, for native accounts only.
    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Self::Native { password_hash } => Some(password_hash),
            Self::OAuth { .. } => None,
        }
    }
}

impl fmt::Debug for UserVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native { .. } => f
                .debug_struct("Native")
                .field("password_hash", &"[REDACTED]")
                .finish(),
            Self::OAuth { provider, subject } => f
                .debug_struct("OAuth")
                .field("provider", provider)
                .field("subject", subject)
                .finish(),
        }
    }
}

/// A user record as the store holds it: profile, credential variant, codes,
/// and the embedded session list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub variant: UserVariant,
    pub admin: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Last issued password-reset code; exactly one is valid at a time.
    pub reset_code: Option<SecretString>,
    /// Outstanding email-verification code, cleared on success.
    pub verification_code: Option<SecretString>,
    pub sessions: Vec<Session>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl AuthUser {
    /// A bare native user for unit tests that never touch a store.
    pub fn mock(email: &str) -> Self {
        let now = Utc::now();
        AuthUser {
            id: 1,
            email: email.to_owned(),
            name: "Test User".to_owned(),
            variant: UserVariant::Native {
                password_hash: "fakehashedpassword".to_owned(),
            },
            admin: false,
            email_verified_at: None,
            reset_code: None,
            verification_code: None,
            sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A mock OAuth user.
    pub fn mock_oauth(email: &str, provider: &str, subject: &str) -> Self {
        AuthUser {
            variant: UserVariant::OAuth {
                provider: provider.to_owned(),
                subject: subject.to_owned(),
            },
            ..Self::mock(email)
        }
    }
}

/// Input for creating a user. The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub variant: UserVariant,
}

/// Which sessions a logout removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutScope {
    /// Remove one session by id.
    Session(i64),
    /// Remove every session the user has.
    All,
}

/// Persistence operations the auth core needs.
///
/// Implementations map these onto whatever holds the user documents. All
/// session and code updates target a single user record; removals of
/// missing users or sessions are no-ops, matching the update-if-match
/// semantics of a document store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError>;

    /// Lookup by exact email. Callers normalize (trim + lowercase) first.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;

    /// Creates a user with no sessions, no codes, and an unverified email.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] with
    /// [`ValidationError::EmailTaken`](crate::ValidationError::EmailTaken)
    /// when the email is already registered.
    async fn create_user(&self, new_user: NewUser) -> Result<AuthUser, AuthError>;

    /// Overwrites the user's whole session list.
    async fn replace_sessions(
        &self,
        user_id: i64,
        sessions: Vec<Session>,
    ) -> Result<(), AuthError>;

    /// Sets `accessed_at` on one session. No-op if the user or session is gone.
    async fn touch_session(
        &self,
        user_id: i64,
        session_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Removes sessions per `scope`. No-op if nothing matches.
    async fn remove_sessions(&self, user_id: i64, scope: LogoutScope) -> Result<(), AuthError>;

    /// Replaces the password hash of a native user.
    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), AuthError>;

    /// Stamps `email_verified_at` with the current time.
    async fn mark_email_verified(&self, user_id: i64) -> Result<(), AuthError>;

    /// Sets or clears the password-reset code.
    async fn set_reset_code(&self, user_id: i64, code: Option<&str>) -> Result<(), AuthError>;

    /// Sets or clears the email-verification code.
    async fn set_verification_code(
        &self,
        user_id: i64,
        code: Option<&str>,
    ) -> Result<(), AuthError>;
}
