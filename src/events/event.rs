use chrono::{DateTime, Utc};

use crate::store::LogoutScope;

/// What happened, to whom, and when.
///
/// Actions construct these and hand them to [`dispatch`](super::dispatch);
/// with no registry installed they vanish. Payloads carry ids and addresses
/// only, never credentials or token material.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    // account lifecycle
    UserRegistered {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },

    // sessions
    LoginSuccess {
        user_id: i64,
        session_id: i64,
        at: DateTime<Utc>,
    },
    LoginFailed {
        email: String,
        reason: String,
        at: DateTime<Utc>,
    },
    LogoutSuccess {
        user_id: i64,
        scope: LogoutScope,
        at: DateTime<Utc>,
    },

    // password recovery
    PasswordResetRequested {
        email: String,
        at: DateTime<Utc>,
    },
    PasswordResetCompleted {
        user_id: i64,
        at: DateTime<Utc>,
    },

    // verification
    EmailVerificationSent {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },
    EmailVerified {
        user_id: i64,
        at: DateTime<Utc>,
    },
}

impl AuthEvent {
    /// Dot-separated name for log lines and tracing fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user.registered",
            Self::LoginSuccess { .. } => "auth.login.success",
            Self::LoginFailed { .. } => "auth.login.failed",
            Self::LogoutSuccess { .. } => "auth.logout.success",
            Self::PasswordResetRequested { .. } => "auth.password.reset_requested",
            Self::PasswordResetCompleted { .. } => "auth.password.reset_completed",
            Self::EmailVerificationSent { .. } => "auth.email.verification_sent",
            Self::EmailVerified { .. } => "auth.email.verified",
        }
    }

    /// When the event happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::UserRegistered { at, .. }
            | Self::LoginSuccess { at, .. }
            | Self::LoginFailed { at, .. }
            | Self::LogoutSuccess { at, .. }
            | Self::PasswordResetRequested { at, .. }
            | Self::PasswordResetCompleted { at, .. }
            | Self::EmailVerificationSent { at, .. }
            | Self::EmailVerified { at, .. } => *at,
        }
    }
}
