use std::sync::Arc;

use chrono::Utc;

use crate::codes;
use crate::crypto;
use crate::events::{self, AuthEvent};
use crate::store::UserStore;
use crate::validators::normalize_email;
use crate::AuthError;

/// Marks an email address verified with an emailed code.
pub struct VerifyEmailAction<S> {
    store: Arc<S>,
}

impl<S: UserStore> VerifyEmailAction<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Verifies the account the code was issued to.
    ///
    /// Verification links never expire, but the stored code is cleared on
    /// success, so clicking the same link twice fails the second time.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCode`] for a malformed, unknown, or mismatched
    /// code, including any code that was already used.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "verify_email", skip_all, err)
    )]
    pub async fn execute(&self, code: &str) -> Result<(), AuthError> {
        let decoded = codes::decode_code(code).ok_or(AuthError::InvalidCode)?;

        let user = self
            .store
            .find_user_by_email(&normalize_email(&decoded.email))
            .await?
            .ok_or(AuthError::InvalidCode)?;

        let stored = user
            .verification_code
            .as_ref()
            .ok_or(AuthError::InvalidCode)?;
        if !crypto::constant_time_eq(stored.expose_secret().as_bytes(), code.as_bytes()) {
            return Err(AuthError::InvalidCode);
        }

        self.store.mark_email_verified(user.id).await?;
        self.store.set_verification_code(user.id, None).await?;

        log::info!(
            target: "umbra_auth::actions",
            "msg=\"email verified\" user_id={}",
            user.id
        );

        events::dispatch(AuthEvent::EmailVerified {
            user_id: user.id,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}
