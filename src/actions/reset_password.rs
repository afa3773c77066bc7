use std::sync::Arc;

use chrono::Utc;

use crate::codes;
use crate::crypto::{self, Argon2Hasher, PasswordHasher};
use crate::events::{self, AuthEvent};
use crate::store::UserStore;
use crate::validators::{normalize_email, PasswordPolicy};
use crate::AuthError;

/// Completes a password reset with an emailed code.
pub struct ResetPasswordAction<S> {
    store: Arc<S>,
    hasher: Arc<dyn PasswordHasher>,
    policy: PasswordPolicy,
}

impl<S: UserStore> ResetPasswordAction<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            hasher: Arc::new(Argon2Hasher::default()),
            policy: PasswordPolicy::new(),
        }
    }

    /// Swaps the password hasher used for the new credential.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Overrides the password policy.
    #[must_use]
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets a new password for the account the code was issued to.
    ///
    /// The code is single-use: it is cleared on success, and only the most
    /// recently issued code matches the stored copy in the first place.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when the new password fails the policy;
    /// [`AuthError::InvalidCode`] for a malformed, unknown, mismatched, or
    /// expired code. The caller cannot tell those cases apart.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "reset_password", skip_all, err)
    )]
    pub async fn execute(&self, code: &str, new_password: &str) -> Result<(), AuthError> {
        self.policy.validate(new_password)?;

        let decoded = codes::decode_code(code).ok_or(AuthError::InvalidCode)?;

        let user = self
            .store
            .find_user_by_email(&normalize_email(&decoded.email))
            .await?
            .ok_or(AuthError::InvalidCode)?;

        let stored = user.reset_code.as_ref().ok_or(AuthError::InvalidCode)?;
        if !crypto::constant_time_eq(stored.expose_secret().as_bytes(), code.as_bytes()) {
            return Err(AuthError::InvalidCode);
        }

        // Reset codes always carry an expiry; a code without one cannot have
        // come from issue_reset_code.
        let expires_at = decoded.expires_at.ok_or(AuthError::InvalidCode)?;
        if expires_at < Utc::now() {
            return Err(AuthError::InvalidCode);
        }

        let password_hash = self.hasher.hash(new_password)?;
        self.store.update_password(user.id, &password_hash).await?;
        self.store.set_reset_code(user.id, None).await?;

        log::info!(
            target: "umbra_auth::actions",
            "msg=\"password reset completed\" user_id={}",
            user.id
        );

        events::dispatch(AuthEvent::PasswordResetCompleted {
            user_id: user.id,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}
