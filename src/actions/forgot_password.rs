use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::codes;
use crate::config::AuthConfig;
use crate::events::{self, AuthEvent};
use crate::mail::{self, MailRequest, MailTemplate, Mailer};
use crate::store::UserStore;
use crate::validators::normalize_email;
use crate::AuthError;

/// Starts the emailed password-reset flow.
pub struct ForgotPasswordAction<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
    mailer: Arc<dyn Mailer>,
}

impl<S: UserStore> ForgotPasswordAction<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }

    /// Requests a password reset for `email`.
    ///
    /// For a native account the stored code is overwritten (the last issued
    /// code is the only valid one) and the reset mail goes out on a detached
    /// task.
    ///
    /// # Security
    ///
    /// Always returns `Ok(())` for unknown addresses and OAuth accounts, so
    /// the response never reveals whether an address is registered. Surface
    /// a generic "if an account exists, a mail has been sent" message
    /// regardless.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "forgot_password", skip_all, err)
    )]
    pub async fn execute(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Ok(());
        };
        if !user.variant.is_native() {
            // OAuth accounts have no password; answering differently would
            // leak that the address is registered.
            return Ok(());
        }

        let code = codes::issue_reset_code(&email, Utc::now(), self.config.codes.reset_validity);
        self.store.set_reset_code(user.id, Some(&code)).await?;

        let link = mail::reset_link(&self.config.mail.base_url, &code);
        mail::send_detached(
            self.mailer.clone(),
            MailRequest {
                template: MailTemplate::ResetPassword,
                to: user.email.clone(),
                data: json!({ "name": user.name, "link": link }),
            },
        );

        log::info!(
            target: "umbra_auth::actions",
            "msg=\"password reset requested\" user_id={}",
            user.id
        );

        events::dispatch(AuthEvent::PasswordResetRequested {
            email,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}
