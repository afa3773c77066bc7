use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::codes;
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::events::{self, AuthEvent};
use crate::mail::{self, MailRequest, MailTemplate, Mailer};
use crate::store::UserStore;
use crate::validators::ValidationError;
use crate::AuthError;

/// (Re)sends the verification mail for the signed-in user.
pub struct SendVerificationAction<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
    mailer: Arc<dyn Mailer>,
}

impl<S: UserStore> SendVerificationAction<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }

    /// Issues a fresh verification code and queues the mail.
    ///
    /// Any previously issued code stops working; the stored copy is
    /// overwritten before the mail is queued.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] when `ctx` holds no resolved identity;
    /// [`AuthError::Validation`] with [`ValidationError::EmailAlreadyVerified`]
    /// once the address is verified.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "send_verification", skip_all, err)
    )]
    pub async fn execute(&self, ctx: &RequestContext) -> Result<(), AuthError> {
        let user = ctx.require_user()?;
        if user.is_verified() {
            return Err(ValidationError::EmailAlreadyVerified.into());
        }

        let code = codes::issue_verification_code(&user.email);
        self.store
            .set_verification_code(user.id, Some(&code))
            .await?;

        let link = mail::verification_link(&self.config.mail.base_url, &code);
        mail::send_detached(
            self.mailer.clone(),
            MailRequest {
                template: MailTemplate::VerifyEmail,
                to: user.email.clone(),
                data: json!({ "name": user.name, "link": link }),
            },
        );

        log::info!(
            target: "umbra_auth::actions",
            "msg=\"verification mail queued\" user_id={}",
            user.id
        );

        events::dispatch(AuthEvent::EmailVerificationSent {
            user_id: user.id,
            email: user.email.clone(),
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}
