use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::codes;
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::crypto::{Argon2Hasher, PasswordHasher, SecretString};
use crate::events::{self, AuthEvent};
use crate::mail::{self, MailRequest, MailTemplate, Mailer};
use crate::session::agent::{AgentParser, BuiltinAgentParser};
use crate::store::{AuthUser, NewUser, UserStore, UserVariant};
use crate::validators::{self, PasswordPolicy};
use crate::AuthError;

/// Input for account creation.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

/// Creates a native account, signs it in, and queues the verification mail.
pub struct RegisterAction<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
    mailer: Arc<dyn Mailer>,
    hasher: Arc<dyn PasswordHasher>,
    agent: Arc<dyn AgentParser>,
    policy: PasswordPolicy,
}

impl<S: UserStore> RegisterAction<S> {
    /// Creates a register action with the default Argon2 hasher, builtin
    /// user-agent parser, and default password policy.
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
            hasher: Arc::new(Argon2Hasher::default()),
            agent: Arc::new(BuiltinAgentParser),
            policy: PasswordPolicy::new(),
        }
    }

    /// Swaps the password hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Swaps the user-agent parser.
    #[must_use]
    pub fn with_agent_parser(mut self, parser: Arc<dyn AgentParser>) -> Self {
        self.agent = parser;
        self
    }

    /// Overrides the password policy, e.g. [`PasswordPolicy::strict`].
    #[must_use]
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a new native account.
    ///
    /// The fresh account is signed in immediately: a session is appended,
    /// the cookie queued on `ctx`, and the identity cached there. A
    /// verification code is stored on the user and the verification mail is
    /// sent on a detached task.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when email, name, or password fail their
    /// rules, including `EmailTaken` for a duplicate address.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "register", skip_all, err))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        input: RegisterInput,
        user_agent: Option<&str>,
    ) -> Result<AuthUser, AuthError> {
        let email = validators::normalize_email(&input.email);
        validators::validate_email(&email)?;
        validators::validate_name(&input.name)?;
        self.policy.validate(input.password.expose_secret())?;

        let password_hash = self.hasher.hash(input.password.expose_secret())?;

        let mut user = self
            .store
            .create_user(NewUser {
                email: email.clone(),
                name: input.name.trim().to_owned(),
                variant: UserVariant::Native { password_hash },
            })
            .await?;

        let code = codes::issue_verification_code(&email);
        self.store
            .set_verification_code(user.id, Some(&code))
            .await?;
        user.verification_code = Some(SecretString::new(code.clone()));

        super::establish_session(
            self.store.as_ref(),
            &self.config,
            ctx,
            &mut user,
            user_agent,
            self.agent.as_ref(),
        )
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
            "msg=\"user registered\" user_id={}",
            user.id
        );

        let now = Utc::now();
        events::dispatch(AuthEvent::UserRegistered {
            user_id: user.id,
            email: user.email.clone(),
            at: now,
        })
        .await;
        events::dispatch(AuthEvent::EmailVerificationSent {
            user_id: user.id,
            email: user.email.clone(),
            at: now,
        })
        .await;

        Ok(user)
    }
}
