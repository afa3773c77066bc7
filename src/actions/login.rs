use std::sync::Arc;

use chrono::Utc;

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{self, AuthEvent};
use crate::session::agent::{AgentParser, BuiltinAgentParser};
use crate::store::{AuthUser, UserStore};
use crate::validators::normalize_email;
use crate::AuthError;

/// Email + password sign-in.
pub struct LoginAction<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
    hasher: Arc<dyn PasswordHasher>,
    agent: Arc<dyn AgentParser>,
}

impl<S: UserStore> LoginAction<S> {
    /// Creates a login action with the default Argon2 hasher and the
    /// builtin user-agent parser.
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            store,
            config,
            hasher: Arc::new(Argon2Hasher::default()),
            agent: Arc::new(BuiltinAgentParser),
        }
    }

    /// Swaps the password hasher, e.g. for credentials imported from the
    /// previous backend via [`LegacyCtrHasher`](crate::crypto::LegacyCtrHasher).
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

    /// Authenticates with email and password and opens a session.
    ///
    /// On success the session cookie is queued on `ctx`, the identity is
    /// cached there, and the returned user carries the appended session.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown email, a wrong
    /// password, or an account that signs in through an OAuth provider.
    /// The three cases are indistinguishable to the caller.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "login", skip_all, err))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
        user_agent: Option<&str>,
    ) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);

        let Some(mut user) = self.store.find_user_by_email(&email).await? else {
            return Err(self.rejected(&email, "unknown email").await);
        };

        let Some(hash) = user.variant.password_hash() else {
            return Err(self.rejected(&email, "provider account").await);
        };

        if !self.hasher.verify(password, hash)? {
            return Err(self.rejected(&email, "password mismatch").await);
        }

        let session = super::establish_session(
            self.store.as_ref(),
            &self.config,
            ctx,
            &mut user,
            user_agent,
            self.agent.as_ref(),
        )
        .await?;

        log::info!(
            target: "umbra_auth::actions",
            "msg=\"login success\" user_id={} session_id={}",
            user.id,
            session.id
        );

        events::dispatch(AuthEvent::LoginSuccess {
            user_id: user.id,
            session_id: session.id,
            at: Utc::now(),
        })
        .await;

        Ok(user)
    }

    /// Logs and dispatches the failure, then collapses every rejection into
    /// the one error the caller is allowed to see. The reason stays server
    /// side.
    async fn rejected(&self, email: &str, reason: &str) -> AuthError {
        log::info!(
            target: "umbra_auth::actions",
            "msg=\"login rejected\" reason=\"{reason}\""
        );

        events::dispatch(AuthEvent::LoginFailed {
            email: email.to_owned(),
            reason: reason.to_owned(),
            at: Utc::now(),
        })
        .await;

        AuthError::InvalidCredentials
    }
}
