use std::sync::Arc;

use chrono::Utc;

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::events::{self, AuthEvent};
use crate::session::cookie;
use crate::store::{LogoutScope, UserStore};
use crate::AuthError;

/// Removes sessions for the signed-in user.
pub struct LogoutAction<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S: UserStore> LogoutAction<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }

    /// Removes the sessions named by `scope`.
    ///
    /// The cookie is cleared when `scope` is [`LogoutScope::All`] or names
    /// the session this request rode in on. Removing an id that no longer
    /// exists still succeeds; logout is idempotent.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] when `ctx` holds no resolved identity.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "logout", skip_all, err))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        scope: LogoutScope,
    ) -> Result<(), AuthError> {
        let user = ctx.require_user()?;
        let session = ctx.require_session()?;

        self.store.remove_sessions(user.id, scope).await?;

        let clears_current = match scope {
            LogoutScope::All => true,
            LogoutScope::Session(id) => id == session.id,
        };
        if clears_current {
            ctx.push_cookie(cookie::clear_cookie(&self.config));
        }

        log::info!(
            target: "umbra_auth::actions",
            "msg=\"logout\" user_id={} scope={scope:?}",
            user.id
        );

        events::dispatch(AuthEvent::LogoutSuccess {
            user_id: user.id,
            scope,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::store::{MemoryUserStore, NewUser, UserVariant};

    async fn signed_in_ctx(
        store: &MemoryUserStore,
        session_count: usize,
    ) -> (RequestContext, i64) {
        let user = store
            .create_user(NewUser {
                email: "kit@example.com".to_owned(),
                name: "Kit".to_owned(),
                variant: UserVariant::Native {
                    password_hash: "hash".to_owned(),
                },
            })
            .await
            .unwrap();

        let sessions: Vec<Session> = (1..=session_count as i64).map(Session::mock).collect();
        store
            .replace_sessions(user.id, sessions)
            .await
            .unwrap();

        let ctx = RequestContext::new();
        let user = store.snapshot(user.id).unwrap();
        let current = user.sessions[0].clone();
        let user_id = user.id;
        ctx.store_identity(user, current);
        (ctx, user_id)
    }

    fn action(store: Arc<MemoryUserStore>) -> LogoutAction<MemoryUserStore> {
        LogoutAction::new(store, Arc::new(AuthConfig::new()))
    }

    #[tokio::test]
    async fn test_logout_current_session_clears_cookie() {
        let store = Arc::new(MemoryUserStore::new());
        let (ctx, user_id) = signed_in_ctx(&store, 2).await;

        action(store.clone())
            .execute(&ctx, LogoutScope::Session(1))
            .await
            .unwrap();

        let remaining = store.snapshot(user_id).unwrap().sessions;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);

        let cookies = ctx.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].header().starts_with("sasid=;"));
        assert!(cookies[0].header().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_logout_other_session_keeps_cookie() {
        let store = Arc::new(MemoryUserStore::new());
        let (ctx, user_id) = signed_in_ctx(&store, 2).await;

        action(store.clone())
            .execute(&ctx, LogoutScope::Session(2))
            .await
            .unwrap();

        let remaining = store.snapshot(user_id).unwrap().sessions;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 1);
        assert!(ctx.take_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_logout_all_sessions() {
        let store = Arc::new(MemoryUserStore::new());
        let (ctx, user_id) = signed_in_ctx(&store, 3).await;

        action(store.clone())
            .execute(&ctx, LogoutScope::All)
            .await
            .unwrap();

        assert!(store.snapshot(user_id).unwrap().sessions.is_empty());
        assert_eq!(ctx.take_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_unknown_session_is_noop() {
        let store = Arc::new(MemoryUserStore::new());
        let (ctx, user_id) = signed_in_ctx(&store, 1).await;

        action(store.clone())
            .execute(&ctx, LogoutScope::Session(99))
            .await
            .unwrap();

        assert_eq!(store.snapshot(user_id).unwrap().sessions.len(), 1);
        assert!(ctx.take_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_logout_requires_identity() {
        let store = Arc::new(MemoryUserStore::new());
        let err = action(store)
            .execute(&RequestContext::new(), LogoutScope::All)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Unauthenticated);
    }
}
