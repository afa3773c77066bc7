//! Cookie-to-identity resolution, run lazily once per request.

use std::sync::Arc;

use chrono::Utc;

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::store::{AuthUser, UserStore};
use crate::AuthError;

use super::cookie::{clear_cookie, decode_cookie};
use super::{find_by_token, prune_expired, Session};

/// A resolved identity: the user and the session that authenticated them.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: AuthUser,
    pub session: Session,
}

/// Resolves the session cookie on a [`RequestContext`] into an identity.
///
/// Resolution is memoized on the context: the first call does at most one
/// user read, every later call in the same request is answered from the
/// cache, including the "no valid session" answer. An anonymous or garbled
/// cookie is an `Ok(None)`, never an error; [`AuthError`] only surfaces
/// when the store itself fails.
pub struct SessionResolver<S> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> Clone for SessionResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: UserStore + 'static> SessionResolver<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }

    /// Resolves the request's identity, consulting the cache first.
    ///
    /// Side effects on a fresh resolution: expired sessions are pruned and
    /// written back, a dead cookie gets a clearing `Set-Cookie` queued, and
    /// a matched session has its `accessed_at` refreshed off the request
    /// path.
    ///
    /// # Errors
    ///
    /// Only store failures. Every cookie-shaped problem resolves to
    /// `Ok(None)`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "resolve_session", skip_all, err)
    )]
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Authenticated>, AuthError> {
        if ctx.is_resolved() {
            return Ok(ctx
                .current_user()
                .zip(ctx.current_session())
                .map(|(user, session)| Authenticated { user, session }));
        }

        // Whatever happens below is the answer for the rest of the request.
        ctx.mark_resolved();

        let Some(raw) = ctx.session_cookie() else {
            return Ok(None);
        };
        let Some(cookie) = decode_cookie(&raw) else {
            log::debug!(
                target: "umbra_auth::session",
                "msg=\"malformed session cookie\" request_id={}",
                ctx.request_id()
            );
            return Ok(None);
        };

        let Some(mut user) = self.store.find_user_by_id(cookie.user_id).await? else {
            log::debug!(
                target: "umbra_auth::session",
                "msg=\"session cookie for unknown user\" user_id={}",
                cookie.user_id
            );
            ctx.push_cookie(clear_cookie(&self.config));
            return Ok(None);
        };

        let now = Utc::now();
        let before = user.sessions.len();
        let sessions = prune_expired(user.sessions, self.config.cookie.max_age, now);
        if sessions.len() != before {
            log::debug!(
                target: "umbra_auth::session",
                "msg=\"pruned expired sessions\" user_id={} removed={}",
                user.id,
                before - sessions.len()
            );
            self.store.replace_sessions(user.id, sessions.clone()).await?;
        }
        user.sessions = sessions;

        let Some(session) = find_by_token(&user.sessions, &cookie.token).cloned() else {
            log::debug!(
                target: "umbra_auth::session",
                "msg=\"session token not found\" user_id={}",
                user.id
            );
            ctx.push_cookie(clear_cookie(&self.config));
            return Ok(None);
        };

        self.touch_detached(user.id, session.id);

        log::debug!(
            target: "umbra_auth::session",
            "msg=\"session resolved\" user_id={} session_id={}",
            user.id,
            session.id
        );
        ctx.store_identity(user.clone(), session.clone());
        Ok(Some(Authenticated { user, session }))
    }

    /// Refreshes `accessed_at` without blocking the request. Failures are
    /// logged and dropped; the stamp catches up on the next request.
    fn touch_detached(&self, user_id: i64, session_id: i64) {
        let store = Arc::clone(&self.store);
        let now = Utc::now();
        tokio::spawn(async move {
            if let Err(err) = store.touch_session(user_id, session_id, now).await {
                log::warn!(
                    target: "umbra_auth::session",
                    "msg=\"session touch failed\" user_id={user_id} session_id={session_id} error=\"{err}\""
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cookie::encode_cookie;
    use crate::store::{MemoryUserStore, NewUser, UserVariant};
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    fn resolver(store: &Arc<MemoryUserStore>) -> SessionResolver<MemoryUserStore> {
        SessionResolver::new(Arc::clone(store), Arc::new(AuthConfig::default()))
    }

    async fn seed_user_with_session(store: &MemoryUserStore) -> (AuthUser, Session) {
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
        let session = Session::mock(1);
        store
            .replace_sessions(user.id, vec![session.clone()])
            .await
            .unwrap();
        (user, session)
    }

    #[tokio::test]
    async fn test_no_cookie_resolves_anonymous_without_store_read() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let ctx = RequestContext::new();

        let resolved = resolver.resolve(&ctx).await.unwrap();
        assert!(resolved.is_none());
        assert!(ctx.is_resolved());
        assert_eq!(store.user_reads(), 0);
        assert!(ctx.take_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cookie_resolves_anonymous() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);

        for raw in ["garbage", "|", "abc|def", "1|"] {
            let ctx = RequestContext::new().with_session_cookie(raw);
            assert!(resolver.resolve(&ctx).await.unwrap().is_none());
        }
        assert_eq!(store.user_reads(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_clears_cookie() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let ctx = RequestContext::new().with_session_cookie("999|sometoken");

        let resolved = resolver.resolve(&ctx).await.unwrap();
        assert!(resolved.is_none());

        let cookies = ctx.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].header().starts_with("sasid=;"));
    }

    #[tokio::test]
    async fn test_valid_cookie_resolves_and_caches() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let (user, session) = seed_user_with_session(&store).await;

        let raw = encode_cookie(user.id, session.token.expose_secret());
        let ctx = RequestContext::new().with_session_cookie(raw);

        let resolved = resolver.resolve(&ctx).await.unwrap().unwrap();
        assert_eq!(resolved.user.id, user.id);
        assert_eq!(resolved.session.id, session.id);
        assert_eq!(store.user_reads(), 1);

        // Second resolution is answered from the context cache.
        let resolved = resolver.resolve(&ctx).await.unwrap().unwrap();
        assert_eq!(resolved.user.id, user.id);
        assert_eq!(store.user_reads(), 1);

        // A healthy session queues no cookie changes.
        assert!(ctx.take_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_token_clears_cookie() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let (user, _) = seed_user_with_session(&store).await;

        let ctx = RequestContext::new().with_session_cookie(encode_cookie(user.id, "wrong"));
        assert!(resolver.resolve(&ctx).await.unwrap().is_none());
        assert_eq!(ctx.take_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_pruned_and_written_back() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let (user, session) = seed_user_with_session(&store).await;

        let mut stale = session.clone();
        stale.accessed_at = Utc::now() - Duration::days(11);
        store
            .replace_sessions(user.id, vec![stale])
            .await
            .unwrap();
        let writes_before = store.session_writes();

        let raw = encode_cookie(user.id, session.token.expose_secret());
        let ctx = RequestContext::new().with_session_cookie(raw);

        assert!(resolver.resolve(&ctx).await.unwrap().is_none());
        assert_eq!(store.session_writes(), writes_before + 1);
        assert!(store.snapshot(user.id).unwrap().sessions.is_empty());
        assert_eq!(ctx.take_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_resolution_touches_accessed_at_in_background() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let (user, session) = seed_user_with_session(&store).await;

        let old_stamp = session.accessed_at;
        let raw = encode_cookie(user.id, session.token.expose_secret());
        let ctx = RequestContext::new().with_session_cookie(raw);
        resolver.resolve(&ctx).await.unwrap().unwrap();

        // The touch runs on a detached task; give it a moment.
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert_eq!(store.touches(), 1);

        let stored = store.snapshot(user.id).unwrap();
        assert!(stored.sessions[0].accessed_at >= old_stamp);
    }

    #[tokio::test]
    async fn test_resolved_unauthenticated_is_cached_too() {
        let store = Arc::new(MemoryUserStore::new());
        let resolver = resolver(&store);
        let ctx = RequestContext::new().with_session_cookie("999|sometoken");

        assert!(resolver.resolve(&ctx).await.unwrap().is_none());
        assert_eq!(store.user_reads(), 1);

        assert!(resolver.resolve(&ctx).await.unwrap().is_none());
        assert_eq!(store.user_reads(), 1);
    }
}
