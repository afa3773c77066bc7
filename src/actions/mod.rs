//! Account and session flows.
//!
//! Each flow is a struct generic over the backing [`UserStore`], created
//! with `new()` and run with `execute()`. Actions queue cookies and cache
//! the resolved identity on the [`RequestContext`] they are handed;
//! transport glue owns writing those out. Mail delivery and session touch
//! updates run on detached tasks and never block the request path.

pub mod forgot_password;
pub mod login;
pub mod logout;
pub mod register;
pub mod reset_password;
pub mod send_verification;
pub mod verify_email;

pub use forgot_password::ForgotPasswordAction;
pub use login::LoginAction;
pub use logout::LogoutAction;
pub use register::{RegisterAction, RegisterInput};
pub use reset_password::ResetPasswordAction;
pub use send_verification::SendVerificationAction;
pub use verify_email::VerifyEmailAction;

use chrono::Utc;

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::session::agent::AgentParser;
use crate::session::{self, cookie, Session};
use crate::store::{AuthUser, UserStore};
use crate::AuthError;

/// Appends a fresh session to `user`, persists the pruned list, queues the
/// session cookie, and caches the identity on `ctx`.
///
/// The append is read-prune-write over the whole list, so two concurrent
/// logins can lose one of the two sessions; the losing device just signs in
/// again.
pub(crate) async fn establish_session<S: UserStore + ?Sized>(
    store: &S,
    config: &AuthConfig,
    ctx: &RequestContext,
    user: &mut AuthUser,
    user_agent: Option<&str>,
    parser: &dyn AgentParser,
) -> Result<Session, AuthError> {
    let now = Utc::now();

    // Id comes from the unpruned list so a reused slot can never alias a
    // cookie that is still in circulation.
    let session = session::generate_session(&user.sessions, user_agent, parser, now);

    let mut sessions = session::prune_expired(
        std::mem::take(&mut user.sessions),
        config.cookie.max_age,
        now,
    );
    sessions.push(session.clone());

    store.replace_sessions(user.id, sessions.clone()).await?;
    user.sessions = sessions;

    let value = cookie::encode_cookie(user.id, session.token.expose_secret());
    ctx.push_cookie(cookie::set_cookie(config, &value));
    ctx.store_identity(user.clone(), session.clone());

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::agent::BuiltinAgentParser;
    use crate::store::{MemoryUserStore, NewUser, UserVariant};
    use chrono::Duration;
    use std::sync::Arc;

    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0";

    async fn seeded_store() -> (Arc<MemoryUserStore>, AuthUser) {
        let store = Arc::new(MemoryUserStore::new());
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
        (store, user)
    }

    #[tokio::test]
    async fn test_establish_session_persists_and_queues_cookie() {
        let (store, mut user) = seeded_store().await;
        let config = AuthConfig::new();
        let ctx = RequestContext::new();

        let session = establish_session(
            store.as_ref(),
            &config,
            &ctx,
            &mut user,
            Some(FIREFOX_LINUX),
            &BuiltinAgentParser,
        )
        .await
        .unwrap();

        assert_eq!(session.id, 1);
        assert_eq!(user.sessions.len(), 1);

        let stored = store.snapshot(user.id).unwrap();
        assert_eq!(stored.sessions.len(), 1);
        assert_eq!(stored.sessions[0].id, 1);

        let cookies = ctx.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].header().starts_with("sasid=1|"));
        assert!(cookies[0].header().contains("HttpOnly"));

        assert_eq!(ctx.require_user().unwrap().id, user.id);
        assert_eq!(ctx.require_session().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_establish_session_prunes_but_keeps_id_sequence() {
        let (store, mut user) = seeded_store().await;
        let config = AuthConfig::new();

        let mut stale = Session::mock(3);
        stale.accessed_at = Utc::now() - Duration::days(30);
        store
            .replace_sessions(user.id, vec![stale.clone()])
            .await
            .unwrap();
        user.sessions = vec![stale];

        let ctx = RequestContext::new();
        let session = establish_session(
            store.as_ref(),
            &config,
            &ctx,
            &mut user,
            None,
            &BuiltinAgentParser,
        )
        .await
        .unwrap();

        // The stale session is gone but its id slot stays burned.
        assert_eq!(session.id, 4);
        assert_eq!(user.sessions.len(), 1);
        assert_eq!(store.snapshot(user.id).unwrap().sessions.len(), 1);
    }
}
