//! Per-request context shared by resolvers, actions, and transport glue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use uuid::Uuid;

use crate::session::cookie::SetCookie;
use crate::session::Session;
use crate::store::AuthUser;
use crate::AuthError;

/// Identity and scratch state for a single request.
///
/// The context is created by transport glue at the top of a request, seeded
/// with the raw session cookie, and threaded through every resolver. Clones
/// share state, so a cookie queued deep inside an action is visible to the
/// response writer at the end.
///
/// All accessors take `&self`; interior mutability keeps call sites free of
/// lock ceremony. Locks are never held across `.await`.
///
/// # Example
///
/// ```rust
/// use umbra_auth::RequestContext;
/// use serde_json::json;
///
/// let ctx = RequestContext::new().with_session_cookie("12|sometoken");
/// assert_eq!(ctx.session_cookie().as_deref(), Some("12|sometoken"));
///
/// ctx.insert_value("locale", json!("en"));
/// assert_eq!(ctx.get_value("locale"), Some(json!("en")));
/// ```
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: Uuid,
    state: Mutex<ContextState>,
}

#[derive(Default)]
struct ContextState {
    session_cookie: Option<String>,
    user: Option<AuthUser>,
    session: Option<Session>,
    resolved: bool,
    cookies: Vec<SetCookie>,
    bag: HashMap<String, Value>,
}

impl RequestContext {
    /// Creates an empty context with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4(),
                state: Mutex::new(ContextState::default()),
            }),
        }
    }

    /// Seeds the raw session cookie value taken from the request headers.
    #[must_use]
    pub fn with_session_cookie(self, value: impl Into<String>) -> Self {
        self.state().session_cookie = Some(value.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        // Every write under this lock is a single assignment, so state stays
        // consistent even if a panicking holder poisoned it.
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unique id for this request, for log correlation.
    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    /// The raw session cookie value, if the request carried one.
    pub fn session_cookie(&self) -> Option<String> {
        self.state().session_cookie.clone()
    }

    /// The authenticated user, if resolution found one.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.state().user.clone()
    }

    /// The matched session, if resolution found one.
    pub fn current_session(&self) -> Option<Session> {
        self.state().session.clone()
    }

    /// The authenticated user, or [`AuthError::Unauthenticated`].
    pub fn require_user(&self) -> Result<AuthUser, AuthError> {
        self.current_user().ok_or(AuthError::Unauthenticated)
    }

    /// The matched session, or [`AuthError::Unauthenticated`].
    pub fn require_session(&self) -> Result<Session, AuthError> {
        self.current_session().ok_or(AuthError::Unauthenticated)
    }

    /// The authenticated user if their email is verified.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] without a user, [`AuthError::Unverified`]
    /// with an unverified one.
    pub fn require_verified_user(&self) -> Result<AuthUser, AuthError> {
        let user = self.require_user()?;
        if !user.is_verified() {
            return Err(AuthError::Unverified);
        }
        Ok(user)
    }

    /// Whether session resolution already ran for this request.
    pub fn is_resolved(&self) -> bool {
        self.state().resolved
    }

    /// Marks resolution as done without storing an identity. Later lookups
    /// short-circuit to unauthenticated instead of hitting the store again.
    pub fn mark_resolved(&self) {
        self.state().resolved = true;
    }

    /// Caches the resolved identity and marks resolution as done.
    pub fn store_identity(&self, user: AuthUser, session: Session) {
        let mut state = self.state();
        state.user = Some(user);
        state.session = Some(session);
        state.resolved = true;
    }

    /// Queues a `Set-Cookie` header for the response.
    pub fn push_cookie(&self, cookie: SetCookie) {
        self.state().cookies.push(cookie);
    }

    /// Drains the queued cookies, in the order they were pushed. Transport
    /// glue calls this exactly once while writing the response.
    pub fn take_cookies(&self) -> Vec<SetCookie> {
        std::mem::take(&mut self.state().cookies)
    }

    /// Stores an arbitrary value in the request bag.
    pub fn insert_value(&self, key: impl Into<String>, value: Value) {
        self.state().bag.insert(key.into(), value);
    }

    /// Reads a value from the request bag.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.state().bag.get(key).cloned()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("RequestContext")
            .field("request_id", &self.inner.request_id)
            .field("resolved", &state.resolved)
            .field("user_id", &state.user.as_ref().map(|u| u.id))
            .field("session_id", &state.session.as_ref().map(|s| s.id))
            .field("queued_cookies", &state.cookies.len())
            .finish()
    }
}

/// Strips null-valued fields from a JSON body, recursively.
///
/// Clients of the previous backend send `null` for "leave unchanged", so
/// request decoding drops those members before deserialization instead of
/// teaching every input type the difference between absent and null.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use umbra_auth::context::scrub_nulls;
///
/// let mut body = json!({"name": "Kit", "avatar": null, "prefs": {"theme": null}});
/// scrub_nulls(&mut body);
/// assert_eq!(body, json!({"name": "Kit", "prefs": {}}));
/// ```
pub fn scrub_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                scrub_nulls(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                scrub_nulls(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_context_is_unresolved_and_anonymous() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_resolved());
        assert!(ctx.session_cookie().is_none());
        assert!(ctx.current_user().is_none());
        assert_eq!(ctx.require_user().unwrap_err(), AuthError::Unauthenticated);
        assert_eq!(
            ctx.require_session().unwrap_err(),
            AuthError::Unauthenticated
        );
    }

    #[test]
    fn test_store_identity_marks_resolved() {
        let ctx = RequestContext::new();
        let user = AuthUser::mock("kit@example.com");
        let session = Session::mock(1);

        ctx.store_identity(user.clone(), session.clone());

        assert!(ctx.is_resolved());
        assert_eq!(ctx.require_user().unwrap().id, user.id);
        assert_eq!(ctx.require_session().unwrap().id, session.id);
    }

    #[test]
    fn test_require_verified_user() {
        let ctx = RequestContext::new();
        let mut user = AuthUser::mock("kit@example.com");
        let session = Session::mock(1);

        ctx.store_identity(user.clone(), session.clone());
        assert_eq!(
            ctx.require_verified_user().unwrap_err(),
            AuthError::Unverified
        );

        user.email_verified_at = Some(chrono::Utc::now());
        ctx.store_identity(user, session);
        assert!(ctx.require_verified_user().is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();

        clone.insert_value("k", json!(42));
        assert_eq!(ctx.get_value("k"), Some(json!(42)));
        assert_eq!(ctx.request_id(), clone.request_id());
    }

    #[test]
    fn test_take_cookies_drains_in_order() {
        let ctx = RequestContext::new();
        ctx.push_cookie(SetCookie::raw("a=1"));
        ctx.push_cookie(SetCookie::raw("b=2"));

        let cookies = ctx.take_cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].header(), "a=1");
        assert_eq!(cookies[1].header(), "b=2");

        assert!(ctx.take_cookies().is_empty());
    }

    #[test]
    fn test_scrub_nulls_top_level() {
        let mut body = json!({"a": 1, "b": null, "c": "x"});
        scrub_nulls(&mut body);
        assert_eq!(body, json!({"a": 1, "c": "x"}));
    }

    #[test]
    fn test_scrub_nulls_nested_and_arrays() {
        let mut body = json!({
            "outer": {"keep": true, "drop": null},
            "items": [{"x": null, "y": 2}],
            "scalar": 7
        });
        scrub_nulls(&mut body);
        assert_eq!(
            body,
            json!({"outer": {"keep": true}, "items": [{"y": 2}], "scalar": 7})
        );
    }

    #[test]
    fn test_scrub_nulls_non_object_is_untouched() {
        let mut body = json!("plain");
        scrub_nulls(&mut body);
        assert_eq!(body, json!("plain"));
    }
}
