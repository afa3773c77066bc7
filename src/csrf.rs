//! CSRF tokens derived from the session, plus the policy that decides
//! which operations demand one.
//!
//! Tokens are stateless: `{expiry_unix}|{digest}` where the digest binds
//! the expiry to the session token. Nothing is stored; any number of
//! tokens can be live at once, and rotating the session invalidates all
//! of them. Clients fetch a token from a query operation and replay it in
//! the `x-csrf-token` header on mutations.

use std::collections::HashSet;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::crypto::constant_time_eq;
use crate::session::resolver::SessionResolver;
use crate::store::UserStore;
use crate::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Request header clients send the token in.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Digest binding a CSRF token to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrfDigest {
    /// `md5(expiry + "|" + session_token)`, the wire format the previous
    /// backend shipped. Collision resistance does not matter here (the
    /// input is secret, not attacker-chosen), but prefer the MAC for new
    /// deployments.
    #[default]
    Md5,
    /// `HMAC-SHA256(key = session_token, message = expiry)`.
    HmacSha256,
}

fn compute_digest(mode: CsrfDigest, expiry: &str, session_token: &str) -> String {
    match mode {
        CsrfDigest::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(expiry.as_bytes());
            hasher.update(b"|");
            hasher.update(session_token.as_bytes());
            URL_SAFE_NO_PAD.encode(hasher.finalize())
        }
        CsrfDigest::HmacSha256 => {
            // SAFETY: HmacSha256::new_from_slice only fails if the key is
            // invalid, but HMAC-SHA256 accepts keys of any length, so this
            // cannot fail.
            #[allow(clippy::expect_used)]
            let mut mac = HmacSha256::new_from_slice(session_token.as_bytes())
                .expect("HMAC accepts keys of any size");
            mac.update(expiry.as_bytes());
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        }
    }
}

/// Issues and verifies session-bound CSRF tokens.
///
/// Both operations resolve the session through the shared
/// [`SessionResolver`], so a request that already resolved pays nothing
/// extra here.
pub struct CsrfService<S> {
    resolver: SessionResolver<S>,
    config: Arc<AuthConfig>,
}

impl<S: UserStore + 'static> CsrfService<S> {
    pub fn new(resolver: SessionResolver<S>, config: Arc<AuthConfig>) -> Self {
        Self { resolver, config }
    }

    /// Issues a token valid for the configured window.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] without a resolved session.
    pub async fn issue(&self, ctx: &RequestContext) -> Result<String, AuthError> {
        self.issue_with_expiry(ctx, Utc::now() + self.config.csrf.validity)
            .await
    }

    /// Issues a token with an explicit expiry instant.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "issue_csrf", skip_all, err)
    )]
    pub async fn issue_with_expiry(
        &self,
        ctx: &RequestContext,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.resolver.resolve(ctx).await?;
        let session = ctx.require_session()?;

        let expiry = expires_at.timestamp().to_string();
        let digest = compute_digest(
            self.config.csrf.digest,
            &expiry,
            session.token.expose_secret(),
        );
        Ok(format!("{expiry}|{digest}"))
    }

    /// Verifies the `x-csrf-token` header value for the current request.
    ///
    /// # Errors
    ///
    /// [`AuthError::CsrfInvalid`] for a missing header, a missing session,
    /// a malformed token, a past expiry, or a digest that does not match
    /// this session. The reason is logged, not surfaced.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "verify_csrf", skip_all, err)
    )]
    pub async fn verify(
        &self,
        ctx: &RequestContext,
        header: Option<&str>,
    ) -> Result<(), AuthError> {
        let Some(token) = header.filter(|t| !t.is_empty()) else {
            return self.reject(ctx, "missing header");
        };

        self.resolver.resolve(ctx).await?;
        let Some(session) = ctx.current_session() else {
            return self.reject(ctx, "no session");
        };

        let Some((expiry, provided)) = token.split_once('|') else {
            return self.reject(ctx, "malformed token");
        };
        let Ok(expiry_unix) = expiry.parse::<i64>() else {
            return self.reject(ctx, "malformed expiry");
        };
        if expiry_unix < Utc::now().timestamp() {
            return self.reject(ctx, "expired");
        }

        let expected = compute_digest(
            self.config.csrf.digest,
            expiry,
            session.token.expose_secret(),
        );
        if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            return self.reject(ctx, "digest mismatch");
        }

        Ok(())
    }

    fn reject(&self, ctx: &RequestContext, reason: &str) -> Result<(), AuthError> {
        log::debug!(
            target: "umbra_auth",
            "msg=\"csrf rejected\" request_id={} reason=\"{reason}\"",
            ctx.request_id()
        );
        Err(AuthError::CsrfInvalid)
    }
}

/// Operation class as the API schema sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// Decides which operations must present a CSRF token.
///
/// Mutations need one, queries never do, and named mutations can be
/// exempted — login and register run before the client could have fetched
/// a token.
///
/// # Example
///
/// ```rust
/// use umbra_auth::{CsrfPolicy, OperationKind};
///
/// let policy = CsrfPolicy::new().exempt("login").exempt("register");
///
/// assert!(policy.requires_token(OperationKind::Mutation, "deleteEntry"));
/// assert!(!policy.requires_token(OperationKind::Mutation, "login"));
/// assert!(!policy.requires_token(OperationKind::Query, "me"));
/// ```
#[derive(Debug, Clone)]
pub struct CsrfPolicy {
    enabled: bool,
    exempt: HashSet<String>,
}

impl CsrfPolicy {
    /// Protection on, no exemptions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            exempt: HashSet::new(),
        }
    }

    /// Protection off entirely, for tests and local tooling.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            exempt: HashSet::new(),
        }
    }

    /// Exempts one mutation by operation name.
    #[must_use]
    pub fn exempt(mut self, operation: impl Into<String>) -> Self {
        self.exempt.insert(operation.into());
        self
    }

    /// Whether this operation must present a valid token.
    pub fn requires_token(&self, kind: OperationKind, operation: &str) -> bool {
        self.enabled && kind == OperationKind::Mutation && !self.exempt.contains(operation)
    }
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self::new()
    }
}
