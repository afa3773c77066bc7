//! Configuration for the session and identity core.
//!
//! Every tunable that used to be scattered across the actions lives here:
//! cookie attributes, the session/CSRF validity windows, reset-code lifetime,
//! and the base URL emailed links point at.
//!
//! # Example
//!
//! ```rust
//! use umbra_auth::config::AuthConfig;
//! use chrono::Duration;
//!
//! // Development defaults: `sasid` cookie, 10-day sessions, no Domain/Secure.
//! let config = AuthConfig::default();
//!
//! // Production: pins the cookie Domain, marks it Secure, and points
//! // emailed links at the public origin.
//! let config = AuthConfig::production("shadow-archive.example", "https://shadow-archive.example");
//!
//! // Or customize individual knobs.
//! let mut config = AuthConfig::default();
//! config.cookie.max_age = Duration::days(30);
//! config.csrf.validity = Duration::minutes(30);
//! ```

use chrono::Duration;

use crate::csrf::CsrfDigest;

/// Deployment environment. Controls the cookie attributes that only make
/// sense behind TLS on the real origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration consumed by the resolver, actions, and the
/// CSRF service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Deployment environment.
    pub environment: Environment,

    /// Session cookie attributes and the session validity window.
    pub cookie: CookieConfig,

    /// CSRF token settings.
    pub csrf: CsrfConfig,

    /// Reset/verification code settings.
    pub codes: CodeConfig,

    /// Outbound mail settings.
    pub mail: MailConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            cookie: CookieConfig::default(),
            csrf: CsrfConfig::default(),
            codes: CodeConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Creates a configuration with development defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Production configuration: Secure cookie pinned to `domain`, emailed
    /// links built on `base_url`.
    #[must_use]
    pub fn production(domain: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            environment: Environment::Production,
            cookie: CookieConfig {
                domain: Some(domain.into()),
                ..CookieConfig::default()
            },
            csrf: CsrfConfig::default(),
            codes: CodeConfig::default(),
            mail: MailConfig {
                base_url: base_url.into(),
            },
        }
    }

    /// Validates invariants that only bite at runtime otherwise.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first offending field: an empty cookie
    /// name, a non-positive max-age, a production config without a cookie
    /// domain, or an empty mail base URL.
    pub fn validate(&self) -> Result<(), String> {
        if self.cookie.name.is_empty() {
            return Err("cookie.name must not be empty".to_owned());
        }
        if self.cookie.max_age <= Duration::zero() {
            return Err("cookie.max_age must be positive".to_owned());
        }
        if self.environment.is_production() && self.cookie.domain.is_none() {
            return Err("cookie.domain is required in production".to_owned());
        }
        if self.mail.base_url.is_empty() {
            return Err("mail.base_url must not be empty".to_owned());
        }
        Ok(())
    }
}

/// Session cookie attributes.
///
/// `max_age` doubles as the session validity window: a session whose
/// `accessed_at` falls outside it is expired and gets pruned, and the
/// cookie the browser holds dies at the same horizon.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name.
    ///
    /// Default: `sasid`
    pub name: String,

    /// Cookie Max-Age and session validity window.
    ///
    /// Default: 10 days
    pub max_age: Duration,

    /// Cookie Domain attribute, emitted in production only.
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "sasid".to_owned(),
            max_age: Duration::days(10),
            domain: None,
        }
    }
}

/// CSRF token settings.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// How long an issued CSRF token remains valid.
    ///
    /// Default: 1 hour
    pub validity: Duration,

    /// Digest used to bind the token to the session.
    ///
    /// Default: [`CsrfDigest::Md5`], the historical wire format. Switch to
    /// [`CsrfDigest::HmacSha256`] when all clients re-fetch tokens on 403.
    pub digest: CsrfDigest,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            validity: Duration::hours(1),
            digest: CsrfDigest::default(),
        }
    }
}

/// Reset/verification code settings.
#[derive(Debug, Clone)]
pub struct CodeConfig {
    /// How long password-reset codes remain valid.
    ///
    /// Default: 1 day. Verification codes carry no expiry.
    pub reset_validity: Duration,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            reset_validity: Duration::days(1),
        }
    }
}

/// Outbound mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Origin emailed links are built on, without a trailing slash.
    ///
    /// Default: `http://localhost:3000`
    pub base_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_owned(),
        }
    }
}
