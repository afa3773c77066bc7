//! Session cookie codec and `Set-Cookie` header construction.
//!
//! The cookie value is `{user_id}|{token}`: the id makes the user lookup a
//! primary-key read, the token proves possession. Decoding is total; any
//! malformed value is treated as an anonymous request, never an error.

use crate::config::AuthConfig;

/// Decoded `{user_id}|{token}` cookie value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub user_id: i64,
    pub token: String,
}

/// Encodes a session reference into the cookie value format.
///
/// # Example
///
/// ```rust
/// use umbra_auth::session::cookie::{decode_cookie, encode_cookie};
///
/// let value = encode_cookie(42, "sometoken");
/// assert_eq!(value, "42|sometoken");
///
/// let decoded = decode_cookie(&value).unwrap();
/// assert_eq!(decoded.user_id, 42);
/// assert_eq!(decoded.token, "sometoken");
/// ```
pub fn encode_cookie(user_id: i64, token: &str) -> String {
    format!("{user_id}|{token}")
}

/// Decodes a cookie value, returning `None` for anything malformed: a
/// missing separator, an empty token, or a user id that does not parse
/// to a positive integer.
pub fn decode_cookie(value: &str) -> Option<SessionCookie> {
    let (id, token) = value.split_once('|')?;
    let user_id = id.parse::<i64>().ok()?;
    // ids start at 1
    if user_id < 1 || token.is_empty() {
        return None;
    }
    Some(SessionCookie {
        user_id,
        token: token.to_owned(),
    })
}

/// A rendered `Set-Cookie` header value queued on the request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    header: String,
}

impl SetCookie {
    /// Wraps an already-rendered header value.
    #[must_use]
    pub fn raw(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    /// The full header value to emit after `Set-Cookie: `.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }
}

/// Builds the session `Set-Cookie` header for `value`.
///
/// Always `HttpOnly` with `Path=/`; `Secure` and `Domain` are added in
/// production only so local HTTP development keeps working. No `SameSite`
/// attribute: requests from sibling subdomains must keep carrying the
/// cookie, and the CSRF token covers cross-site writes.
pub fn set_cookie(config: &AuthConfig, value: &str) -> SetCookie {
    build(config, value, config.cookie.max_age.num_seconds())
}

/// Builds the expired `Set-Cookie` header that makes browsers drop the
/// session cookie. Attributes mirror [`set_cookie`] so the browser matches
/// the stored cookie.
pub fn clear_cookie(config: &AuthConfig) -> SetCookie {
    build(config, "", 0)
}

fn build(config: &AuthConfig, value: &str, max_age_secs: i64) -> SetCookie {
    let name = &config.cookie.name;
    let mut header = format!("{name}={value}; Path=/; HttpOnly; Max-Age={max_age_secs}");

    if config.environment.is_production() {
        header.push_str("; Secure");
        if let Some(domain) = &config.cookie.domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
    }

    SetCookie { header }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_roundtrip() {
        let value = encode_cookie(7, "abc123token");
        assert_eq!(
            decode_cookie(&value),
            Some(SessionCookie {
                user_id: 7,
                token: "abc123token".to_owned()
            })
        );
    }

    #[test]
    fn test_token_may_contain_separator_charset() {
        // base64 tokens can contain '+', '/', '='; only the first '|' splits.
        let decoded = decode_cookie("3|abc+/=def").unwrap();
        assert_eq!(decoded.token, "abc+/=def");
    }

    #[test]
    fn test_decode_rejects_malformed_values() {
        assert_eq!(decode_cookie(""), None);
        assert_eq!(decode_cookie("noseparator"), None);
        assert_eq!(decode_cookie("|token"), None);
        assert_eq!(decode_cookie("42|"), None);
        assert_eq!(decode_cookie("abc|token"), None);
        assert_eq!(decode_cookie("12.5|token"), None);
        assert_eq!(decode_cookie("-3|token"), None);
        assert_eq!(decode_cookie("0|token"), None);
    }

    #[test]
    fn test_development_cookie_attributes() {
        let config = AuthConfig::default();
        let cookie = set_cookie(&config, "1|token");

        assert_eq!(
            cookie.header(),
            "sasid=1|token; Path=/; HttpOnly; Max-Age=864000"
        );
        assert!(!cookie.header().contains("SameSite"));
    }

    #[test]
    fn test_production_cookie_attributes() {
        let config = AuthConfig::production("shadow-archive.example", "https://shadow-archive.example");
        let cookie = set_cookie(&config, "1|token");

        assert_eq!(
            cookie.header(),
            "sasid=1|token; Path=/; HttpOnly; Max-Age=864000; Secure; Domain=shadow-archive.example"
        );
    }

    #[test]
    fn test_clear_cookie_matches_set_attributes() {
        let config = AuthConfig::production("shadow-archive.example", "https://shadow-archive.example");
        let cookie = clear_cookie(&config);

        assert_eq!(
            cookie.header(),
            "sasid=; Path=/; HttpOnly; Max-Age=0; Secure; Domain=shadow-archive.example"
        );
    }

    #[test]
    fn test_production_without_domain_still_renders() {
        let mut config = AuthConfig::default();
        config.environment = Environment::Production;

        let cookie = set_cookie(&config, "1|token");
        assert!(cookie.header().ends_with("; Secure"));
    }
}
