//! Sessions embedded in the user record.
//!
//! A session is a device-scoped login: numeric id unique within the user,
//! a 256-bit bearer token, parsed user-agent fields, and the `accessed_at`
//! stamp its validity hangs on. There is no separate session collection;
//! the list lives on the user and is rewritten as a whole.

pub mod agent;
pub mod cookie;
pub mod resolver;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, SecretString};

use agent::AgentParser;

/// One device-scoped login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique within the owning user, strictly increasing across that
    /// user's lifetime.
    pub id: i64,
    /// Bearer token the cookie carries. 256 bits, base64.
    pub token: SecretString,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    /// Refreshed on every resolved request; drives expiry.
    pub accessed_at: DateTime<Utc>,
}

impl Session {
    /// Whether this session is still inside the validity window.
    pub fn is_valid(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.accessed_at + max_age >= now
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Session {
    /// A session with a predictable token, for tests.
    pub fn mock(id: i64) -> Self {
        Session {
            id,
            token: SecretString::new(format!("mock-token-{id}")),
            browser: Some("Firefox".to_owned()),
            os: Some("Linux".to_owned()),
            device: Some("Computer".to_owned()),
            accessed_at: Utc::now(),
        }
    }
}

/// The id the next session of this user gets: max existing + 1.
///
/// Computed over the unpruned list, so ids are never reused even when every
/// older session has expired.
pub fn next_session_id(sessions: &[Session]) -> i64 {
    sessions.iter().map(|s| s.id).max().unwrap_or(0) + 1
}

/// Builds a new session from the request's user agent.
///
/// `existing` is the user's current, unpruned session list; it only feeds
/// the id computation and is not modified.
pub fn generate_session(
    existing: &[Session],
    user_agent: Option<&str>,
    parser: &dyn AgentParser,
    now: DateTime<Utc>,
) -> Session {
    let info = parser.parse(user_agent.unwrap_or_default());

    let device = if info.device_family != agent::OTHER {
        Some(info.device_family)
    } else if agent::DESKTOP_OS.contains(&info.os_family.as_str()) {
        Some("Computer".to_owned())
    } else {
        Some("Mobile".to_owned())
    };

    Session {
        id: next_session_id(existing),
        token: SecretString::new(crypto::session_token()),
        browser: known(info.family),
        os: known(info.os_family),
        device,
        accessed_at: now,
    }
}

fn known(family: String) -> Option<String> {
    (family != agent::OTHER).then_some(family)
}

/// Drops sessions whose `accessed_at` fell out of the validity window.
pub fn prune_expired(
    sessions: Vec<Session>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Vec<Session> {
    sessions
        .into_iter()
        .filter(|s| s.is_valid(max_age, now))
        .collect()
}

/// Finds the session carrying `token`, comparing in constant time.
pub fn find_by_token<'a>(sessions: &'a [Session], token: &str) -> Option<&'a Session> {
    sessions.iter().find(|s| {
        crypto::constant_time_eq(s.token.expose_secret().as_bytes(), token.as_bytes())
    })
}

#[cfg(test)]
mod tests {
    use super::agent::BuiltinAgentParser;
    use super::*;

    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    #[test]
    fn test_next_session_id_counts_from_max() {
        assert_eq!(next_session_id(&[]), 1);

        let sessions = vec![Session::mock(1), Session::mock(5), Session::mock(3)];
        assert_eq!(next_session_id(&sessions), 6);
    }

    #[test]
    fn test_generate_desktop_device() {
        let now = Utc::now();
        let session = generate_session(&[], Some(FIREFOX_LINUX), &BuiltinAgentParser, now);

        assert_eq!(session.id, 1);
        assert_eq!(session.browser.as_deref(), Some("Firefox"));
        assert_eq!(session.os.as_deref(), Some("Linux"));
        assert_eq!(session.device.as_deref(), Some("Computer"));
        assert_eq!(session.accessed_at, now);
        assert_eq!(session.token.expose_secret().len(), 44);
    }

    #[test]
    fn test_generate_named_device_wins_over_heuristic() {
        let session = generate_session(&[], Some(SAFARI_IPHONE), &BuiltinAgentParser, Utc::now());
        assert_eq!(session.device.as_deref(), Some("iPhone"));
        assert_eq!(session.os.as_deref(), Some("iOS"));
    }

    #[test]
    fn test_generate_without_user_agent_defaults_to_mobile() {
        let session = generate_session(&[], None, &BuiltinAgentParser, Utc::now());
        assert_eq!(session.browser, None);
        assert_eq!(session.os, None);
        assert_eq!(session.device.as_deref(), Some("Mobile"));
    }

    #[test]
    fn test_generate_ids_skip_pruned_slots() {
        let now = Utc::now();
        let mut old = Session::mock(7);
        old.accessed_at = now - Duration::days(30);

        // Id comes from the unpruned list even though the session is dead.
        let session = generate_session(&[old], Some(FIREFOX_LINUX), &BuiltinAgentParser, now);
        assert_eq!(session.id, 8);
    }

    #[test]
    fn test_prune_expired_keeps_window_boundary() {
        let now = Utc::now();
        let max_age = Duration::days(10);

        let mut fresh = Session::mock(1);
        fresh.accessed_at = now - Duration::days(9);
        let mut boundary = Session::mock(2);
        boundary.accessed_at = now - max_age;
        let mut stale = Session::mock(3);
        stale.accessed_at = now - Duration::days(11);

        let kept = prune_expired(vec![fresh, boundary, stale], max_age, now);
        let ids: Vec<i64> = kept.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_find_by_token() {
        let sessions = vec![Session::mock(1), Session::mock(2)];

        let found = find_by_token(&sessions, "mock-token-2").unwrap();
        assert_eq!(found.id, 2);

        assert!(find_by_token(&sessions, "mock-token-9").is_none());
        assert!(find_by_token(&sessions, "").is_none());
    }
}
