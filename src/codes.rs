//! Password-reset and email-verification code envelopes.
//!
//! Codes are self-describing strings carried in emailed links:
//!
//! * reset: `{base64(email)}|{expiry_unix}.{hex16}`
//! * verification: `{base64(email)}|{hex8}` (no expiry)
//!
//! The email half routes the code back to an account without a table scan;
//! the random suffix is the actual secret, checked by exact match against
//! the stored copy. Decoding is total: anything malformed is `None`, and
//! the caller maps that to [`InvalidCode`](crate::AuthError::InvalidCode).

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};

use crate::crypto::random_hex;

/// Byte length of the random suffix in reset codes.
const RESET_SUFFIX_BYTES: usize = 16;
/// Byte length of the random suffix in verification codes.
const VERIFICATION_SUFFIX_BYTES: usize = 8;

/// Issues a password-reset code expiring `validity` from `now`.
pub fn issue_reset_code(email: &str, now: DateTime<Utc>, validity: Duration) -> String {
    let expiry = (now + validity).timestamp();
    format!(
        "{}|{expiry}.{}",
        STANDARD.encode(email),
        random_hex(RESET_SUFFIX_BYTES)
    )
}

/// Issues an email-verification code. Verification links do not time out.
pub fn issue_verification_code(email: &str) -> String {
    format!(
        "{}|{}",
        STANDARD.encode(email),
        random_hex(VERIFICATION_SUFFIX_BYTES)
    )
}

/// The decoded routing half of a code. The secret half is never interpreted;
/// callers compare the full original string against the stored copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub email: String,
    /// Present for reset codes, absent for verification codes.
    pub expires_at: Option<DateTime<Utc>>,
}

impl DecodedCode {
    /// True when the code carries an expiry that has passed.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at < now)
    }
}

/// Decodes either code shape. Returns `None` for malformed input: missing
/// separator, undecodable email, non-numeric or out-of-range expiry, or an
/// empty random suffix.
pub fn decode_code(code: &str) -> Option<DecodedCode> {
    // '|' is outside every base64 alphabet, so the first one always splits
    // the email from the rest.
    let (email_part, rest) = code.split_once('|')?;
    let email = String::from_utf8(decode_base64_any(email_part)?).ok()?;

    let expires_at = match rest.split_once('.') {
        Some((expiry, suffix)) => {
            if suffix.is_empty() {
                return None;
            }
            let unix = expiry.parse::<i64>().ok()?;
            Some(DateTime::from_timestamp(unix, 0)?)
        }
        None => {
            if rest.is_empty() {
                return None;
            }
            None
        }
    };

    Some(DecodedCode { email, expires_at })
}

/// Accepts standard or URL-safe base64, with or without padding. Clients
/// re-encode links often enough that strictness here only costs support
/// tickets.
fn decode_base64_any(input: &str) -> Option<Vec<u8>> {
    STANDARD
        .decode(input)
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .or_else(|_| URL_SAFE.decode(input))
        .or_else(|_| URL_SAFE_NO_PAD.decode(input))
        .ok()
}
