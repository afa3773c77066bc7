//! Crypto primitives: secret wrappers, password hashing, token generation.

use aes::Aes256;
use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use password_hash::{PasswordHash, PasswordHasher as ArgonPasswordHasher, SaltString};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::AuthError;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

type Aes256Ctr = Ctr128BE<Aes256>;

/// Byte length of generated session tokens (256 bits before encoding).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// String wrapper whose `Debug` and `Display` output is always `[REDACTED]`.
///
/// Session tokens and one-time codes travel through user records, log
/// statements, and test assertions; wrapping them makes an accidental
/// `{:?}` harmless. Serde passes the raw value through so stored secrets
/// survive the round trip to the backing store.
///
/// ```rust
/// use umbra_auth::crypto::SecretString;
///
/// let token = SecretString::new("raw-session-token");
/// assert_eq!(format!("{token:?}"), "SecretString([REDACTED])");
/// assert_eq!(token.expose_secret(), "raw-session-token");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the wrapped value.
    ///
    /// Call sites are the audit surface for secret handling: encoding a
    /// cookie, comparing against a stored code, deriving a key.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Expose the actual value for serialization; stored session tokens
        // and codes must survive the round trip through the backing store.
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString(s))
    }
}

/// Hashing seam for stored credentials.
///
/// [`Argon2Hasher`] is the write path for every new password;
/// [`LegacyCtrHasher`] exists only to verify credentials imported from the
/// previous backend. Actions take the trait, so a deployment can swap in
/// either (or a rehash-on-login combinator) without touching the flows.
///
/// ```rust
/// use umbra_auth::crypto::{PasswordHasher, Argon2Hasher};
///
/// let hasher = Argon2Hasher::default();
/// let stored = hasher.hash("between-the-shelves").unwrap();
/// assert!(hasher.verify("between-the-shelves", &stored).unwrap());
/// assert!(!hasher.verify("between-the-stacks", &stored).unwrap());
/// ```
pub trait PasswordHasher: Send + Sync {
    /// Hashes a password for storage.
    ///
    /// # Errors
    ///
    /// [`AuthError::Server`] if hashing fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Checks a candidate password against a stored hash. A mismatch is
    /// `Ok(false)`, not an error.
    ///
    /// # Errors
    ///
    /// [`AuthError::Server`] if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id hasher with tunable cost parameters.
///
/// ```rust
/// use umbra_auth::crypto::Argon2Hasher;
///
/// let hasher = Argon2Hasher::default();      // 19 MiB, t=2, p=1
/// let hasher = Argon2Hasher::production();   // 64 MiB, t=3, p=4
/// let hasher = Argon2Hasher::new(46080, 1, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Hasher {
    /// The `argon2` crate's own defaults, fine for tests and small hosts.
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Hasher {
    /// Custom parameters: memory in KiB, passes over memory, lanes.
    #[must_use]
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Heavier parameters (64 MiB, t=3, p=4) for production traffic.
    #[must_use]
    pub fn production() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|err| AuthError::Server(format!("invalid argon2 params: {err}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|err| AuthError::Server(format!("password hashing failed: {err}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|err| AuthError::Server(format!("malformed password hash: {err}")))?;

        // Cost parameters come out of the PHC string, so hashes written
        // under older settings keep verifying.
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// AES-256-CTR password transform carried over from the previous backend.
///
/// Stored credentials from that system are the hex encoding of the password
/// encrypted under `SHA-256(secret)` with a zero IV. Verification re-encrypts
/// the candidate and compares ciphertexts in constant time, so existing
/// accounts keep working without a forced reset.
///
/// # Security
///
/// The transform is deterministic and reversible with the secret, which makes
/// it strictly weaker than a real password hash. Use [`Argon2Hasher`] for all
/// new writes and keep this one on the verify path only, e.g. behind a
/// rehash-on-login migration.
pub struct LegacyCtrHasher {
    key: [u8; 32],
}

impl LegacyCtrHasher {
    /// Derives the AES key from the application secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = Sha256::digest(secret.expose_secret().as_bytes());
        Self { key: key.into() }
    }

    fn transform(&self, input: &str) -> Vec<u8> {
        let iv = [0u8; 16];
        let mut buf = input.as_bytes().to_vec();
        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(&mut buf);
        buf
    }
}

impl fmt::Debug for LegacyCtrHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LegacyCtrHasher([REDACTED])")
    }
}

impl PasswordHasher for LegacyCtrHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(hex::encode(self.transform(password)))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let expected = hex::encode(self.transform(password));
        Ok(constant_time_eq(expected.as_bytes(), hash.as_bytes()))
    }
}

/// Generates a session token: 256 bits from the OS RNG, base64-encoded.
///
/// # Example
///
/// ```rust
/// use umbra_auth::crypto::session_token;
///
/// let token = session_token();
/// assert_eq!(token.len(), 44); // 32 bytes in padded base64
/// ```
pub fn session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Generates `n` random bytes from the OS RNG, hex-encoded.
///
/// Used for the random suffix of reset and verification codes.
pub fn random_hex(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
