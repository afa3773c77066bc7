use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Length bounds for acceptable passwords.
///
/// Bounds are the only hard requirement; composition rules (character
/// classes, blocklists) are left to the embedding application.
///
/// ```
/// use umbra_auth::validators::PasswordPolicy;
///
/// let policy = PasswordPolicy::default(); // 8..=128
/// assert!(policy.validate("turnstile-gate").is_ok());
///
/// let strict = PasswordPolicy::strict(); // 12..=128
/// assert!(strict.validate("short one").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    /// Same as [`PasswordPolicy::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the minimum to 12 characters for high-value deployments.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            min_length: 12,
            max_length: 128,
        }
    }

    /// Overrides the minimum length.
    #[must_use]
    pub fn min(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// Overrides the maximum length.
    #[must_use]
    pub fn max(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    /// Checks a candidate password against the bounds.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the password is empty or falls
    /// outside the configured lengths; the variant carries the violated
    /// bound for the client message.
    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::PasswordEmpty);
        }

        if password.len() < self.min_length {
            return Err(ValidationError::PasswordTooShort(self.min_length));
        }

        if password.len() > self.max_length {
            return Err(ValidationError::PasswordTooLong(self.max_length));
        }

        Ok(())
    }
}

/// Checks a password against the default bounds (8..=128).
///
/// For other bounds, build a [`PasswordPolicy`].
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    PasswordPolicy::default().validate(password)
}
