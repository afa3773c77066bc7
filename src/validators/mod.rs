//! Input validation for registration and credential updates.
//!
//! Validation always runs before any store write, so a failing input never
//! leaves half-applied state behind.

pub mod email;
pub mod name;
pub mod password;

pub use email::{normalize_email, validate_email};
pub use name::validate_name;
pub use password::{validate_password, PasswordPolicy};

use serde::{Deserialize, Serialize};

/// Field-level validation failures.
///
/// Each variant maps to exactly one input field via [`ValidationError::field`],
/// which is what the client error shape reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    EmailEmpty,
    EmailTooLong,
    EmailInvalidFormat,
    /// Registration with an email that already has an account.
    EmailTaken,
    /// Verification mail requested for an already-verified account.
    EmailAlreadyVerified,
    PasswordEmpty,
    PasswordTooShort(usize),
    PasswordTooLong(usize),
    NameEmpty,
    NameTooLong,
}

impl ValidationError {
    /// The input field this error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmailEmpty
            | Self::EmailTooLong
            | Self::EmailInvalidFormat
            | Self::EmailTaken
            | Self::EmailAlreadyVerified => "email",
            Self::PasswordEmpty | Self::PasswordTooShort(_) | Self::PasswordTooLong(_) => {
                "password"
            }
            Self::NameEmpty | Self::NameTooLong => "name",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailEmpty => write!(f, "Email cannot be empty"),
            Self::EmailTooLong => write!(f, "Email is too long (max 254 characters)"),
            Self::EmailInvalidFormat => write!(f, "Invalid email format"),
            Self::EmailTaken => write!(f, "An account with this email already exists"),
            Self::EmailAlreadyVerified => write!(f, "Email address is already verified"),
            Self::PasswordEmpty => write!(f, "Password cannot be empty"),
            Self::PasswordTooShort(min) => {
                write!(f, "Password must be at least {min} characters")
            }
            Self::PasswordTooLong(max) => {
                write!(f, "Password is too long (max {max} characters)")
            }
            Self::NameEmpty => write!(f, "Name cannot be empty"),
            Self::NameTooLong => write!(f, "Name is too long (max 100 characters)"),
        }
    }
}

impl std::error::Error for ValidationError {}
