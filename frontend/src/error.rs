use thiserror::Error;

use crate::directory::UserId;

/// Failure against the browser key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read `{key}`: {reason}")]
    Read { key: String, reason: String },
    #[error("failed to write `{key}`: {reason}")]
    Write { key: String, reason: String },
    #[error("failed to serialize `{key}`: {reason}")]
    Serialize { key: String, reason: String },
    #[error("failed to deserialize `{key}`: {reason}")]
    Deserialize { key: String, reason: String },
}

impl StorageError {
    pub fn read(key: &str, reason: impl Into<String>) -> Self {
        Self::Read {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn write(key: &str, reason: impl Into<String>) -> Self {
        Self::Write {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("user {0} is inactive")]
    Inactive(UserId),
    #[error("user {0} already exists")]
    Conflict(String),
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Form-level input problems, shown inline next to the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    MissingName,
    #[error("Please enter your email address")]
    MissingEmail,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter your password")]
    MissingPassword,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please agree to the terms and conditions")]
    TermsNotAccepted,
    #[error("Please select your role")]
    MissingRole,
    #[error("Unknown role `{0}`")]
    UnknownRole(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
