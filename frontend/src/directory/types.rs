//! Directory records shared by the session layer and the pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Opaque user identifier. Demo accounts use fixed ids, sign-ups get a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new random ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Doctor, Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::User => "Patient",
            Role::Admin => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ValidationError::MissingRole),
            "doctor" => Ok(Role::Doctor),
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    /// Extra profile fields supplied at login, kept so they survive a reload.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl UserRecord {
    pub fn new(
        id: impl Into<UserId>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            status: UserStatus::Active,
            last_login: None,
            last_activity: None,
            profile: Map::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(at) = patch.last_login {
            self.last_login = Some(at);
        }
        if let Some(at) = patch.last_activity {
            self.last_activity = Some(at);
        }
    }
}

/// Partial update sent to the directory. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub status: Option<UserStatus>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl UserPatch {
    pub fn activity(at: DateTime<Utc>) -> Self {
        Self {
            last_activity: Some(at),
            ..Self::default()
        }
    }

    pub fn login(at: DateTime<Utc>) -> Self {
        Self {
            last_login: Some(at),
            last_activity: Some(at),
            ..Self::default()
        }
    }
}
