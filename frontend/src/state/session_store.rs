//! Persistence of the signed-in user and the session envelope.
//!
//! Two JSON entries live in the key-value store: the user record under
//! [`USER_KEY`] and the [`SessionEnvelope`] under [`SESSION_KEY`]. Reads fail
//! open: anything missing or unreadable is reported as "no session".

use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{directory::UserRecord, error::StorageError, utils::storage::KeyValueStore};

pub const USER_KEY: &str = "retinal_ai_user";
pub const SESSION_KEY: &str = "retinal_ai_session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub device_info: DeviceInfo,
}

impl SessionEnvelope {
    /// Envelope for a login at `now`; `expires_at` is `now + ttl`, saturating
    /// at the latest representable instant.
    pub fn issue(now: DateTime<Utc>, ttl: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            login_time: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            device_info: DeviceInfo {
                user_agent: user_agent.into(),
                timestamp: now,
            },
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Rc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Replaces both entries. Nothing is written if either value fails to
    /// serialize. The previous envelope is dropped before the new user is
    /// written, and a failed write clears both keys, so a reader never pairs
    /// one session's user with another session's envelope.
    pub fn save(&self, user: &UserRecord, envelope: &SessionEnvelope) -> Result<(), StorageError> {
        let user_json = encode(USER_KEY, user)?;
        let envelope_json = encode(SESSION_KEY, envelope)?;

        let written = self
            .backend
            .remove_item(SESSION_KEY)
            .and_then(|()| self.backend.set_item(USER_KEY, &user_json))
            .and_then(|()| self.backend.set_item(SESSION_KEY, &envelope_json));
        if let Err(err) = written {
            error!("session write failed, clearing partial entries: {err}");
            self.clear();
            return Err(err);
        }
        debug!("session saved for user {}", user.id);
        Ok(())
    }

    pub fn load(&self) -> Option<(UserRecord, SessionEnvelope)> {
        let user = self.read::<UserRecord>(USER_KEY)?;
        let envelope = self.read::<SessionEnvelope>(SESSION_KEY)?;
        Some((user, envelope))
    }

    pub fn load_envelope(&self) -> Option<SessionEnvelope> {
        self.read(SESSION_KEY)
    }

    /// Removes both entries. Idempotent; backend failures are only logged.
    pub fn clear(&self) {
        for key in [USER_KEY, SESSION_KEY] {
            if let Err(err) = self.backend.remove_item(key) {
                warn!("failed to clear {key}: {err}");
            }
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("treating unreadable {key} as absent: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                let err = StorageError::Deserialize {
                    key: key.to_string(),
                    reason: err.to_string(),
                };
                warn!("treating corrupt entry as absent: {err}");
                None
            }
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|err| StorageError::Serialize {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Role, UserStatus};
    use crate::test_support::helpers::{admin, doctor, t0, FlakyStorage};
    use crate::utils::storage::MemoryStorage;
    use serde_json::json;

    fn store_with(backend: Rc<MemoryStorage>) -> SessionStore {
        SessionStore::new(backend)
    }

    #[test]
    fn issued_envelope_expires_after_ttl() {
        let envelope = SessionEnvelope::issue(t0(), Duration::hours(24), "agent");
        assert_eq!(envelope.expires_at - envelope.login_time, Duration::hours(24));
        assert_eq!(envelope.device_info.timestamp, t0());
        assert!(envelope.is_valid_at(t0() + Duration::hours(23)));
        assert!(!envelope.is_valid_at(envelope.expires_at));
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_overflowing() {
        let envelope = SessionEnvelope::issue(t0(), Duration::days(200_000_000), "agent");
        assert_eq!(envelope.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(envelope.is_valid_at(t0()));
    }

    #[test]
    fn save_then_load_returns_the_same_pair() {
        let store = store_with(Rc::new(MemoryStorage::new()));
        let mut user = doctor();
        user.profile.insert("hospital".into(), json!("St. Lucia"));
        let envelope = SessionEnvelope::issue(t0(), Duration::hours(24), "agent");

        store.save(&user, &envelope).unwrap();

        assert_eq!(store.load(), Some((user, envelope)));
    }

    #[test]
    fn envelope_uses_camel_case_keys() {
        let backend = Rc::new(MemoryStorage::new());
        let store = store_with(backend.clone());
        let envelope = SessionEnvelope::issue(t0(), Duration::hours(24), "agent");
        store.save(&doctor(), &envelope).unwrap();

        let raw = backend.get_item(SESSION_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("loginTime").is_some());
        assert!(value.get("expiresAt").is_some());
        assert_eq!(value["deviceInfo"]["userAgent"], json!("agent"));
    }

    #[test]
    fn load_is_absent_when_either_key_is_missing() {
        let backend = Rc::new(MemoryStorage::new());
        let store = store_with(backend.clone());
        store
            .save(&doctor(), &SessionEnvelope::issue(t0(), Duration::hours(24), "a"))
            .unwrap();
        backend.remove_item(USER_KEY).unwrap();
        assert!(store.load().is_none());
        assert!(store.load_envelope().is_some());
    }

    #[test]
    fn invalid_json_under_session_key_is_absent() {
        let backend = Rc::new(MemoryStorage::new());
        backend
            .set_item(USER_KEY, &serde_json::to_string(&doctor()).unwrap())
            .unwrap();
        backend.set_item(SESSION_KEY, "{not json").unwrap();
        let store = store_with(backend);

        assert!(store.load().is_none());
        assert!(store.load_envelope().is_none());
    }

    #[test]
    fn stored_subset_without_status_loads_as_active() {
        let backend = Rc::new(MemoryStorage::new());
        backend
            .set_item(
                USER_KEY,
                r#"{"id":"3","name":"John Doe","email":"user@example.com","role":"user"}"#,
            )
            .unwrap();
        let envelope = SessionEnvelope::issue(t0(), Duration::hours(24), "a");
        backend
            .set_item(SESSION_KEY, &serde_json::to_string(&envelope).unwrap())
            .unwrap();
        let (user, _) = store_with(backend).load().unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.status, UserStatus::Active);
    }

    #[test]
    fn clear_is_idempotent() {
        let backend = Rc::new(MemoryStorage::new());
        let store = store_with(backend.clone());
        store
            .save(&doctor(), &SessionEnvelope::issue(t0(), Duration::hours(24), "a"))
            .unwrap();
        store.clear();
        store.clear();
        assert!(backend.is_empty());
        assert!(store.load().is_none());
    }

    #[test]
    fn failed_envelope_write_rolls_back_user_entry() {
        let backend = Rc::new(FlakyStorage::failing_writes_to(SESSION_KEY));
        let store = SessionStore::new(backend.clone());
        let err = store
            .save(&doctor(), &SessionEnvelope::issue(t0(), Duration::hours(24), "a"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(backend.get_item(USER_KEY).unwrap(), None);
        assert!(store.load().is_none());
    }

    #[test]
    fn failed_envelope_write_drops_previous_session() {
        let backend = Rc::new(FlakyStorage::healthy());
        let store = SessionStore::new(backend.clone());
        store
            .save(&doctor(), &SessionEnvelope::issue(t0(), Duration::hours(24), "a"))
            .unwrap();

        backend.fail_writes_to(SESSION_KEY);
        let later = SessionEnvelope::issue(t0() + Duration::hours(1), Duration::hours(24), "a");
        assert!(store.save(&admin(), &later).is_err());

        assert!(store.load_envelope().is_none());
        assert!(store.load().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn unreadable_backend_loads_as_absent() {
        let backend = Rc::new(FlakyStorage::failing_reads());
        let store = SessionStore::new(backend);
        assert!(store.load().is_none());
    }
}
