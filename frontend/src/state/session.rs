//! Session lifecycle: the only place where [`AuthState`] changes.
//!
//! ```text
//! Restoring --restore--> Authenticated | Unauthenticated
//! Authenticated --logout / expiry--> Unauthenticated
//! Unauthenticated --login--> Authenticated
//! ```

use std::rc::Rc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};

use crate::{
    config::SessionConfig,
    directory::{Role, UserDirectory, UserPatch, UserRecord},
    error::{LookupError, SessionError},
    state::session_store::{SessionEnvelope, SessionStore},
    utils::time::Clock,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub current_user: Option<UserRecord>,
    pub role: Option<Role>,
    pub is_restoring: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::restoring()
    }
}

impl AuthState {
    pub fn restoring() -> Self {
        Self {
            current_user: None,
            role: None,
            is_restoring: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            current_user: None,
            role: None,
            is_restoring: false,
        }
    }

    pub fn signed_in(user: UserRecord) -> Self {
        Self {
            role: Some(user.role),
            current_user: Some(user),
            is_restoring: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Persisted,
    /// Storage refused the write; the session lives only until reload.
    MemoryOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    Idle,
    Valid { expires_at: DateTime<Utc> },
    LoggedOut,
}

pub struct SessionController {
    state: AuthState,
    store: SessionStore,
    directory: Rc<dyn UserDirectory>,
    clock: Rc<dyn Clock>,
    config: SessionConfig,
    user_agent: String,
}

impl SessionController {
    pub fn new(
        store: SessionStore,
        directory: Rc<dyn UserDirectory>,
        clock: Rc<dyn Clock>,
        config: SessionConfig,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            state: AuthState::restoring(),
            store,
            directory,
            clock,
            config,
            user_agent: user_agent.into(),
        }
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn directory(&self) -> Rc<dyn UserDirectory> {
        self.directory.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Expiry of the persisted envelope, if one is readable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.store.load_envelope().map(|envelope| envelope.expires_at)
    }

    /// Rebuilds the session from storage. Anything short of an unexpired
    /// envelope for an active, known user clears storage and signs out.
    pub fn restore(&mut self) -> &AuthState {
        let now = self.clock.now();
        self.state = match self.validate_stored(now) {
            Some(user) => {
                info!("session restored for {}: {}", user.role, user.name);
                self.request_update(&user, UserPatch::activity(now));
                AuthState::signed_in(user)
            }
            None => {
                self.store.clear();
                AuthState::signed_out()
            }
        };
        &self.state
    }

    fn validate_stored(&self, now: DateTime<Utc>) -> Option<UserRecord> {
        let (stored, envelope) = self.store.load()?;
        if !envelope.is_valid_at(now) {
            info!("session expired, please log in again");
            return None;
        }
        match self.directory.get_user_by_id(&stored.id) {
            Ok(Some(current)) if current.is_active() => Some(UserRecord {
                role: current.role,
                status: current.status,
                ..stored
            }),
            Ok(Some(_)) => {
                warn!("{}", LookupError::Inactive(stored.id));
                None
            }
            Ok(None) => {
                warn!("{}", LookupError::NotFound(stored.id));
                None
            }
            Err(err) => {
                warn!("user lookup failed during restore: {err}");
                None
            }
        }
    }

    pub fn login(&mut self, user: UserRecord) -> Result<LoginOutcome, SessionError> {
        if self.state.is_restoring {
            self.restore();
        }
        if !user.is_active() {
            return Err(LookupError::Inactive(user.id).into());
        }

        let now = self.clock.now();
        let envelope = SessionEnvelope::issue(now, self.config.session_ttl, &self.user_agent);
        let outcome = match self.store.save(&user, &envelope) {
            Ok(()) => LoginOutcome::Persisted,
            Err(err) => {
                error!("error saving session, it will not survive a reload: {err}");
                LoginOutcome::MemoryOnly
            }
        };

        self.request_update(&user, UserPatch::login(now));
        info!("login successful for {}: {}", user.role, user.name);
        self.state = AuthState::signed_in(user);
        Ok(outcome)
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.state.current_user.take() {
            info!("logout for {}: {}", user.role, user.name);
            self.request_update(&user, UserPatch::activity(self.clock.now()));
        }
        self.store.clear();
        self.state = AuthState::signed_out();
    }

    /// Re-validates a live session against storage and the directory.
    pub fn check_expiry(&mut self) -> ExpiryCheck {
        let Some(user_id) = self.state.current_user.as_ref().map(|u| u.id.clone()) else {
            return ExpiryCheck::Idle;
        };
        let now = self.clock.now();

        let expires_at = match self.store.load_envelope() {
            Some(envelope) if envelope.is_valid_at(now) => envelope.expires_at,
            Some(_) => {
                info!("session expired, logging out");
                self.logout();
                return ExpiryCheck::LoggedOut;
            }
            None => {
                warn!("session envelope missing, logging out");
                self.logout();
                return ExpiryCheck::LoggedOut;
            }
        };

        match self.directory.get_user_by_id(&user_id) {
            Ok(Some(user)) if user.is_active() => ExpiryCheck::Valid { expires_at },
            Ok(_) => {
                warn!("user {user_id} no longer active, logging out");
                self.logout();
                ExpiryCheck::LoggedOut
            }
            // A flaky directory is not proof the session is invalid.
            Err(err) => {
                warn!("user lookup failed during expiry check: {err}");
                ExpiryCheck::Valid { expires_at }
            }
        }
    }

    fn request_update(&self, user: &UserRecord, patch: UserPatch) {
        if let Err(err) = self.directory.update_user(&user.id, patch) {
            warn!("activity update for {} failed: {err}", user.id);
        }
    }
}

/// Delay until the next expiry check: the poll interval, or sooner if the
/// envelope runs out first.
pub fn next_check_delay(
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    poll_interval: StdDuration,
) -> StdDuration {
    let remaining = (expires_at - now).to_std().unwrap_or(StdDuration::ZERO);
    remaining.min(poll_interval)
}
