use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration as StdDuration;

use leptos::*;
use log::warn;

use crate::{
    config::{self, SessionConfig},
    directory::{InMemoryUserDirectory, UserDirectory, UserRecord},
    error::SessionError,
    state::{
        session::{next_check_delay, ExpiryCheck, LoginOutcome, SessionController},
        session_store::SessionStore,
    },
    utils::{
        storage::{KeyValueStore, LocalStorage, MemoryStorage},
        time::{Clock, SystemClock},
    },
};

pub use crate::state::session::AuthState;

/// Pending expiry check. Dropping it cancels the underlying timer.
struct ExpiryWatch {
    delay: StdDuration,
    #[cfg(target_arch = "wasm32")]
    _timer: gloo_timers::callback::Timeout,
}

/// Handle shared through context. Pages read `state` and call
/// [`AuthContext::login`] / [`AuthContext::logout`]; nothing else mutates it.
#[derive(Clone)]
pub struct AuthContext {
    pub state: ReadSignal<AuthState>,
    set_state: WriteSignal<AuthState>,
    controller: Rc<RefCell<SessionController>>,
    watch: Rc<RefCell<Option<ExpiryWatch>>>,
}

impl AuthContext {
    /// Wraps `controller` and runs the startup restore before returning, so no
    /// login can be dispatched against an unsettled session.
    pub fn new(controller: SessionController) -> Self {
        let (state, set_state) = create_signal(controller.auth_state().clone());
        let ctx = Self {
            state,
            set_state,
            controller: Rc::new(RefCell::new(controller)),
            watch: Rc::new(RefCell::new(None)),
        };
        ctx.restore();
        ctx
    }

    /// Signed-out context over throwaway storage.
    pub fn detached() -> Self {
        let controller = SessionController::new(
            SessionStore::new(Rc::new(MemoryStorage::new())),
            default_directory(),
            Rc::new(SystemClock),
            SessionConfig::default(),
            "unknown",
        );
        Self::new(controller)
    }

    pub fn restore(&self) {
        let snapshot = self.controller.borrow_mut().restore().clone();
        self.publish(snapshot);
    }

    pub fn login(&self, user: UserRecord) -> Result<LoginOutcome, SessionError> {
        let result = self.controller.borrow_mut().login(user);
        let snapshot = self.controller.borrow().auth_state().clone();
        self.publish(snapshot);
        result
    }

    pub fn logout(&self) {
        self.disarm();
        self.controller.borrow_mut().logout();
        let snapshot = self.controller.borrow().auth_state().clone();
        self.publish(snapshot);
    }

    pub fn run_expiry_check(&self) -> ExpiryCheck {
        let outcome = self.controller.borrow_mut().check_expiry();
        let snapshot = self.controller.borrow().auth_state().clone();
        self.publish(snapshot);
        outcome
    }

    pub fn directory(&self) -> Rc<dyn UserDirectory> {
        self.controller.borrow().directory()
    }

    /// Delay of the armed expiry check, if any.
    pub fn pending_expiry_check(&self) -> Option<StdDuration> {
        self.watch.borrow().as_ref().map(|watch| watch.delay)
    }

    fn publish(&self, snapshot: AuthState) {
        if snapshot.is_authenticated() {
            self.arm();
        } else {
            self.disarm();
        }
        self.set_state.set(snapshot);
    }

    fn arm(&self) {
        let delay = {
            let controller = self.controller.borrow();
            match controller.expires_at() {
                Some(expires_at) => next_check_delay(
                    controller.now(),
                    expires_at,
                    controller.config().expiry_poll_interval,
                ),
                // Next tick notices the missing envelope.
                None => controller.config().expiry_poll_interval,
            }
        };
        let watch = self.schedule(delay);
        self.watch.borrow_mut().replace(watch);
    }

    fn disarm(&self) {
        self.watch.borrow_mut().take();
    }

    #[cfg(target_arch = "wasm32")]
    fn schedule(&self, delay: StdDuration) -> ExpiryWatch {
        let ctx = self.clone();
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timer = gloo_timers::callback::Timeout::new(millis, move || ctx.on_timer_fired());
        ExpiryWatch {
            delay,
            _timer: timer,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn schedule(&self, delay: StdDuration) -> ExpiryWatch {
        ExpiryWatch { delay }
    }

    #[cfg(target_arch = "wasm32")]
    fn on_timer_fired(&self) {
        // The firing handle cannot be dropped from inside its own callback.
        if let Some(fired) = self.watch.borrow_mut().take() {
            spawn_local(async move { drop(fired) });
        }
        self.run_expiry_check();
    }
}

fn default_directory() -> Rc<dyn UserDirectory> {
    Rc::new(InMemoryUserDirectory::with_demo_users())
}

fn browser_storage() -> Rc<dyn KeyValueStore> {
    match LocalStorage::new() {
        Ok(storage) => Rc::new(storage),
        Err(err) => {
            warn!("{err}; sessions will not survive a reload");
            Rc::new(MemoryStorage::new())
        }
    }
}

fn user_agent() -> String {
    web_sys::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn create_auth_context() -> AuthContext {
    let directory = use_context::<Rc<dyn UserDirectory>>().unwrap_or_else(default_directory);
    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let controller = SessionController::new(
        SessionStore::new(browser_storage()),
        directory,
        clock,
        config::current().clone(),
        user_agent(),
    );
    AuthContext::new(controller)
}

#[component]
pub fn AuthProvider(children: Children) -> impl IntoView {
    let ctx = create_auth_context();
    provide_context(ctx);
    view! { <>{children()}</> }
}

pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().unwrap_or_else(AuthContext::detached)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod host_tests {
    use super::*;
    use crate::directory::Role;
    use crate::test_support::helpers::{doctor, patient, t0, SessionHarness};
    use crate::test_support::ssr::with_runtime;
    use chrono::Duration;

    #[test]
    fn use_auth_returns_signed_out_without_context() {
        with_runtime(|| {
            let auth = use_auth();
            let snapshot = auth.state.get();
            assert!(!snapshot.is_authenticated());
            assert!(!snapshot.is_restoring);
            assert!(auth.pending_expiry_check().is_none());
        });
    }

    #[test]
    fn new_context_restores_before_returning() {
        with_runtime(|| {
            let mut h = SessionHarness::new();
            h.controller.restore();
            h.controller.login(doctor()).unwrap();

            let ctx = AuthContext::new(h.reopen().controller);
            let state = ctx.state.get();
            assert!(!state.is_restoring);
            assert_eq!(state.role, Some(Role::Doctor));
            assert_eq!(ctx.pending_expiry_check(), Some(StdDuration::from_secs(60)));
        });
    }

    #[test]
    fn login_arms_and_logout_cancels_expiry_check() {
        with_runtime(|| {
            let h = SessionHarness::new();
            let ctx = AuthContext::new(h.reopen().controller);
            assert!(ctx.pending_expiry_check().is_none());

            ctx.login(patient()).unwrap();
            assert!(ctx.state.get().is_authenticated());
            assert_eq!(ctx.pending_expiry_check(), Some(StdDuration::from_secs(60)));

            ctx.logout();
            assert!(!ctx.state.get().is_authenticated());
            assert!(ctx.pending_expiry_check().is_none());
        });
    }

    #[test]
    fn check_near_expiry_fires_at_expiry_instant() {
        with_runtime(|| {
            let h = SessionHarness::new();
            let clock = h.clock.clone();
            let ctx = AuthContext::new(h.reopen().controller);
            ctx.login(doctor()).unwrap();

            clock.set(t0() + Duration::hours(24) - Duration::seconds(20));
            let outcome = ctx.run_expiry_check();
            assert!(matches!(outcome, ExpiryCheck::Valid { .. }));
            assert_eq!(ctx.pending_expiry_check(), Some(StdDuration::from_secs(20)));
        });
    }

    #[test]
    fn expired_check_signs_out_and_stops_timer() {
        with_runtime(|| {
            let h = SessionHarness::new();
            let clock = h.clock.clone();
            let backend = h.backend.clone();
            let ctx = AuthContext::new(h.reopen().controller);
            ctx.login(doctor()).unwrap();

            clock.set(t0() + Duration::hours(24) + Duration::seconds(1));
            assert_eq!(ctx.run_expiry_check(), ExpiryCheck::LoggedOut);
            assert!(ctx.state.get().current_user.is_none());
            assert!(ctx.pending_expiry_check().is_none());
            assert!(backend.is_empty());
        });
    }

    #[test]
    fn rejected_login_leaves_state_signed_out() {
        with_runtime(|| {
            let h = SessionHarness::new();
            let ctx = AuthContext::new(h.reopen().controller);
            let mut user = patient();
            user.status = crate::directory::UserStatus::Inactive;
            assert!(ctx.login(user).is_err());
            assert!(!ctx.state.get().is_authenticated());
            assert!(ctx.pending_expiry_check().is_none());
        });
    }
}
