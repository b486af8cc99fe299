use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration as StdDuration;

use chrono::Duration;

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
pub const DEFAULT_EXPIRY_POLL_SECONDS: u64 = 60;
/// Longest accepted session lifetime override: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Optional overrides published by the hosting page, e.g.
/// `window.__RETINAL_AI_CONFIG = { session_ttl_hours: 8 }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub session_ttl_hours: Option<i64>,
    pub expiry_poll_seconds: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub session_ttl: Duration,
    pub expiry_poll_interval: StdDuration,
    pub log_level: log::Level,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            expiry_poll_interval: StdDuration::from_secs(DEFAULT_EXPIRY_POLL_SECONDS),
            log_level: log::Level::Info,
        }
    }
}

impl SessionConfig {
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        let defaults = Self::default();
        let session_ttl = runtime
            .session_ttl_hours
            .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
            .map(Duration::hours)
            .unwrap_or(defaults.session_ttl);
        let expiry_poll_interval = runtime
            .expiry_poll_seconds
            .filter(|secs| *secs > 0)
            .map(StdDuration::from_secs)
            .unwrap_or(defaults.expiry_poll_interval);
        let log_level = runtime
            .log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(defaults.log_level);
        Self {
            session_ttl,
            expiry_poll_interval,
            log_level,
        }
    }
}

static SESSION_CONFIG: OnceLock<SessionConfig> = OnceLock::new();

#[cfg(target_arch = "wasm32")]
fn read_global(obj: &js_sys::Object, lower: &str, upper: &str) -> Option<wasm_bindgen::JsValue> {
    [lower, upper].into_iter().find_map(|key| {
        js_sys::Reflect::get(obj, &key.into())
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    })
}

#[cfg(target_arch = "wasm32")]
fn snapshot_from_globals() -> RuntimeConfig {
    let Some(window) = web_sys::window() else {
        return RuntimeConfig::default();
    };
    let Some(any) = js_sys::Reflect::get(&window, &"__RETINAL_AI_CONFIG".into())
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
    else {
        return RuntimeConfig::default();
    };
    let obj = js_sys::Object::from(any);
    RuntimeConfig {
        session_ttl_hours: read_global(&obj, "session_ttl_hours", "SESSION_TTL_HOURS")
            .and_then(|v| v.as_f64())
            .map(|v| v as i64),
        expiry_poll_seconds: read_global(&obj, "expiry_poll_seconds", "EXPIRY_POLL_SECONDS")
            .and_then(|v| v.as_f64())
            .filter(|v| *v >= 0.0)
            .map(|v| v as u64),
        log_level: read_global(&obj, "log_level", "LOG_LEVEL").and_then(|v| v.as_string()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn snapshot_from_globals() -> RuntimeConfig {
    RuntimeConfig::default()
}

/// Resolved configuration; globals are read once and cached.
pub fn current() -> &'static SessionConfig {
    SESSION_CONFIG.get_or_init(|| SessionConfig::from_runtime(&snapshot_from_globals()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_one_day_and_one_minute() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.session_ttl, Duration::hours(24));
        assert_eq!(cfg.expiry_poll_interval, StdDuration::from_secs(60));
        assert_eq!(cfg.log_level, log::Level::Info);
    }

    #[test]
    fn runtime_overrides_apply() {
        let runtime: RuntimeConfig = serde_json::from_str(
            r#"{"session_ttl_hours": 8, "expiry_poll_seconds": 15, "log_level": "debug"}"#,
        )
        .unwrap();
        let cfg = SessionConfig::from_runtime(&runtime);
        assert_eq!(cfg.session_ttl, Duration::hours(8));
        assert_eq!(cfg.expiry_poll_interval, StdDuration::from_secs(15));
        assert_eq!(cfg.log_level, log::Level::Debug);
    }

    #[test]
    fn invalid_overrides_fall_back_to_defaults() {
        let runtime = RuntimeConfig {
            session_ttl_hours: Some(0),
            expiry_poll_seconds: Some(0),
            log_level: Some("loud".into()),
        };
        assert_eq!(SessionConfig::from_runtime(&runtime), SessionConfig::default());
    }

    #[test]
    fn oversized_ttl_falls_back_to_default() {
        let runtime = RuntimeConfig {
            session_ttl_hours: Some(10_000_000_000),
            ..RuntimeConfig::default()
        };
        let cfg = SessionConfig::from_runtime(&runtime);
        assert_eq!(cfg.session_ttl, Duration::hours(DEFAULT_SESSION_TTL_HOURS));

        let year = RuntimeConfig {
            session_ttl_hours: Some(MAX_SESSION_TTL_HOURS),
            ..RuntimeConfig::default()
        };
        assert_eq!(
            SessionConfig::from_runtime(&year).session_ttl,
            Duration::hours(MAX_SESSION_TTL_HOURS)
        );
    }

    #[test]
    fn host_build_uses_defaults() {
        assert_eq!(current(), &SessionConfig::default());
    }
}
