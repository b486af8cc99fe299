mod components;
pub mod config;
pub mod directory;
pub mod error;
mod pages;
pub mod router;
pub mod state;
mod test_support;
pub mod utils;

/// Browser entry point: panic hook, logging, then the app.
pub fn start() {
    console_error_panic_hook::set_once();
    let config = config::current();
    if let Err(err) = console_log::init_with_level(config.log_level) {
        web_sys::console::warn_1(&format!("logger already initialized: {err}").into());
    }
    log::info!(
        "Starting Retinal-AI frontend (session ttl {}h, expiry poll {}s)",
        config.session_ttl.num_hours(),
        config.expiry_poll_interval.as_secs()
    );
    router::mount_app();
}
