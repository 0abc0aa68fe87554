//! Tracing initialization.
//!
//! Library code only emits `tracing` events. Applications that want them
//! printed call [`init`] once at startup.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Install a fmt subscriber filtered by `filter`.
///
/// `RUST_LOG`, when set and valid, overrides `filter`. Only the first call in
/// a process has any effect, and it does nothing if another global subscriber
/// is already installed.
///
/// # Example
///
/// ```
/// occamdb::logging::init("occam=debug");
/// ```
pub fn init(filter: &str) {
    INIT_ONCE.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(filter))
            .unwrap_or_else(|_| EnvFilter::new("occam=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init();
    });
}
