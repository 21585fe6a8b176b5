//! Tracing initialization
//!
//! The embedding host calls [`init`] once at startup; library code only
//! emits `tracing` events and never installs subscribers itself.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, falling back to `info`. Safe to call
/// once per process; subsequent calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
