//! Console diagnostics for hosts embedding the crate
//!
//! The crate itself only emits `tracing` events. Hosts that do not install
//! their own subscriber can call [`init_console_logging`].

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`
///
/// `default_filter` applies when `RUST_LOG` is unset or invalid. Returns
/// false if a global subscriber was already installed, in which case the
/// existing one is kept.
pub fn init_console_logging(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
