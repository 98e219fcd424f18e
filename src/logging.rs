//! Diagnostic logging setup.
//!
//! Logs go to stderr so the REPL's stdout carries only operator output.
//! Verbosity comes from `WEBLOAD_LOG` using `tracing-subscriber`'s
//! `EnvFilter` syntax (e.g. `WEBLOAD_LOG=webload=debug`).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "WEBLOAD_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
