//! Logging setup
//!
//! Events go to stderr so stdout stays reserved for the balances CSV.
//! `RUST_LOG` takes precedence over the level passed on the command line.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
///
/// Safe to call more than once; later calls are ignored.
///
/// # Arguments
///
/// * `level` - Default filter directive, e.g. `warn` or `rust_transfer_engine=debug`
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
