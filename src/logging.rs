//! Tracing subscriber setup
//!
//! Logs go to stderr so that stdout stays clean for piped output.
//! `RUST_LOG` always wins over the verbosity flag.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber: `warn` by default, `debug` with `--verbose`
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (e.g. from an embedding host) is harmless
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_line_number(verbose)
        .try_init();
}

/// Subscriber for unit tests, captured per test
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
