//! Diagnostics for growthcalc.
//!
//! Everything is written to stderr: `calc --format json` prints its result
//! on stdout and must stay parseable. Table loads are reported at `info`,
//! skipped indicators and lookup misses at `debug`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `info`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Route `debug` output through the test harness so that a failing test
/// shows why an indicator was skipped.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("growth_core=debug"))
        .try_init();
}
