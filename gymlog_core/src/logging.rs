//! Tracing setup for the `gymlog` binary.
//!
//! Chat replies and command output go to stdout, so every log line is written to
//! stderr. `GYMLOG_LOG` takes precedence over `RUST_LOG`; without either, only the
//! gymlog crates log at the requested level and dependencies stay at `warn`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable checked before `RUST_LOG`
pub const LOG_ENV: &str = "GYMLOG_LOG";

/// Filter used when no environment override is set
fn default_directives(level: &str) -> String {
    format!("warn,gymlog_core={level},gymlog={level}")
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)))
}

/// Initialize logging with a specific default level for the gymlog crates
///
/// A second call is ignored, so embedding code that installed its own subscriber is
/// left alone.
pub fn init_with_level(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(default_level))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
